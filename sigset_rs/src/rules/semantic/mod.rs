//! Heuristic rules about naming, units and value ranges.

mod debug_filter;
mod formula;
mod group_regex;
mod naming;
mod spelling;
mod units;
mod vehicle_type;

pub use debug_filter::DebugFilterCoverageRule;
pub use formula::{FormulaRangeRule, decodable_range};
pub use group_regex::GroupRegexRule;
pub use naming::{NameCaseRule, NamingConventionRule, SignalIdFormatRule, sentence_case};
pub use spelling::{SpellingRule, match_case};
pub use units::{UnitMetricRule, allowed_units};
pub use vehicle_type::{VehicleClass, VehicleClassification, VehicleTypeRule, classify};

use crate::document::{Node, TextEdit};

/// Alphabetic runs of `text` with their byte offsets.
pub(crate) fn words(text: &str) -> Vec<(usize, &str)> {
    let mut out = Vec::new();
    let mut start = None;
    for (i, c) in text.char_indices() {
        match (c.is_alphabetic(), start) {
            (true, None) => start = Some(i),
            (false, Some(s)) => {
                out.push((s, &text[s..i]));
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        out.push((s, &text[s..]));
    }
    out
}

/// Edit replacing `range` of a string node's decoded value. Targets the exact
/// bytes when the literal has no escapes, else rewrites the whole string.
pub(crate) fn string_fragment_edit(
    source: &str,
    node: &Node,
    value: &str,
    range: std::ops::Range<usize>,
    replacement: &str,
) -> TextEdit {
    let raw = node.text(source);
    let unescaped = raw.len() == value.len() + 2 && raw.get(1..raw.len() - 1) == Some(value);
    if unescaped {
        return TextEdit::new(node.offset + 1 + range.start, range.len(), replacement);
    }
    let mut rewritten = value.to_string();
    rewritten.replace_range(range, replacement);
    TextEdit::replace_string(node, &rewritten)
}
