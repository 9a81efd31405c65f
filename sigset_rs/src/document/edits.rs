//! Byte-range text edits.
//!
//! Auto-fixes never re-serialize the document. Each edit replaces a literal
//! slice of the original text so comments, key order and hand-written
//! whitespace survive.

use serde::{Deserialize, Serialize};

use super::model::Filter;
use super::tree::Node;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextEdit {
    pub offset: usize,
    pub length: usize,
    #[serde(rename = "newText")]
    pub new_text: String,
}

impl TextEdit {
    pub fn new(offset: usize, length: usize, new_text: impl Into<String>) -> Self {
        Self {
            offset,
            length,
            new_text: new_text.into(),
        }
    }

    pub fn end(&self) -> usize {
        self.offset + self.length
    }

    /// Replace the whole node.
    pub fn replace(node: &Node, new_text: impl Into<String>) -> Self {
        Self::new(node.offset, node.length, new_text)
    }

    /// Replace a string node, quoting and escaping the new value.
    pub fn replace_string(node: &Node, value: &str) -> Self {
        Self::replace(node, quote(value))
    }

    fn overlaps(&self, other: &TextEdit) -> bool {
        if self.length == 0 && other.length == 0 {
            return self.offset == other.offset;
        }
        self.offset < other.end() && other.offset < self.end()
    }
}

/// A titled fix made of one or more edits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub title: String,
    pub edits: Vec<TextEdit>,
}

impl Suggestion {
    pub fn new(title: impl Into<String>, edits: Vec<TextEdit>) -> Self {
        Self {
            title: title.into(),
            edits,
        }
    }

    pub fn single(title: impl Into<String>, edit: TextEdit) -> Self {
        Self::new(title, vec![edit])
    }
}

pub fn quote(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| format!("\"{value}\""))
}

/// Remove `siblings[index]` together with its separating comma.
///
/// Works for array elements and object properties alike: the span runs from
/// the end of the previous sibling (or the start of the next one when the
/// element is first) so the surrounding layout stays intact.
pub fn remove_element(siblings: &[Node], index: usize) -> Option<TextEdit> {
    let node = siblings.get(index)?;
    if index > 0 {
        let prev = &siblings[index - 1];
        return Some(TextEdit::new(prev.end(), node.end() - prev.end(), ""));
    }
    if let Some(next) = siblings.get(1) {
        return Some(TextEdit::new(node.offset, next.offset - node.offset, ""));
    }
    Some(TextEdit::new(node.offset, node.length, ""))
}

/// Insert `"key": value` right after the property at `after` in `object`,
/// reusing the separator already used between properties.
pub fn insert_property_after(
    text: &str,
    object: &Node,
    after: usize,
    key: &str,
    value_text: &str,
) -> Option<TextEdit> {
    let anchor = object.children.get(after)?;
    let separator = match after.checked_sub(1).and_then(|i| object.children.get(i)) {
        Some(prev) => text
            .get(prev.end()..anchor.offset)
            .filter(|sep| sep.trim() == ",")
            .unwrap_or(", ")
            .to_string(),
        None => ", ".to_string(),
    };
    Some(TextEdit::new(
        anchor.end(),
        0,
        format!("{separator}{}: {value_text}", quote(key)),
    ))
}

/// Apply edits to `text`, skipping any that overlap an already-accepted edit.
/// Returns the new text and the number of edits applied.
pub fn apply_edits(text: &str, edits: &[TextEdit]) -> (String, usize) {
    let mut accepted: Vec<&TextEdit> = Vec::new();
    for edit in edits {
        if edit.end() > text.len()
            || !text.is_char_boundary(edit.offset)
            || !text.is_char_boundary(edit.end())
        {
            tracing::debug!(offset = edit.offset, "skipping out-of-range edit");
            continue;
        }
        if accepted.iter().any(|prev| prev.overlaps(edit)) {
            tracing::debug!(offset = edit.offset, "skipping conflicting edit");
            continue;
        }
        accepted.push(edit);
    }

    accepted.sort_by(|a, b| b.offset.cmp(&a.offset).then(b.length.cmp(&a.length)));
    let mut out = text.to_string();
    for edit in &accepted {
        out.replace_range(edit.offset..edit.end(), &edit.new_text);
    }
    (out, accepted.len())
}

/// Render a filter the way signal set files write it:
/// `{ "to": 2018, "years": [2020], "from": 2022 }`.
pub fn format_filter(filter: &Filter) -> String {
    let mut parts = Vec::new();
    if let Some(to) = filter.to {
        parts.push(format!("\"to\": {to}"));
    }
    if let Some(years) = filter.years.as_ref().filter(|ys| !ys.is_empty()) {
        let list: Vec<String> = years.iter().map(|y| y.to_string()).collect();
        parts.push(format!("\"years\": [{}]", list.join(", ")));
    }
    if let Some(from) = filter.from {
        parts.push(format!("\"from\": {from}"));
    }
    if parts.is_empty() {
        "{}".to_string()
    } else {
        format!("{{ {} }}", parts.join(", "))
    }
}

/// Format a number rounded to 6 decimal places without trailing zeros.
pub fn format_number(value: f64) -> String {
    let rounded = (value * 1_000_000.0).round() / 1_000_000.0;
    let rounded = if rounded == 0.0 { 0.0 } else { rounded };
    let text = format!("{rounded:.6}");
    let text = text.trim_end_matches('0').trim_end_matches('.');
    text.to_string()
}
