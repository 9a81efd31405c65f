//! Authored `min`/`max` must lie inside what the bit field can decode.

use crate::document::{BitFormat, Suggestion, TextEdit, format_number};
use crate::rules::{
    LintContext, LintResult, Rule, RuleConfig, RuleOutput, Severity, SignalTarget, rule_meta,
};

const TOLERANCE: f64 = 1e-6;

/// Decodable `[low, high]` of a format: the raw integer range of `len` bits
/// passed through `raw * mul / div + add`. `None` for empty fields or a zero
/// divisor.
pub fn decodable_range(fmt: &BitFormat) -> Option<(f64, f64)> {
    if fmt.len == 0 || fmt.div == 0.0 {
        return None;
    }
    let bits = fmt.len as i32;
    let (raw_lo, raw_hi) = if fmt.sign {
        (-(2f64.powi(bits - 1)), 2f64.powi(bits - 1) - 1.0)
    } else {
        (0.0, 2f64.powi(bits) - 1.0)
    };
    let decode = |raw: f64| raw * fmt.mul / fmt.div + fmt.add;
    let (a, b) = (decode(raw_lo), decode(raw_hi));
    Some((a.min(b), a.max(b)))
}

pub struct FormulaRangeRule {
    config: RuleConfig,
}

impl Default for FormulaRangeRule {
    fn default() -> Self {
        Self {
            config: RuleConfig::new(Severity::Warning),
        }
    }
}

impl Rule for FormulaRangeRule {
    rule_meta!(
        "formula-range",
        "Formula range",
        "fmt.min and fmt.max lie within the decodable value range",
        [Signal]
    );

    fn validate_signal(&self, _ctx: &LintContext<'_>, target: SignalTarget<'_, '_>) -> RuleOutput {
        let SignalTarget::Signal(view) = target else {
            return Ok(Vec::new());
        };
        let fmt = &view.signal.fmt;
        let Some(fmt_node) = view.fmt_node() else {
            return Ok(Vec::new());
        };

        if fmt.div == 0.0 {
            let node = fmt_node.get("div").unwrap_or(fmt_node);
            return Ok(vec![LintResult::for_rule(self, node, "fmt.div must not be zero")]);
        }
        let Some((low, high)) = decodable_range(fmt) else {
            return Ok(Vec::new());
        };

        let bounds = [
            ("min", fmt.min, low, fmt.min.is_some_and(|v| v < low - TOLERANCE)),
            ("max", fmt.max, high, fmt.max.is_some_and(|v| v > high + TOLERANCE)),
        ];
        let mut results = Vec::new();
        for (field, authored, limit, outside) in bounds {
            let (Some(authored), true) = (authored, outside) else {
                continue;
            };
            let Some(node) = fmt_node.get(field) else {
                continue;
            };
            let replacement = format_number(limit);
            results.push(
                LintResult::for_rule(
                    self,
                    node,
                    format!(
                        "fmt.{field} {} is outside the decodable range [{}, {}]",
                        format_number(authored),
                        format_number(low),
                        format_number(high)
                    ),
                )
                .with_suggestion(Some(Suggestion::single(
                    format!("Set {field} to {replacement}"),
                    TextEdit::replace(node, replacement),
                ))),
            );
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::test_support::{apply_all, run_rule};

    fn fmt(len: u32, sign: bool, mul: f64, div: f64, add: f64) -> BitFormat {
        BitFormat {
            bix: 0,
            len,
            sign,
            mul,
            div,
            add,
            min: None,
            max: None,
            unit: None,
            map: None,
        }
    }

    #[test]
    fn test_decodable_ranges() {
        assert_eq!(decodable_range(&fmt(8, false, 1.0, 1.0, 0.0)), Some((0.0, 255.0)));
        assert_eq!(decodable_range(&fmt(8, true, 1.0, 1.0, 0.0)), Some((-128.0, 127.0)));
        assert_eq!(decodable_range(&fmt(8, false, 1.0, 1.0, -40.0)), Some((-40.0, 215.0)));
        assert_eq!(decodable_range(&fmt(16, false, 1.0, 4.0, 0.0)), Some((0.0, 16383.75)));
        // negative scale flips the envelope
        assert_eq!(decodable_range(&fmt(8, false, -1.0, 1.0, 0.0)), Some((-255.0, 0.0)));
        assert_eq!(decodable_range(&fmt(8, false, 1.0, 0.0, 0.0)), None);
    }

    #[test]
    fn test_max_above_range_suggests_limit() {
        let text = r#"{"commands": [{"hdr": "7E0", "cmd": "0100", "signals": [
  {"id": "X", "fmt": {"bix": 0, "len": 8, "max": 300}}
]}]}"#;
        let results = run_rule(Box::new(FormulaRangeRule::default()), text);
        assert_eq!(results.len(), 1);
        assert_eq!(
            results[0].message,
            "fmt.max 300 is outside the decodable range [0, 255]"
        );
        assert!(apply_all(text, &results).contains(r#""max": 255}"#));
    }

    #[test]
    fn test_min_below_range_rounds_suggestion() {
        let text = r#"{"commands": [{"hdr": "7E0", "cmd": "0100", "signals": [
  {"id": "X", "fmt": {"len": 8, "mul": 1, "div": 3, "min": -1, "max": 85}}
]}]}"#;
        let results = run_rule(Box::new(FormulaRangeRule::default()), text);
        assert_eq!(results.len(), 1);
        assert!(apply_all(text, &results).contains(r#""min": 0,"#));
    }

    #[test]
    fn test_in_range_bounds_pass() {
        let text = r#"{"commands": [{"hdr": "7E0", "cmd": "0100", "signals": [
  {"id": "X", "fmt": {"len": 8, "add": -40, "min": -40, "max": 215}}
]}]}"#;
        assert!(run_rule(Box::new(FormulaRangeRule::default()), text).is_empty());
    }
}
