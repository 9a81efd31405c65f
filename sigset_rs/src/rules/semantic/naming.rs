//! Naming conventions for signal names and ids.

use std::sync::LazyLock;

use heck::ToShoutySnakeCase;
use regex::Regex;

use super::words;
use crate::document::{Node, Suggestion, TextEdit};
use crate::rules::{
    LintContext, LintResult, Rule, RuleConfig, RuleOutput, Severity, SignalTarget, rule_meta,
};

static ID_FORMAT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z0-9_]+$").expect("valid regex"));

/// Convention keyed on the words of a signal's name.
struct NamePattern {
    /// Lowercase words that must all appear.
    keywords: &'static [&'static str],
    rewrite: fn(&str) -> String,
}

/// Convention keyed on a signal's `suggestedMetric`.
struct IdPattern {
    metric: &'static str,
    require: &'static str,
    forbid: Option<&'static str>,
}

const NAME_PATTERNS: &[NamePattern] = &[
    NamePattern {
        keywords: &["abs", "speed"],
        rewrite: wheel_speed_name,
    },
    NamePattern {
        keywords: &["engine", "oil", "pressure"],
        rewrite: engine_oil_pressure_name,
    },
    NamePattern {
        keywords: &["coolant", "temp"],
        rewrite: coolant_temperature_name,
    },
];

const ID_PATTERNS: &[IdPattern] = &[
    IdPattern {
        metric: "odometer",
        require: "ODO",
        forbid: Some("ODOMETER"),
    },
    IdPattern {
        metric: "stateOfCharge",
        require: "SOC",
        forbid: Some("STATE_OF_CHARGE"),
    },
    IdPattern {
        metric: "stateOfHealth",
        require: "SOH",
        forbid: Some("STATE_OF_HEALTH"),
    },
    IdPattern {
        metric: "fuelTankLevel",
        require: "FUEL",
        forbid: None,
    },
];

const WHEEL_POSITIONS: &[(&str, &str)] = &[
    ("fl", "Front left"),
    ("fr", "Front right"),
    ("rl", "Rear left"),
    ("rr", "Rear right"),
];

/// `ABS speed (avg)` is the average wheel speed; `ABS speed FL` the front
/// left one.
fn wheel_speed_name(name: &str) -> String {
    let lower: Vec<String> = words(name)
        .into_iter()
        .map(|(_, w)| w.to_lowercase())
        .collect();
    if lower.iter().any(|w| w == "avg" || w == "average") {
        return "Average wheel speed".to_string();
    }
    for (code, position) in WHEEL_POSITIONS {
        if lower.iter().any(|w| w == code) {
            return format!("{position} wheel speed");
        }
    }
    "Wheel speed".to_string()
}

fn engine_oil_pressure_name(_: &str) -> String {
    "Engine oil pressure".to_string()
}

fn coolant_temperature_name(_: &str) -> String {
    "Engine coolant temperature".to_string()
}

fn name_words(name: &str) -> Vec<String> {
    words(name)
        .into_iter()
        .map(|(_, w)| w.to_lowercase())
        .collect()
}

pub struct NamingConventionRule {
    config: RuleConfig,
}

impl Default for NamingConventionRule {
    fn default() -> Self {
        Self {
            config: RuleConfig::new(Severity::Warning),
        }
    }
}

impl Rule for NamingConventionRule {
    rule_meta!(
        "naming-convention",
        "Naming conventions",
        "Well-known signals follow the house naming patterns",
        [Signal]
    );

    fn validate_signal(&self, _ctx: &LintContext<'_>, target: SignalTarget<'_, '_>) -> RuleOutput {
        let SignalTarget::Signal(view) = target else {
            return Ok(Vec::new());
        };
        let signal = &view.signal;
        let mut results = Vec::new();

        if let Some(name_node) = view.name_node() {
            let have = name_words(&signal.name);
            let pattern = NAME_PATTERNS
                .iter()
                .find(|p| p.keywords.iter().all(|k| have.iter().any(|w| w == k)));
            if let Some(pattern) = pattern {
                let expected = (pattern.rewrite)(&signal.name);
                if expected != signal.name {
                    results.push(
                        LintResult::for_rule(
                            self,
                            name_node,
                            format!("Name '{}' should be '{expected}'", signal.name),
                        )
                        .with_suggestion(Some(Suggestion::single(
                            format!("Rename to '{expected}'"),
                            TextEdit::replace_string(name_node, &expected),
                        ))),
                    );
                }
            }
        }

        let metric = signal.suggested_metric.as_deref();
        if let Some(pattern) = ID_PATTERNS.iter().find(|p| Some(p.metric) == metric) {
            let id_node = view.id_node().unwrap_or(view.node);
            let id = &signal.id;
            if let Some(forbid) = pattern.forbid.filter(|f| id.contains(f)) {
                let fixed = id.replace(forbid, pattern.require);
                results.push(
                    LintResult::for_rule(
                        self,
                        id_node,
                        format!(
                            "Signals with metric '{}' use '{}' in the id, not '{forbid}'",
                            pattern.metric, pattern.require
                        ),
                    )
                    .with_suggestion(Some(Suggestion::single(
                        format!("Rename to {fixed}"),
                        TextEdit::replace_string(id_node, &fixed),
                    ))),
                );
            } else if !id.contains(pattern.require) {
                results.push(LintResult::for_rule(
                    self,
                    id_node,
                    format!(
                        "Signals with metric '{}' should carry '{}' in the id",
                        pattern.metric, pattern.require
                    ),
                ));
            }
        }

        Ok(results)
    }
}

pub struct SignalIdFormatRule {
    config: RuleConfig,
}

impl Default for SignalIdFormatRule {
    fn default() -> Self {
        Self {
            config: RuleConfig::new(Severity::Warning),
        }
    }
}

impl Rule for SignalIdFormatRule {
    rule_meta!(
        "signal-id-format",
        "Id format",
        "Signal and group ids use uppercase letters, digits and underscores",
        [Signal]
    );

    fn validate_signal(&self, _ctx: &LintContext<'_>, target: SignalTarget<'_, '_>) -> RuleOutput {
        let id = target.id();
        if ID_FORMAT.is_match(id) {
            return Ok(Vec::new());
        }
        let node = target.node().get("id").unwrap_or(target.node());
        let fixed = id.to_shouty_snake_case();
        let suggestion = (ID_FORMAT.is_match(&fixed)).then(|| {
            Suggestion::single(
                format!("Rename to {fixed}"),
                TextEdit::replace_string(node, &fixed),
            )
        });
        Ok(vec![
            LintResult::for_rule(self, node, format!("Id '{id}' should match [A-Z0-9_]+"))
                .with_suggestion(suggestion),
        ])
    }
}

/// Whether a word is left alone by sentence casing: `ABS`, `ECUs`, `A`.
fn is_acronym(word: &str) -> bool {
    let core = match word.strip_suffix('s') {
        Some(stem) if stem.chars().count() >= 2 => stem,
        _ => word,
    };
    core.chars().all(|c| !c.is_lowercase()) && core.chars().any(char::is_uppercase)
}

/// Sentence case: first word capitalized, plain words lowercased, acronyms
/// and mixed-case words such as `kWh` untouched.
pub fn sentence_case(name: &str) -> String {
    let mut out = name.to_string();
    for (index, (offset, word)) in words(name).into_iter().enumerate() {
        if is_acronym(word) {
            continue;
        }
        let mut chars = word.chars();
        let Some(first) = chars.next() else {
            continue;
        };
        let rest: String = chars.collect();
        if rest.chars().any(char::is_uppercase) {
            continue;
        }
        let fixed_first: String = if index == 0 {
            first.to_uppercase().collect()
        } else {
            first.to_lowercase().collect()
        };
        let replacement = format!("{fixed_first}{rest}");
        if replacement.len() == word.len() {
            out.replace_range(offset..offset + word.len(), &replacement);
        }
    }
    out
}

pub struct NameCaseRule {
    config: RuleConfig,
}

impl Default for NameCaseRule {
    fn default() -> Self {
        Self {
            config: RuleConfig::new(Severity::Information),
        }
    }
}

fn name_node<'n>(target: SignalTarget<'n, '_>) -> Option<(&'n Node, &'n str)> {
    match target {
        SignalTarget::Signal(view) => Some((view.name_node()?, view.signal.name.as_str())),
        SignalTarget::Group(view) => Some((view.node.get("name")?, view.group.name.as_deref()?)),
    }
}

impl Rule for NameCaseRule {
    rule_meta!(
        "signal-name-case",
        "Sentence case names",
        "Names are sentence case with acronyms kept",
        [Signal]
    );

    fn validate_signal(&self, _ctx: &LintContext<'_>, target: SignalTarget<'_, '_>) -> RuleOutput {
        let Some((node, name)) = name_node(target) else {
            return Ok(Vec::new());
        };
        let expected = sentence_case(name);
        if expected == name {
            return Ok(Vec::new());
        }
        Ok(vec![
            LintResult::for_rule(
                self,
                node,
                format!("Name '{name}' should be sentence case: '{expected}'"),
            )
            .with_suggestion(Some(Suggestion::single(
                "Use sentence case",
                TextEdit::replace_string(node, &expected),
            ))),
        ])
    }
}
