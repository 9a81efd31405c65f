//! Misspelled words in signal and group names.
//!
//! Words shorter than four letters, acronyms and allow-listed abbreviations
//! are skipped. Known typos come from a fixed map. Plural, `-ed` and `-ing`
//! forms of dictionary words count as known. Anything else gets the closest
//! dictionary word sharing its first letter within `min(2, len / 3)` edits,
//! and is only reported when such a word exists.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use super::{string_fragment_edit, words};
use crate::document::{Node, Suggestion};
use crate::rules::{
    LintContext, LintResult, Rule, RuleConfig, RuleOutput, Severity, SignalTarget, rule_meta,
};

const MIN_WORD_LEN: usize = 4;

const ALLOW_LIST: &[&str] = &[
    "accel", "amps", "avail", "batt", "calc", "cmds", "ctrl", "decel", "diag", "evap", "hvac",
    "info", "kmph", "lvls", "mileage", "misc", "powertrain", "pres", "regen", "sens", "stat",
    "temp", "temps", "volt", "volts",
];

const TYPOS: &[(&str, &str)] = &[
    ("accelarator", "accelerator"),
    ("batery", "battery"),
    ("odomoter", "odometer"),
    ("odometor", "odometer"),
    ("pressue", "pressure"),
    ("presure", "pressure"),
    ("speeed", "speed"),
    ("steerign", "steering"),
    ("tempature", "temperature"),
    ("temperture", "temperature"),
    ("transmision", "transmission"),
    ("voltgae", "voltage"),
    ("whell", "wheel"),
];

/// Suffix and the text that replaces it to recover the dictionary stem.
const INFLECTIONS: &[(&str, &str)] = &[
    ("ies", "y"),
    ("es", ""),
    ("s", ""),
    ("ed", ""),
    ("d", ""),
    ("ing", ""),
    ("ing", "e"),
];

static DICTIONARY: LazyLock<BTreeSet<&'static str>> = LazyLock::new(|| {
    include_str!("words.txt")
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .collect()
});

/// Apply the capitalization pattern of `original` to `word`.
pub fn match_case(original: &str, word: &str) -> String {
    if original.chars().all(|c| !c.is_lowercase()) {
        return word.to_uppercase();
    }
    let mut chars = word.chars();
    match (original.chars().next(), chars.next()) {
        (Some(first), Some(w)) if first.is_uppercase() => {
            w.to_uppercase().chain(chars).collect()
        }
        _ => word.to_lowercase(),
    }
}

fn in_lists(word: &str) -> bool {
    DICTIONARY.contains(word) || ALLOW_LIST.contains(&word)
}

/// Listed words and their inflected forms.
fn is_known(lower: &str) -> bool {
    in_lists(lower)
        || INFLECTIONS.iter().any(|(suffix, replacement)| {
            lower
                .strip_suffix(suffix)
                .filter(|stem| stem.len() >= 3)
                .is_some_and(|stem| in_lists(&format!("{stem}{replacement}")))
        })
}

fn correction(word: &str) -> Option<&'static str> {
    let lower = word.to_lowercase();
    if let Some((_, fixed)) = TYPOS.iter().find(|(typo, _)| *typo == lower) {
        return Some(*fixed);
    }
    if is_known(&lower) {
        return None;
    }
    let bound = 2.min(lower.chars().count() / 3);
    let first = lower.chars().next()?;
    if bound == 0 {
        return None;
    }
    DICTIONARY
        .iter()
        .filter(|candidate| candidate.starts_with(first))
        .map(|candidate| (strsim::levenshtein(&lower, candidate), *candidate))
        .filter(|(distance, _)| *distance <= bound)
        .min()
        .map(|(_, candidate)| candidate)
}

fn checked_word(word: &str) -> bool {
    word.chars().count() >= MIN_WORD_LEN && !word.chars().skip(1).any(char::is_uppercase)
}

pub struct SpellingRule {
    config: RuleConfig,
}

impl Default for SpellingRule {
    fn default() -> Self {
        Self {
            config: RuleConfig::new(Severity::Information),
        }
    }
}

fn name_of<'n>(target: SignalTarget<'n, '_>) -> Option<(&'n Node, &'n str)> {
    match target {
        SignalTarget::Signal(view) => Some((view.name_node()?, view.signal.name.as_str())),
        SignalTarget::Group(view) => Some((view.node.get("name")?, view.group.name.as_deref()?)),
    }
}

impl Rule for SpellingRule {
    rule_meta!(
        "spelling",
        "Spelling",
        "Words in names are spelled correctly",
        [Signal]
    );

    fn validate_signal(&self, ctx: &LintContext<'_>, target: SignalTarget<'_, '_>) -> RuleOutput {
        let Some((node, name)) = name_of(target) else {
            return Ok(Vec::new());
        };
        let mut results = Vec::new();
        for (offset, word) in words(name) {
            if !checked_word(word) {
                continue;
            }
            let Some(fixed) = correction(word) else {
                continue;
            };
            let replacement = match_case(word, fixed);
            let edit = string_fragment_edit(
                ctx.text,
                node,
                name,
                offset..offset + word.len(),
                &replacement,
            );
            results.push(
                LintResult::for_rule(
                    self,
                    node,
                    format!("'{word}' may be misspelled; did you mean '{replacement}'?"),
                )
                .with_suggestion(Some(Suggestion::single(
                    format!("Change to '{replacement}'"),
                    edit,
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

    fn doc(name: &str) -> String {
        format!(
            r#"{{"commands": [{{"hdr": "7E0", "cmd": "0100", "signals": [
  {{"id": "X", "name": "{name}", "fmt": {{"len": 8}}}}
]}}]}}"#
        )
    }

    #[test]
    fn test_match_case() {
        assert_eq!(match_case("PRESURE", "pressure"), "PRESSURE");
        assert_eq!(match_case("Presure", "pressure"), "Pressure");
        assert_eq!(match_case("presure", "pressure"), "pressure");
    }

    #[test]
    fn test_typo_map_and_dictionary() {
        assert_eq!(correction("presure"), Some("pressure"));
        assert_eq!(correction("temprature"), Some("temperature"));
        assert_eq!(correction("pressure"), None);
        assert_eq!(correction("temp"), None);
        // no dictionary word close enough
        assert_eq!(correction("zorblax"), None);
    }

    #[test]
    fn test_each_misspelling_gets_its_own_edit() {
        let text = doc("Engine Temprature and oil presure");
        let results = run_rule(Box::new(SpellingRule::default()), &text);
        assert_eq!(results.len(), 2);
        assert!(results[0].message.contains("'Temprature'"));
        let fixed = apply_all(&text, &results);
        assert!(fixed.contains(r#""name": "Engine Temperature and oil pressure""#));
        assert!(run_rule(Box::new(SpellingRule::default()), &fixed).is_empty());
    }

    #[test]
    fn test_inflected_forms_are_known() {
        assert!(is_known("brakes"));
        assert!(is_known("batteries"));
        assert!(is_known("switches"));
        assert!(is_known("requested"));
        assert!(is_known("closing"));
        assert!(!is_known("brakez"));
        assert_eq!(correction("sensorz"), Some("sensor"));
    }

    #[test]
    fn test_real_words_are_not_corrected() {
        for name in ["Cable connected", "Rain sensor", "Brakes applied"] {
            let text = doc(name);
            let results = run_rule(Box::new(SpellingRule::default()), &text);
            assert!(results.is_empty(), "{name}: {:?}", results[0].message);
        }
        // a word outside the dictionary is never swapped for one with another initial
        assert_eq!(correction("lidar"), None);
    }

    #[test]
    fn test_acronyms_and_short_words_skipped() {
        let text = doc("HVBAT SOC of ECU xyz");
        assert!(run_rule(Box::new(SpellingRule::default()), &text).is_empty());
    }
}
