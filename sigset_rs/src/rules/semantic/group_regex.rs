//! Signal group patterns must compile and select something.

use regex::Regex;

use crate::rules::{
    LintContext, LintResult, Rule, RuleConfig, RuleOutput, Severity, SignalTarget, rule_meta,
};

pub struct GroupRegexRule {
    config: RuleConfig,
}

impl Default for GroupRegexRule {
    fn default() -> Self {
        Self {
            config: RuleConfig::new(Severity::Error),
        }
    }
}

impl Rule for GroupRegexRule {
    rule_meta!(
        "signal-group-regex",
        "Signal group pattern",
        "matchingRegex compiles and matches at least one signal id",
        [Signal]
    );

    fn validate_signal(&self, ctx: &LintContext<'_>, target: SignalTarget<'_, '_>) -> RuleOutput {
        let SignalTarget::Group(view) = target else {
            return Ok(Vec::new());
        };
        let node = view.node.get("matchingRegex").unwrap_or(view.node);
        let pattern = &view.group.matching_regex;

        let regex = match Regex::new(&format!("^(?:{pattern})$")) {
            Ok(regex) => regex,
            Err(err) => {
                return Ok(vec![LintResult::for_rule(
                    self,
                    node,
                    format!("matchingRegex of group {} does not compile: {err}", view.group.id),
                )]);
            }
        };

        if ctx.model.signals().any(|s| regex.is_match(&s.signal.id)) {
            return Ok(Vec::new());
        }
        let mut result = LintResult::for_rule(
            self,
            node,
            format!(
                "matchingRegex '{pattern}' of group {} matches no signal id",
                view.group.id
            ),
        );
        // never louder than a warning
        result.severity = result.severity.max(Severity::Warning);
        Ok(vec![result])
    }
}
