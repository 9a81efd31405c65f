//! Rule registry and document walk.
//!
//! The registry owns a fixed list of rules built once by the caller. A pass
//! runs document-level hooks, then the `commands` array hooks, then every
//! command followed by its signals, then every signal group. A rule that
//! errors or panics on one target is logged and skipped for that target only.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use super::{
    Granularity, LintContext, LintResult, MALFORMED_RULE_ID, Rule, RuleOutput, Severity,
    SignalTarget, default_rules,
};
use crate::config::SigsetConfig;
use crate::coverage::CoverageEngine;
use crate::document::Document;
use crate::error::Result;

pub struct RuleRegistry {
    rules: Vec<Box<dyn Rule>>,
}

impl Default for RuleRegistry {
    fn default() -> Self {
        Self::new(default_rules())
    }
}

impl std::fmt::Debug for RuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.rules.iter().map(|r| r.id()))
            .finish()
    }
}

impl RuleRegistry {
    pub fn new(rules: Vec<Box<dyn Rule>>) -> Self {
        Self { rules }
    }

    /// Built-in rules with per-rule overrides from the project config.
    pub fn from_config(config: &SigsetConfig) -> Self {
        let mut rules = default_rules();
        for rule in &mut rules {
            let Some(overrides) = config.rules.get(rule.id()) else {
                continue;
            };
            let cfg = rule.config_mut();
            if let Some(enabled) = overrides.enabled {
                cfg.enabled = enabled;
            }
            if let Some(severity) = overrides.severity {
                cfg.severity = severity;
            }
        }
        for id in config.rules.keys() {
            if !rules.iter().any(|r| r.id() == id) {
                tracing::warn!(rule = %id, "config names an unknown rule");
            }
        }
        Self::new(rules)
    }

    pub fn rules(&self) -> &[Box<dyn Rule>] {
        &self.rules
    }

    pub fn rule(&self, id: &str) -> Option<&dyn Rule> {
        self.rules.iter().find(|r| r.id() == id).map(|r| r.as_ref())
    }

    fn enabled_for(&self, granularity: Granularity) -> impl Iterator<Item = &dyn Rule> {
        self.rules
            .iter()
            .map(|r| r.as_ref())
            .filter(move |r| r.config().enabled && r.handles(granularity))
    }

    /// Parse `text` and run one pass. Only unparsable text is an error.
    pub fn lint(&self, text: &str, coverage: Option<&CoverageEngine>) -> Result<Vec<LintResult>> {
        let doc = Document::parse(text)?;
        Ok(self.run(&doc, coverage))
    }

    /// One pass over an already parsed document.
    pub fn run(&self, doc: &Document, coverage: Option<&CoverageEngine>) -> Vec<LintResult> {
        let model = doc.model();
        let ctx = LintContext {
            text: doc.text(),
            model: &model,
            coverage,
        };

        let mut results: Vec<LintResult> = model
            .malformed
            .iter()
            .map(|m| LintResult::new(MALFORMED_RULE_ID, Severity::Error, m.span, &m.message))
            .collect();

        for rule in self.enabled_for(Granularity::Document) {
            results.extend(guard(rule, "document", || {
                rule.validate_document(&ctx, doc.root())
            }));
        }

        if let Some(commands) = model.commands_node {
            for rule in self.enabled_for(Granularity::Commands) {
                results.extend(guard(rule, "commands", || {
                    rule.validate_commands(&ctx, commands)
                }));
            }
        }

        for command in &model.commands {
            for rule in self.enabled_for(Granularity::Command) {
                results.extend(guard(rule, "command", || {
                    rule.validate_command(&ctx, command, &command.signals)
                }));
            }
            for signal in &command.signals {
                for rule in self.enabled_for(Granularity::Signal) {
                    results.extend(guard(rule, &signal.signal.id, || {
                        rule.validate_signal(&ctx, SignalTarget::Signal(signal))
                    }));
                }
            }
        }

        for group in &model.groups {
            for rule in self.enabled_for(Granularity::Signal) {
                results.extend(guard(rule, &group.group.id, || {
                    rule.validate_signal(&ctx, SignalTarget::Group(group))
                }));
            }
        }

        tracing::debug!(findings = results.len(), "lint pass complete");
        results
    }
}

fn guard(rule: &dyn Rule, target: &str, hook: impl FnOnce() -> RuleOutput) -> Vec<LintResult> {
    match panic::catch_unwind(AssertUnwindSafe(hook)) {
        Ok(Ok(results)) => results,
        Ok(Err(err)) => {
            tracing::warn!(rule = rule.id(), target, "rule failed: {err:#}");
            Vec::new()
        }
        Err(payload) => {
            tracing::error!(
                rule = rule.id(),
                target,
                "rule panicked: {}",
                panic_message(payload.as_ref())
            );
            Vec::new()
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RuleOverride;
    use crate::document::{CommandView, Node, SignalView};
    use crate::rules::{RuleConfig, rule_meta};
    use std::sync::{Arc, Mutex};

    /// Records every hook call in order.
    struct Recorder {
        config: RuleConfig,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl Recorder {
        fn push(&self, entry: String) {
            self.log.lock().unwrap().push(entry);
        }
    }

    impl Rule for Recorder {
        rule_meta!(
            "recorder",
            "Recorder",
            "Records hook calls",
            [Signal, Command, Commands, Document]
        );

        fn validate_signal(&self, _ctx: &LintContext<'_>, target: SignalTarget<'_, '_>) -> RuleOutput {
            self.push(format!("signal:{}", target.id()));
            Ok(Vec::new())
        }

        fn validate_command(
            &self,
            _ctx: &LintContext<'_>,
            command: &CommandView<'_>,
            signals: &[SignalView<'_>],
        ) -> RuleOutput {
            self.push(format!("command:{}:{}", command.index, signals.len()));
            Ok(Vec::new())
        }

        fn validate_commands(&self, _ctx: &LintContext<'_>, _commands: &Node) -> RuleOutput {
            self.push("commands".to_string());
            Ok(Vec::new())
        }

        fn validate_document(&self, _ctx: &LintContext<'_>, _root: &Node) -> RuleOutput {
            self.push("document".to_string());
            Ok(Vec::new())
        }
    }

    struct Faulty {
        config: RuleConfig,
        panics: bool,
    }

    impl Rule for Faulty {
        rule_meta!("faulty", "Faulty", "Always fails", [Signal]);

        fn validate_signal(&self, _ctx: &LintContext<'_>, _target: SignalTarget<'_, '_>) -> RuleOutput {
            if self.panics {
                panic!("boom");
            }
            anyhow::bail!("cannot evaluate")
        }
    }

    struct Flagger {
        config: RuleConfig,
    }

    impl Rule for Flagger {
        rule_meta!("flagger", "Flagger", "Flags every signal", [Signal]);

        fn validate_signal(&self, _ctx: &LintContext<'_>, target: SignalTarget<'_, '_>) -> RuleOutput {
            Ok(vec![LintResult::for_rule(self, target.node(), target.id())])
        }
    }

    const DOC: &str = r#"{
  "commands": [
    { "hdr": "7E0", "cmd": "0100", "signals": [
      { "id": "A", "fmt": { "len": 8 } },
      { "id": "B", "fmt": { "len": 8 } } ] },
    { "cmd": "0200" },
    { "hdr": "7E4", "cmd": "0300", "signals": [ { "id": "C", "fmt": { "len": 1 } } ] }
  ],
  "signalGroups": [ { "id": "G", "matchingRegex": "A|B" } ]
}"#;

    #[test]
    fn test_dispatch_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let registry = RuleRegistry::new(vec![Box::new(Recorder {
            config: RuleConfig::new(Severity::Hint),
            log: log.clone(),
        })]);
        let results = registry.lint(DOC, None).unwrap();

        let log = log.lock().unwrap().clone();
        assert_eq!(
            log,
            vec![
                "document",
                "commands",
                "command:0:2",
                "signal:A",
                "signal:B",
                "command:2:1",
                "signal:C",
                "signal:G",
            ]
        );
        // the hdr-less command is reported, not dispatched
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].rule_id, MALFORMED_RULE_ID);
    }

    #[test]
    fn test_faulty_rules_do_not_stop_the_pass() {
        for panics in [false, true] {
            let registry = RuleRegistry::new(vec![
                Box::new(Faulty {
                    config: RuleConfig::new(Severity::Error),
                    panics,
                }),
                Box::new(Flagger {
                    config: RuleConfig::new(Severity::Warning),
                }),
            ]);
            let results = registry.lint(DOC, None).unwrap();
            let flagged: Vec<_> = results
                .iter()
                .filter(|r| r.rule_id == "flagger")
                .map(|r| r.message.as_str())
                .collect();
            assert_eq!(flagged, vec!["A", "B", "C", "G"]);
        }
    }

    #[test]
    fn test_disabled_rules_are_skipped() {
        let mut flagger = Flagger {
            config: RuleConfig::new(Severity::Warning),
        };
        flagger.config.enabled = false;
        let registry = RuleRegistry::new(vec![Box::new(flagger)]);
        let results = registry.lint(DOC, None).unwrap();
        assert!(results.iter().all(|r| r.rule_id == MALFORMED_RULE_ID));
    }

    #[test]
    fn test_unparsable_text_is_an_error() {
        let registry = RuleRegistry::default();
        assert!(registry.lint("{ \"commands\": [", None).is_err());
    }

    #[test]
    fn test_config_overrides_apply_to_rule_config() {
        let mut config = SigsetConfig::default();
        config.rules.insert(
            "spelling".to_string(),
            RuleOverride {
                enabled: Some(false),
                severity: None,
            },
        );
        config.rules.insert(
            "formula-range".to_string(),
            RuleOverride {
                enabled: None,
                severity: Some(Severity::Error),
            },
        );
        let registry = RuleRegistry::from_config(&config);
        assert!(!registry.rule("spelling").unwrap().config().enabled);
        assert_eq!(
            registry.rule("formula-range").unwrap().config().severity,
            Severity::Error
        );
        assert!(registry.rule("bit-overlap").unwrap().config().enabled);
    }
}
