//! Lint rules over signal set documents.
//!
//! Every rule declares the granularities it runs at and carries its own
//! [`RuleConfig`]. The [`registry::RuleRegistry`] walks the document and calls
//! the matching hooks of every enabled rule.
//!
//! | Rule ID | Granularity | Default |
//! |---------|-------------|---------|
//! | `bit-overlap` | command | error |
//! | `duplicate-id` | document | error |
//! | `command-rax-ambiguity` | commands | warning |
//! | `naming-convention` | signal | warning |
//! | `signal-id-format` | signal | warning |
//! | `signal-name-case` | signal | information |
//! | `unit-metric` | signal | warning |
//! | `spelling` | signal | information |
//! | `formula-range` | signal | warning |
//! | `vehicle-type` | document | warning |
//! | `signal-group-regex` | signal (groups) | error |
//! | `debug-filter-coverage` | command | information |

pub mod registry;
pub mod semantic;
pub mod structural;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::coverage::CoverageEngine;
use crate::document::{
    CommandView, Node, SignalGroupView, SignalSet, SignalView, Span, Suggestion,
};

pub use registry::RuleRegistry;

/// Rule id used for commands/signals the model could not decode.
pub const MALFORMED_RULE_ID: &str = "malformed-entry";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Information,
    Hint,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Information => "information",
            Self::Hint => "hint",
        }
    }

    /// SARIF `level` for this severity.
    pub fn sarif_level(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Information | Self::Hint => "note",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "error" => Ok(Self::Error),
            "warning" | "warn" => Ok(Self::Warning),
            "information" | "info" => Ok(Self::Information),
            "hint" => Ok(Self::Hint),
            _ => Err(format!("Unknown severity: {}", s)),
        }
    }
}

/// Where in the document walk a rule hooks in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    /// Each signal and each signal group.
    Signal,
    /// Each command together with its decoded signals.
    Command,
    /// The `commands` array as a whole.
    Commands,
    /// The document root.
    Document,
}

impl Granularity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Signal => "signal",
            Self::Command => "command",
            Self::Commands => "commands",
            Self::Document => "document",
        }
    }
}

/// The two knobs every rule exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleConfig {
    pub enabled: bool,
    pub severity: Severity,
}

impl RuleConfig {
    pub const fn new(severity: Severity) -> Self {
        Self {
            enabled: true,
            severity,
        }
    }
}

/// One finding.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LintResult {
    #[serde(rename = "ruleId")]
    pub rule_id: String,
    pub severity: Severity,
    pub message: String,
    /// Source node the finding is attached to.
    pub node: Span,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<Suggestion>,
}

impl LintResult {
    pub fn new(
        rule_id: impl Into<String>,
        severity: Severity,
        node: Span,
        message: impl Into<String>,
    ) -> Self {
        Self {
            rule_id: rule_id.into(),
            severity,
            message: message.into(),
            node,
            suggestion: None,
        }
    }

    /// Finding stamped with the rule's id and configured severity.
    pub fn for_rule(rule: &dyn Rule, node: &Node, message: impl Into<String>) -> Self {
        Self::new(rule.id(), rule.config().severity, node.span(), message)
    }

    pub fn with_suggestion(mut self, suggestion: Option<Suggestion>) -> Self {
        self.suggestion = suggestion;
        self
    }
}

/// Target of a signal-granularity hook.
#[derive(Debug, Clone, Copy)]
pub enum SignalTarget<'r, 'a> {
    Signal(&'r SignalView<'a>),
    Group(&'r SignalGroupView<'a>),
}

impl SignalTarget<'_, '_> {
    pub fn id(&self) -> &str {
        match self {
            Self::Signal(view) => &view.signal.id,
            Self::Group(view) => &view.group.id,
        }
    }

    pub fn node(&self) -> &Node {
        match self {
            Self::Signal(view) => view.node,
            Self::Group(view) => view.node,
        }
    }
}

/// Per-pass inputs shared by every hook.
#[derive(Debug, Clone, Copy)]
pub struct LintContext<'a> {
    pub text: &'a str,
    pub model: &'a SignalSet<'a>,
    /// Year coverage data, when the caller has test cases available.
    pub coverage: Option<&'a CoverageEngine>,
}

pub type RuleOutput = anyhow::Result<Vec<LintResult>>;

/// A validator. Hooks default to "no findings"; the registry only calls
/// the hooks named in [`Rule::granularities`].
pub trait Rule: Send + Sync {
    fn id(&self) -> &'static str;
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    fn config(&self) -> &RuleConfig;
    fn config_mut(&mut self) -> &mut RuleConfig;
    fn granularities(&self) -> &'static [Granularity];

    fn validate_signal(&self, _ctx: &LintContext<'_>, _target: SignalTarget<'_, '_>) -> RuleOutput {
        Ok(Vec::new())
    }

    fn validate_command(
        &self,
        _ctx: &LintContext<'_>,
        _command: &CommandView<'_>,
        _signals: &[SignalView<'_>],
    ) -> RuleOutput {
        Ok(Vec::new())
    }

    fn validate_commands(&self, _ctx: &LintContext<'_>, _commands: &Node) -> RuleOutput {
        Ok(Vec::new())
    }

    fn validate_document(&self, _ctx: &LintContext<'_>, _root: &Node) -> RuleOutput {
        Ok(Vec::new())
    }

    fn handles(&self, granularity: Granularity) -> bool {
        self.granularities().contains(&granularity)
    }
}

/// Every built-in rule, in dispatch order.
pub fn default_rules() -> Vec<Box<dyn Rule>> {
    vec![
        Box::new(structural::BitOverlapRule::default()),
        Box::new(structural::DuplicateIdRule::default()),
        Box::new(structural::RaxAmbiguityRule::default()),
        Box::new(semantic::NamingConventionRule::default()),
        Box::new(semantic::SignalIdFormatRule::default()),
        Box::new(semantic::NameCaseRule::default()),
        Box::new(semantic::UnitMetricRule::default()),
        Box::new(semantic::SpellingRule::default()),
        Box::new(semantic::FormulaRangeRule::default()),
        Box::new(semantic::VehicleTypeRule::default()),
        Box::new(semantic::GroupRegexRule::default()),
        Box::new(semantic::DebugFilterCoverageRule::default()),
    ]
}

/// Implements the identity/config part of [`Rule`] for a struct with a
/// `config: RuleConfig` field.
macro_rules! rule_meta {
    ($id:literal, $name:literal, $description:literal, [$($granularity:ident),+]) => {
        fn id(&self) -> &'static str {
            $id
        }

        fn name(&self) -> &'static str {
            $name
        }

        fn description(&self) -> &'static str {
            $description
        }

        fn config(&self) -> &$crate::rules::RuleConfig {
            &self.config
        }

        fn config_mut(&mut self) -> &mut $crate::rules::RuleConfig {
            &mut self.config
        }

        fn granularities(&self) -> &'static [$crate::rules::Granularity] {
            &[$($crate::rules::Granularity::$granularity),+]
        }
    };
}
pub(crate) use rule_meta;

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::document::Document;

    /// Run a single rule through the registry.
    pub fn run_rule(rule: Box<dyn Rule>, text: &str) -> Vec<LintResult> {
        let registry = RuleRegistry::new(vec![rule]);
        let doc = Document::parse(text).expect("valid test document");
        registry.run(&doc, None)
    }

    /// Apply every suggestion of `results` to `text`.
    pub fn apply_all(text: &str, results: &[LintResult]) -> String {
        let edits: Vec<_> = results
            .iter()
            .filter_map(|r| r.suggestion.as_ref())
            .flat_map(|s| s.edits.iter().cloned())
            .collect();
        crate::document::apply_edits(text, &edits).0
    }
}
