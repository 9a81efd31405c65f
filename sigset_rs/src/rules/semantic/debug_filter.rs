//! Debug filters kept in step with the model-year test fixtures.

use serde_json::json;

use crate::cache::ContentCache;
use crate::coverage::{CommandSupport, CoverageEngine, FilterChange, format_year_set};
use crate::document::{CommandView, Node, SignalView, format_filter};
use crate::rules::{LintContext, LintResult, Rule, RuleConfig, RuleOutput, Severity, rule_meta};

pub struct DebugFilterCoverageRule {
    config: RuleConfig,
    support_cache: ContentCache<CommandSupport>,
}

impl Default for DebugFilterCoverageRule {
    fn default() -> Self {
        Self {
            config: RuleConfig::new(Severity::Information),
            support_cache: ContentCache::default(),
        }
    }
}

impl DebugFilterCoverageRule {
    fn support(&self, engine: &CoverageEngine, command: &CommandView<'_>) -> CommandSupport {
        let key = ContentCache::<CommandSupport>::key_for(&json!([
            engine.index().root().to_string_lossy(),
            command.node.to_value(),
        ]));
        self.support_cache
            .get_or_insert_with(&key, || engine.support_for(&command.command.identifier()))
    }
}

fn anchor<'n>(command: &CommandView<'n>) -> &'n Node {
    command
        .node
        .get("dbgfilter")
        .or_else(|| command.node.property("dbg"))
        .unwrap_or(command.node)
}

impl Rule for DebugFilterCoverageRule {
    rule_meta!(
        "debug-filter-coverage",
        "Debug filter coverage",
        "Debug filters exclude exactly the model years without test coverage",
        [Command]
    );

    fn validate_command(
        &self,
        ctx: &LintContext<'_>,
        command: &CommandView<'_>,
        _signals: &[SignalView<'_>],
    ) -> RuleOutput {
        let Some(engine) = ctx.coverage.filter(|e| e.has_data()) else {
            return Ok(Vec::new());
        };
        let support = self.support(engine, command);
        let plan = engine.plan_with_support(command, support, None);
        if !plan.is_change() {
            return Ok(Vec::new());
        }

        let supported = format_year_set(&plan.support.supported);
        let message = match (&plan.change, &plan.before) {
            (FilterChange::Set(filter), None) => format!(
                "Command {} is verified for {supported}; add debug filter {}",
                plan.id,
                format_filter(filter)
            ),
            (FilterChange::Set(filter), Some(_)) => format!(
                "Debug filter of {} is out of step with verified years ({supported}); update to {}",
                plan.id,
                format_filter(filter)
            ),
            _ => format!(
                "Debug filter of {} excludes no unverified year; remove it",
                plan.id
            ),
        };
        let suggestion = plan.edit(ctx.text, command);
        Ok(vec![
            LintResult::for_rule(self, anchor(command), message).with_suggestion(suggestion),
        ])
    }
}
