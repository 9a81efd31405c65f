//! Signal and signal group ids share one namespace per document.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;

use crate::document::{Node, Suggestion, TextEdit};
use crate::rules::{LintContext, LintResult, Rule, RuleConfig, RuleOutput, Severity, rule_meta};

static VERSION_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.*)_V(\d+)$").expect("valid regex"));

pub struct DuplicateIdRule {
    config: RuleConfig,
}

impl Default for DuplicateIdRule {
    fn default() -> Self {
        Self {
            config: RuleConfig::new(Severity::Error),
        }
    }
}

/// Rename for the `occurrence`-th sighting of `id` (2 for the first duplicate).
///
/// `ID` becomes `ID_V2`, `ID_V3`, ...; `ID_V4` becomes `ID_V5`, `ID_V6`, ...
/// The version is bumped further while the candidate is in `taken`. A suffix
/// too large to bump is kept and a fresh `_V2` is appended after it.
pub fn next_version_id(id: &str, occurrence: usize, taken: &HashSet<String>) -> String {
    let bump = (occurrence as u64).saturating_sub(1);
    let versioned = VERSION_SUFFIX.captures(id).and_then(|caps| {
        let n: u64 = caps[2].parse().ok()?;
        Some((caps[1].to_string(), n.saturating_add(bump)))
    });
    let (mut base, mut version) = versioned.unwrap_or_else(|| (id.to_string(), occurrence as u64));
    loop {
        let candidate = format!("{base}_V{version}");
        if !taken.contains(&candidate) {
            return candidate;
        }
        match version.checked_add(1) {
            Some(next) => version = next,
            None => {
                base = candidate;
                version = 2;
            }
        }
    }
}

impl Rule for DuplicateIdRule {
    rule_meta!(
        "duplicate-id",
        "Duplicate identifier",
        "Signal and signal group ids must be unique across the document",
        [Document]
    );

    fn validate_document(&self, ctx: &LintContext<'_>, _root: &Node) -> RuleOutput {
        let entries: Vec<(&str, &Node)> = ctx
            .model
            .signals()
            .map(|s| (s.signal.id.as_str(), s.id_node().unwrap_or(s.node)))
            .chain(
                ctx.model
                    .groups
                    .iter()
                    .map(|g| (g.group.id.as_str(), g.node.get("id").unwrap_or(g.node))),
            )
            .collect();

        let mut taken: HashSet<String> = entries.iter().map(|(id, _)| id.to_string()).collect();
        let mut seen: HashMap<&str, usize> = HashMap::new();
        let mut results = Vec::new();

        for (id, node) in entries {
            let count = seen.entry(id).or_insert(0);
            *count += 1;
            if *count == 1 {
                continue;
            }

            let rename = next_version_id(id, *count, &taken);
            taken.insert(rename.clone());
            let suggestion = (node.as_str() == Some(id)).then(|| {
                Suggestion::single(
                    format!("Rename to {rename}"),
                    TextEdit::replace_string(node, &rename),
                )
            });
            results.push(
                LintResult::for_rule(
                    self,
                    node,
                    format!("Duplicate id '{id}' (occurrence {count}); rename to {rename}"),
                )
                .with_suggestion(suggestion),
            );
        }
        Ok(results)
    }
}
