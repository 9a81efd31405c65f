//! Commands sharing a request payload must be told apart by their response
//! address (`rax`).

use std::collections::BTreeMap;

use crate::document::{Node, NodeKind};
use crate::rules::{LintContext, LintResult, Rule, RuleConfig, RuleOutput, Severity, rule_meta};

pub struct RaxAmbiguityRule {
    config: RuleConfig,
}

impl Default for RaxAmbiguityRule {
    fn default() -> Self {
        Self {
            config: RuleConfig::new(Severity::Warning),
        }
    }
}

/// Grouping key for a `cmd` value: strings as-is, `{service: payload}` as
/// `service+payload`, anything else as its compact JSON.
pub fn normalized_cmd(cmd: &Node) -> String {
    match cmd.kind {
        NodeKind::String => cmd.as_str().unwrap_or_default().to_string(),
        NodeKind::Object if cmd.children.len() == 1 => {
            let prop = &cmd.children[0];
            let key = prop.key().unwrap_or_default();
            let value = prop
                .value_node()
                .map(|v| match v.as_str() {
                    Some(s) => s.to_string(),
                    None => v.to_value().to_string(),
                })
                .unwrap_or_default();
            format!("{key}{value}")
        }
        _ => cmd.to_value().to_string(),
    }
}

struct Entry<'a> {
    node: &'a Node,
    cmd_node: &'a Node,
    rax_node: Option<&'a Node>,
}

impl Entry<'_> {
    fn rax(&self) -> Option<&str> {
        self.rax_node.and_then(Node::as_str)
    }

    fn label(&self) -> String {
        let hdr = self
            .node
            .get("hdr")
            .and_then(Node::as_str)
            .unwrap_or("?");
        match self.rax() {
            Some(rax) => format!("{hdr}/{rax}"),
            None => hdr.to_string(),
        }
    }
}

impl Rule for RaxAmbiguityRule {
    rule_meta!(
        "command-rax-ambiguity",
        "Ambiguous response address",
        "Commands with the same payload need distinct response address filters",
        [Commands]
    );

    fn validate_commands(&self, _ctx: &LintContext<'_>, commands: &Node) -> RuleOutput {
        let mut groups: BTreeMap<String, Vec<Entry<'_>>> = BTreeMap::new();
        for node in commands.items() {
            let Some(cmd_node) = node.get("cmd") else {
                continue;
            };
            groups
                .entry(normalized_cmd(cmd_node))
                .or_default()
                .push(Entry {
                    node,
                    cmd_node,
                    rax_node: node.get("rax"),
                });
        }

        let mut results = Vec::new();
        for (cmd, entries) in groups.iter().filter(|(_, e)| e.len() > 1) {
            if entries.iter().any(|e| e.rax().is_none()) {
                let members: Vec<String> = entries.iter().map(Entry::label).collect();
                for entry in entries {
                    results.push(LintResult::for_rule(
                        self,
                        entry.cmd_node,
                        format!(
                            "Command {cmd} is sent by {} commands ({}) and not all set 'rax'; responses are ambiguous",
                            entries.len(),
                            members.join(", ")
                        ),
                    ));
                }
            }

            let mut by_rax: BTreeMap<&str, Vec<&Entry<'_>>> = BTreeMap::new();
            for entry in entries {
                if let Some(rax) = entry.rax() {
                    by_rax.entry(rax).or_default().push(entry);
                }
            }
            for (rax, shared) in by_rax.iter().filter(|(_, e)| e.len() > 1) {
                for entry in shared {
                    let node = entry.rax_node.unwrap_or(entry.node);
                    results.push(LintResult::for_rule(
                        self,
                        node,
                        format!(
                            "Response address {rax} is used by {} commands sending {cmd}",
                            shared.len()
                        ),
                    ));
                }
            }
        }

        // report in document order
        results.sort_by_key(|r| r.node.offset);
        Ok(results)
    }
}
