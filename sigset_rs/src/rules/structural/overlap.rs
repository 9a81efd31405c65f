//! Signals within one command whose bit ranges intersect.

use super::remove_item;
use crate::document::{CommandView, Suggestion, SignalView};
use crate::rules::{LintContext, LintResult, Rule, RuleConfig, RuleOutput, Severity, rule_meta};

/// Id segments marking a superseded signal definition.
pub const OBSOLETE_MARKERS: &[&str] = &["PRE21", "OLD", "V1"];

/// Id segments naming a subsystem; ids carrying one are kept over bare ones.
const SPECIFIC_KEYWORDS: &[&str] = &[
    "ENG", "ENGINE", "TRANS", "TCM", "ECM", "BCM", "ABS", "ESP", "TPMS", "HVBAT", "BMS", "CELL",
    "CHARGER", "INV", "MOTOR", "FUEL", "OIL", "COOLANT", "ODO", "GPS", "HVAC", "DOOR", "SEAT",
];

pub struct BitOverlapRule {
    config: RuleConfig,
}

impl Default for BitOverlapRule {
    fn default() -> Self {
        Self {
            config: RuleConfig::new(Severity::Error),
        }
    }
}

fn segments(id: &str) -> impl Iterator<Item = &str> {
    id.split('_').filter(|s| !s.is_empty())
}

fn is_obsolete(id: &str) -> bool {
    let upper = id.to_ascii_uppercase();
    segments(&upper).any(|seg| OBSOLETE_MARKERS.contains(&seg))
}

fn specificity(id: &str) -> (bool, usize) {
    let upper = id.to_ascii_uppercase();
    let specific = segments(&upper).any(|seg| SPECIFIC_KEYWORDS.contains(&seg));
    (specific, id.len())
}

/// Connected components of intersecting bit ranges, as indices into
/// `signals`, in document order. Signals sharing an id are not compared.
pub fn overlap_groups(signals: &[SignalView<'_>]) -> Vec<Vec<usize>> {
    let ranges: Vec<_> = signals.iter().map(|s| s.signal.fmt.bit_range()).collect();
    let mut component: Vec<usize> = (0..signals.len()).collect();

    fn root(component: &mut [usize], mut i: usize) -> usize {
        while component[i] != i {
            component[i] = component[component[i]];
            i = component[i];
        }
        i
    }

    for a in 0..signals.len() {
        for b in a + 1..signals.len() {
            let (Some((a_lo, a_hi)), Some((b_lo, b_hi))) = (ranges[a], ranges[b]) else {
                continue;
            };
            if signals[a].signal.id == signals[b].signal.id {
                continue;
            }
            if a_lo <= b_hi && b_lo <= a_hi {
                let (ra, rb) = (root(&mut component, a), root(&mut component, b));
                component[ra.max(rb)] = ra.min(rb);
            }
        }
    }

    let mut groups: Vec<Vec<usize>> = Vec::new();
    let mut slot_of_root = vec![usize::MAX; signals.len()];
    for i in 0..signals.len() {
        let r = root(&mut component, i);
        if slot_of_root[r] == usize::MAX {
            slot_of_root[r] = groups.len();
            groups.push(Vec::new());
        }
        groups[slot_of_root[r]].push(i);
    }
    groups.retain(|g| g.len() > 1);
    groups
}

/// The one signal of an overlapping group to drop: an obsolete definition if
/// any, else the least specific (later signal wins ties).
fn removal_candidate(signals: &[SignalView<'_>], group: &[usize]) -> usize {
    if let Some(&obsolete) = group.iter().find(|&&i| is_obsolete(&signals[i].signal.id)) {
        return obsolete;
    }
    let mut pick = group[0];
    for &i in &group[1..] {
        if specificity(&signals[i].signal.id) <= specificity(&signals[pick].signal.id) {
            pick = i;
        }
    }
    pick
}

fn describe(signal: &SignalView<'_>) -> String {
    match signal.signal.fmt.bit_range() {
        Some((lo, hi)) => format!("{} (bits {lo}-{hi})", signal.signal.id),
        None => signal.signal.id.clone(),
    }
}

impl Rule for BitOverlapRule {
    rule_meta!(
        "bit-overlap",
        "Bit range overlap",
        "Signals in one command must not share response bits",
        [Command]
    );

    fn validate_command(
        &self,
        _ctx: &LintContext<'_>,
        command: &CommandView<'_>,
        signals: &[SignalView<'_>],
    ) -> RuleOutput {
        let signals_node = command.node.get("signals");
        let mut results = Vec::new();

        for group in overlap_groups(signals) {
            let remove = removal_candidate(signals, &group);
            let target = &signals[remove];
            let others: Vec<String> = group
                .iter()
                .filter(|&&i| i != remove)
                .map(|&i| describe(&signals[i]))
                .collect();

            let suggestion = signals_node
                .and_then(|array| remove_item(array, target.node))
                .map(|edit| Suggestion::single(format!("Remove {}", target.signal.id), edit));

            results.push(
                LintResult::for_rule(
                    self,
                    target.node,
                    format!(
                        "{} overlaps {}; {} should be removed",
                        describe(target),
                        others.join(", "),
                        target.signal.id
                    ),
                )
                .with_suggestion(suggestion),
            );
        }
        Ok(results)
    }
}
