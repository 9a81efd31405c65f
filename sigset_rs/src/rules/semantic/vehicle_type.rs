//! Powertrain classification of a whole document.
//!
//! Every command is scored against weighted EV and ICE keyword patterns over
//! its header, payload, response address and signal ids/names. A command
//! "matches" a powertrain when its score reaches [`MATCH_SCORE`]; an EV match
//! also needs [`MIN_EV_KEYWORDS`] distinct keywords, and an ICE match must not
//! be an EV match. Charge-air and supercharger wording is not EV evidence. The
//! share of matching commands decides the class:
//!
//! - more than 10% EV commands: `Ev`, or `Hybrid` when ICE also exceeds 10%
//! - otherwise more than 5% ICE commands: `Ice`
//! - otherwise `Unknown`
//!
//! In an ICE document the EV-matching commands are flagged for removal.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::document::{CommandView, Node, SignalSet, Suggestion};
use crate::rules::structural::remove_item;
use crate::rules::{LintContext, LintResult, Rule, RuleConfig, RuleOutput, Severity, rule_meta};

pub const MATCH_SCORE: u32 = 2;
pub const MIN_EV_KEYWORDS: usize = 2;
const EV_RATIO: f64 = 0.10;
const HYBRID_ICE_RATIO: f64 = 0.10;
const ICE_RATIO: f64 = 0.05;

fn patterns(table: &[(&str, u32)]) -> Vec<(Regex, u32)> {
    table
        .iter()
        .map(|(pattern, weight)| (Regex::new(pattern).expect("valid regex"), *weight))
        .collect()
}

static EV_PATTERNS: LazyLock<Vec<(Regex, u32)>> = LazyLock::new(|| {
    patterns(&[
        (r"\bHV ?BAT\w*", 3),
        (r"\bBMS\b", 3),
        (r"\bEVSE\b", 3),
        (r"\bSOC\b", 2),
        (r"\bSOH\b", 2),
        (r"\bCHARG\w*", 2),
        (r"\bCELLS?\b", 2),
        (r"\bINVERTER\b", 2),
        (r"\bDC ?DC\b", 2),
        (r"\bREGEN\w*", 2),
        (r"\bKWH\b", 2),
        (r"\bTRACTION\b", 2),
        (r"\bHV\b", 2),
        (r"\bMOTOR\b", 1),
    ])
});

/// Combustion wording that would otherwise read as charging.
static NOT_EV: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:SUPER|TURBO)CHARG\w*|\bCHARGE (?:AIR|PRESSURE)\b|\bCAC\b")
        .expect("valid regex")
});

static ICE_PATTERNS: LazyLock<Vec<(Regex, u32)>> = LazyLock::new(|| {
    patterns(&[
        (r"\bEGR\b", 3),
        (r"\bMAF\b", 3),
        (r"\bCATALYST\b", 3),
        (r"\bMISFIRE\w*", 3),
        (r"\bSPARK\b", 3),
        (r"\bFUEL\b", 2),
        (r"\bOIL\b", 2),
        (r"\bTHROTTLE\b", 2),
        (r"\bINTAKE\b", 2),
        (r"\bO2\b", 2),
        (r"\bLAMBDA\b", 2),
        (r"\bTURBO\b", 2),
        (r"\bBOOST\b", 2),
        (r"\bEXHAUST\b", 2),
        (r"\bCOOLANT\b", 1),
    ])
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VehicleClass {
    Ev,
    Ice,
    Hybrid,
    Unknown,
}

impl fmt::Display for VehicleClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Ev => "EV",
            Self::Ice => "ICE",
            Self::Hybrid => "HYBRID",
            Self::Unknown => "UNKNOWN",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandScore {
    pub index: usize,
    pub ev: u32,
    pub ice: u32,
    /// EV patterns that matched, for messages.
    pub ev_hits: Vec<String>,
}

impl CommandScore {
    pub fn is_ev(&self) -> bool {
        self.ev >= MATCH_SCORE && self.ev_hits.len() >= MIN_EV_KEYWORDS
    }

    pub fn is_ice_only(&self) -> bool {
        self.ice >= MATCH_SCORE && !self.is_ev()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VehicleClassification {
    pub class: VehicleClass,
    pub ev_ratio: f64,
    pub ice_ratio: f64,
    pub scores: Vec<CommandScore>,
}

impl VehicleClassification {
    /// Commands matching the EV patterns.
    pub fn ev_commands(&self) -> impl Iterator<Item = &CommandScore> {
        self.scores.iter().filter(|s| s.is_ev())
    }
}

/// Uppercase text with every non-alphanumeric run turned into one space,
/// so `HVBAT_SOC` reads as two words.
fn searchable_text(command: &CommandView<'_>) -> String {
    let mut parts = vec![command.command.hdr.clone(), command.command.cmd.flatten()];
    parts.extend(command.command.rax.clone());
    for signal in &command.signals {
        parts.push(signal.signal.id.clone());
        parts.push(signal.signal.name.clone());
    }
    let joined = parts.join(" ").to_uppercase();
    let mut out = String::with_capacity(joined.len());
    for c in joined.chars() {
        if c.is_alphanumeric() {
            out.push(c);
        } else if !out.ends_with(' ') {
            out.push(' ');
        }
    }
    out
}

fn score(text: &str, table: &[(Regex, u32)]) -> (u32, Vec<String>) {
    let mut total = 0;
    let mut hits = Vec::new();
    for (regex, weight) in table {
        if let Some(found) = regex.find(text) {
            total += weight;
            hits.push(found.as_str().to_string());
        }
    }
    (total, hits)
}

pub fn classify(model: &SignalSet<'_>) -> VehicleClassification {
    let scores: Vec<CommandScore> = model
        .commands
        .iter()
        .map(|command| {
            let text = searchable_text(command);
            let (ev, ev_hits) = score(&NOT_EV.replace_all(&text, " "), &EV_PATTERNS);
            let (ice, _) = score(&text, &ICE_PATTERNS);
            CommandScore {
                index: command.index,
                ev,
                ice,
                ev_hits,
            }
        })
        .collect();

    let total = scores.len();
    if total == 0 {
        return VehicleClassification {
            class: VehicleClass::Unknown,
            ev_ratio: 0.0,
            ice_ratio: 0.0,
            scores,
        };
    }
    let ratio = |count: usize| count as f64 / total as f64;
    let ev_ratio = ratio(scores.iter().filter(|s| s.is_ev()).count());
    let ice_ratio = ratio(scores.iter().filter(|s| s.is_ice_only()).count());

    let class = if ev_ratio > EV_RATIO {
        if ice_ratio > HYBRID_ICE_RATIO {
            VehicleClass::Hybrid
        } else {
            VehicleClass::Ev
        }
    } else if ice_ratio > ICE_RATIO {
        VehicleClass::Ice
    } else {
        VehicleClass::Unknown
    };

    tracing::debug!(%class, ev_ratio, ice_ratio, commands = total, "classified document");
    VehicleClassification {
        class,
        ev_ratio,
        ice_ratio,
        scores,
    }
}

pub struct VehicleTypeRule {
    config: RuleConfig,
}

impl Default for VehicleTypeRule {
    fn default() -> Self {
        Self {
            config: RuleConfig::new(Severity::Warning),
        }
    }
}

impl Rule for VehicleTypeRule {
    rule_meta!(
        "vehicle-type",
        "Vehicle type consistency",
        "Combustion vehicle documents carry no electric-vehicle commands",
        [Document]
    );

    fn validate_document(&self, ctx: &LintContext<'_>, _root: &Node) -> RuleOutput {
        let classification = classify(ctx.model);
        if classification.class != VehicleClass::Ice {
            return Ok(Vec::new());
        }
        let commands_node = ctx.model.commands_node;

        let mut results = Vec::new();
        for score in classification.ev_commands() {
            let Some(command) = ctx.model.commands.iter().find(|c| c.index == score.index) else {
                continue;
            };
            let id = command.command.identifier();
            let suggestion = commands_node
                .and_then(|array| remove_item(array, command.node))
                .map(|edit| Suggestion::single(format!("Remove command {id}"), edit));
            results.push(
                LintResult::for_rule(
                    self,
                    command.node,
                    format!(
                        "Command {id} looks electric-vehicle specific ({}) in an ICE document",
                        score.ev_hits.join(", ")
                    ),
                )
                .with_suggestion(suggestion),
            );
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use crate::rules::test_support::{apply_all, run_rule};

    fn command(hdr: &str, cmd: &str, id: &str, name: &str) -> String {
        format!(
            r#"    {{"hdr": "{hdr}", "cmd": "{cmd}", "signals": [{{"id": "{id}", "name": "{name}", "fmt": {{"len": 8}}}}]}}"#
        )
    }

    fn document(commands: &[String]) -> String {
        format!("{{\"commands\": [\n{}\n]}}", commands.join(",\n"))
    }

    fn ice_document() -> String {
        let mut commands: Vec<String> = (0..18)
            .map(|i| command("7E0", &format!("01{i:02X}"), &format!("PID_{i}"), "Value"))
            .collect();
        commands.push(command("7E0", "0110", "MAF_RATE", "Intake air mass"));
        commands.push(command("7E0", "015E", "FUEL_RATE", "Fuel rate"));
        commands.push(command("7E4", "22F40D", "HVBAT_SOC", "HV battery charge"));
        document(&commands)
    }

    #[test]
    fn test_classification_thresholds() {
        let text = ice_document();
        let doc = Document::parse(text).unwrap();
        let result = classify(&doc.model());
        assert_eq!(result.class, VehicleClass::Ice);
        assert!(result.ev_ratio < EV_RATIO);

        let ev = document(&[
            command("7E4", "220101", "BMS_SOC", "State of charge"),
            command("7E4", "220102", "HVBAT_V", "HV battery voltage"),
            command("7E0", "0100", "PIDS", "Supported PIDs"),
        ]);
        let doc = Document::parse(ev).unwrap();
        assert_eq!(classify(&doc.model()).class, VehicleClass::Ev);

        let hybrid = document(&[
            command("7E4", "220101", "BMS_SOC", "State of charge"),
            command("7E0", "015E", "FUEL_RATE", "Fuel rate"),
            command("7E0", "0100", "PIDS", "Supported PIDs"),
        ]);
        let doc = Document::parse(hybrid).unwrap();
        assert_eq!(classify(&doc.model()).class, VehicleClass::Hybrid);

        let doc = Document::parse(document(&[command("7E0", "0100", "PIDS", "Supported PIDs")]))
            .unwrap();
        assert_eq!(classify(&doc.model()).class, VehicleClass::Unknown);
    }

    #[test]
    fn test_ev_command_in_ice_document_is_removed() {
        let text = ice_document();
        let results = run_rule(Box::new(VehicleTypeRule::default()), &text);
        assert_eq!(results.len(), 1);
        assert!(results[0].message.starts_with("Command 7E4.22F40D looks electric-vehicle"));

        let fixed = apply_all(&text, &results);
        assert!(!fixed.contains("HVBAT_SOC"));
        assert!(Document::parse(fixed.as_str()).is_ok());
    }

    #[test]
    fn test_charge_air_cooler_is_not_electric() {
        let mut commands: Vec<String> = (0..10)
            .map(|i| {
                command(
                    "7E0",
                    &format!("01{:02X}", 6 + i),
                    &format!("FUEL_TRIM_{i}"),
                    "Fuel trim",
                )
            })
            .collect();
        commands.push(command("7E0", "0177", "CAC_TEMP", "Charge air cooler temperature"));
        let text = document(&commands);

        let doc = Document::parse(text.as_str()).unwrap();
        let result = classify(&doc.model());
        assert_eq!(result.class, VehicleClass::Ice);
        assert_eq!(result.scores[10].ev, 0);
        assert!(run_rule(Box::new(VehicleTypeRule::default()), &text).is_empty());
    }

    #[test]
    fn test_single_ev_keyword_is_not_a_match() {
        let mut commands: Vec<String> = (0..10)
            .map(|i| command("7E0", &format!("01{:02X}", 6 + i), "FUEL_TRIM", "Fuel trim"))
            .collect();
        commands.push(command("7E0", "0142", "MODULE_V", "Charging system voltage"));
        let text = document(&commands);
        let doc = Document::parse(text.as_str()).unwrap();
        let result = classify(&doc.model());
        assert_eq!(result.scores[10].ev_hits, vec!["CHARGING"]);
        assert!(!result.scores[10].is_ev());
        assert!(run_rule(Box::new(VehicleTypeRule::default()), &text).is_empty());
    }

    #[test]
    fn test_ice_ratio_counts_ice_only_commands() {
        let text = document(&[
            command("7E4", "220101", "BMS_SOC", "State of charge"),
            command("7E4", "220105", "HVBAT_FUEL", "HV battery fuel equivalent"),
            command("7E0", "0100", "PIDS", "Supported PIDs"),
        ]);
        let doc = Document::parse(text).unwrap();
        let result = classify(&doc.model());
        assert!(result.scores[1].is_ev());
        assert!(!result.scores[1].is_ice_only());
        assert_eq!(result.ice_ratio, 0.0);
        assert_eq!(result.class, VehicleClass::Ev);
    }

    #[test]
    fn test_underscored_ids_split_into_words() {
        let doc = Document::parse(document(&[command("7E4", "2201", "HVBAT_SOC", "x")])).unwrap();
        let model = doc.model();
        assert_eq!(searchable_text(&model.commands[0]), "7E4 2201 HVBAT SOC X");
    }
}
