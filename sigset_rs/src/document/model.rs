//! Typed views over a parsed signal set document.
//!
//! Every view keeps a reference to the syntax node it was decoded from, so
//! rules can place diagnostics and build edits against the original text.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::tree::{Node, NodeKind, Span, parse_tree};
use crate::error::Result;

fn one() -> f64 {
    1.0
}

/// Bit layout and decode formula of a signal: `value = raw * mul / div + add`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BitFormat {
    #[serde(default)]
    pub bix: u32,
    pub len: u32,
    #[serde(default)]
    pub sign: bool,
    #[serde(default = "one")]
    pub mul: f64,
    #[serde(default = "one")]
    pub div: f64,
    #[serde(default)]
    pub add: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    /// Raw decimal key to label (or label object).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub map: Option<BTreeMap<String, Value>>,
}

impl BitFormat {
    /// Inclusive `[bix, bix + len - 1]`, or `None` for zero-length signals.
    pub fn bit_range(&self) -> Option<(u32, u32)> {
        if self.len == 0 {
            return None;
        }
        Some((self.bix, self.bix.saturating_add(self.len - 1)))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub id: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub name: String,
    #[serde(
        default,
        rename = "suggestedMetric",
        skip_serializing_if = "Option::is_none"
    )]
    pub suggested_metric: Option<String>,
    pub fmt: BitFormat,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalGroup {
    pub id: String,
    #[serde(rename = "matchingRegex")]
    pub matching_regex: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Years excluded from validity: `< to`, `> from`, or listed in `years`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub years: Option<Vec<i32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<i32>,
}

impl Filter {
    pub fn is_empty(&self) -> bool {
        self.to.is_none() && self.from.is_none() && self.years.as_ref().is_none_or(Vec::is_empty)
    }

    /// Whether `year` falls inside the excluded set.
    pub fn excludes(&self, year: i32) -> bool {
        self.to.is_some_and(|to| year <= to)
            || self.from.is_some_and(|from| year >= from)
            || self.years.as_ref().is_some_and(|ys| ys.contains(&year))
    }
}

/// Request payload: a flat hex string or `{service: parameter}` pairs in
/// source order.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandPayload {
    Text(String),
    Params(Vec<(String, String)>),
}

impl CommandPayload {
    fn from_node(node: &Node) -> Option<Self> {
        match node.kind {
            NodeKind::String => node.as_str().map(|s| Self::Text(s.to_string())),
            NodeKind::Object => {
                let pairs = node
                    .children
                    .iter()
                    .filter_map(|prop| {
                        let key = prop.key()?;
                        let value = prop.value_node()?;
                        Some((key.to_string(), scalar_text(value)))
                    })
                    .collect();
                Some(Self::Params(pairs))
            }
            _ => None,
        }
    }

    /// Flat hex form: `{"22": "1100"}` becomes `221100`.
    pub fn flatten(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Params(pairs) => pairs.iter().map(|(k, v)| format!("{k}{v}")).collect(),
        }
    }
}

fn scalar_text(node: &Node) -> String {
    match &node.value {
        Value::String(s) => s.clone(),
        Value::Null if node.kind != NodeKind::Null => node.to_value().to_string(),
        other => other.to_string(),
    }
}

/// Command fields. Signals live on [`CommandView`].
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub hdr: String,
    pub cmd: CommandPayload,
    pub rax: Option<String>,
    pub dbg: bool,
    pub dbgfilter: Option<Filter>,
}

#[derive(Deserialize)]
struct CommandFields {
    hdr: Option<String>,
    rax: Option<String>,
    #[serde(default)]
    dbg: bool,
    dbgfilter: Option<Filter>,
}

#[derive(Debug, Clone)]
pub struct SignalView<'a> {
    pub signal: Signal,
    pub node: &'a Node,
    /// Index of the owning command in the `commands` array.
    pub command_index: usize,
}

impl SignalView<'_> {
    pub fn id_node(&self) -> Option<&Node> {
        self.node.get("id")
    }

    pub fn name_node(&self) -> Option<&Node> {
        self.node.get("name")
    }

    pub fn fmt_node(&self) -> Option<&Node> {
        self.node.get("fmt")
    }
}

#[derive(Debug, Clone)]
pub struct SignalGroupView<'a> {
    pub group: SignalGroup,
    pub node: &'a Node,
}

#[derive(Debug, Clone)]
pub struct CommandView<'a> {
    pub command: Command,
    pub node: &'a Node,
    pub index: usize,
    pub signals: Vec<SignalView<'a>>,
}

/// A unit the model could not decode; analysis of it is skipped.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Malformed {
    pub span: Span,
    pub message: String,
}

/// Parsed document: the raw text plus its syntax tree.
#[derive(Debug, Clone)]
pub struct Document {
    text: String,
    root: Node,
}

impl Document {
    pub fn parse(text: impl Into<String>) -> Result<Self> {
        let text = text.into();
        let root = parse_tree(&text)?;
        Ok(Self { text, root })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    /// Project the typed model. Undecodable commands and signals are
    /// collected in [`SignalSet::malformed`] instead of failing the pass.
    pub fn model(&self) -> SignalSet<'_> {
        let mut set = SignalSet {
            root: &self.root,
            commands_node: self.root.get("commands"),
            commands: Vec::new(),
            groups: Vec::new(),
            malformed: Vec::new(),
        };

        if let Some(commands) = set.commands_node {
            for (index, node) in commands.items().iter().enumerate() {
                match decode_command(node) {
                    Ok(command) => {
                        let signals = decode_signals(node, index, &mut set.malformed);
                        set.commands.push(CommandView {
                            command,
                            node,
                            index,
                            signals,
                        });
                    }
                    Err(message) => set.malformed.push(Malformed {
                        span: node.span(),
                        message,
                    }),
                }
            }
        }

        if let Some(groups) = self.root.get("signalGroups") {
            for node in groups.items() {
                match decode::<SignalGroup>(node) {
                    Ok(group) => set.groups.push(SignalGroupView { group, node }),
                    Err(err) => set.malformed.push(Malformed {
                        span: node.span(),
                        message: format!("invalid signal group: {err}"),
                    }),
                }
            }
        }

        set
    }
}

/// Typed projection of one [`Document`].
#[derive(Debug, Clone)]
pub struct SignalSet<'a> {
    pub root: &'a Node,
    pub commands_node: Option<&'a Node>,
    pub commands: Vec<CommandView<'a>>,
    pub groups: Vec<SignalGroupView<'a>>,
    pub malformed: Vec<Malformed>,
}

impl<'a> SignalSet<'a> {
    pub fn signals(&self) -> impl Iterator<Item = &SignalView<'a>> {
        self.commands.iter().flat_map(|c| c.signals.iter())
    }
}

fn decode<T: DeserializeOwned>(node: &Node) -> std::result::Result<T, serde_json::Error> {
    serde_json::from_value(node.to_value())
}

fn decode_command(node: &Node) -> std::result::Result<Command, String> {
    if node.kind != NodeKind::Object {
        return Err("command must be an object".to_string());
    }
    let fields: CommandFields =
        decode(node).map_err(|err| format!("invalid command: {err}"))?;
    let hdr = fields
        .hdr
        .ok_or_else(|| "command is missing required 'hdr'".to_string())?;
    let cmd = node
        .get("cmd")
        .and_then(CommandPayload::from_node)
        .ok_or_else(|| "command is missing required 'cmd'".to_string())?;
    Ok(Command {
        hdr,
        cmd,
        rax: fields.rax,
        dbg: fields.dbg,
        dbgfilter: fields.dbgfilter,
    })
}

fn decode_signals<'a>(
    command: &'a Node,
    command_index: usize,
    malformed: &mut Vec<Malformed>,
) -> Vec<SignalView<'a>> {
    let Some(signals) = command.get("signals") else {
        return Vec::new();
    };
    signals
        .items()
        .iter()
        .filter_map(|node| match decode::<Signal>(node) {
            Ok(signal) => Some(SignalView {
                signal,
                node,
                command_index,
            }),
            Err(err) => {
                malformed.push(Malformed {
                    span: node.span(),
                    message: format!("invalid signal: {err}"),
                });
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"{
  "commands": [
    { "hdr": "7E0", "rax": "7E8", "cmd": {"22": "1100"}, "freq": 1,
      "signals": [
        { "id": "ENG_RPM", "path": "Engine", "name": "Engine speed",
          "fmt": { "len": 16, "div": 4, "unit": "rpm" } }
      ] },
    { "cmd": "0100", "signals": [] },
    { "hdr": "7E4", "cmd": "0902", "signals": [ { "id": "NO_FMT" } ] }
  ],
  "signalGroups": [ { "id": "TP_GROUP", "matchingRegex": "TP_.*" } ]
}"#;

    #[test]
    fn test_defaults_applied_to_bit_format() {
        let doc = Document::parse(DOC).unwrap();
        let model = doc.model();
        let fmt = &model.commands[0].signals[0].signal.fmt;
        assert_eq!(fmt.bix, 0);
        assert_eq!(fmt.len, 16);
        assert!(!fmt.sign);
        assert_eq!(fmt.mul, 1.0);
        assert_eq!(fmt.div, 4.0);
        assert_eq!(fmt.add, 0.0);
        assert_eq!(fmt.bit_range(), Some((0, 15)));
    }

    #[test]
    fn test_malformed_units_are_skipped_not_fatal() {
        let doc = Document::parse(DOC).unwrap();
        let model = doc.model();
        // second command has no hdr, third command's signal has no fmt
        assert_eq!(model.commands.len(), 2);
        assert_eq!(model.malformed.len(), 2);
        assert!(model.malformed[0].message.contains("hdr"));
        assert!(model.commands[1].signals.is_empty());
        assert_eq!(model.groups.len(), 1);
        assert_eq!(model.groups[0].group.matching_regex, "TP_.*");
    }

    #[test]
    fn test_command_payload_forms() {
        let doc = Document::parse(DOC).unwrap();
        let model = doc.model();
        assert_eq!(model.commands[0].command.cmd.flatten(), "221100");
        assert_eq!(model.commands[1].command.cmd.flatten(), "0902");
        assert_eq!(model.commands[0].command.rax.as_deref(), Some("7E8"));
    }

    #[test]
    fn test_views_keep_source_nodes() {
        let doc = Document::parse(DOC).unwrap();
        let model = doc.model();
        let sig = &model.commands[0].signals[0];
        assert_eq!(sig.id_node().unwrap().text(doc.text()), "\"ENG_RPM\"");
        assert!(sig.node.text(doc.text()).starts_with("{ \"id\""));
    }

    #[test]
    fn test_filter_exclusion() {
        let filter = Filter {
            to: Some(2018),
            years: Some(vec![2020]),
            from: Some(2022),
        };
        assert!(filter.excludes(2017));
        assert!(filter.excludes(2018));
        assert!(!filter.excludes(2019));
        assert!(filter.excludes(2020));
        assert!(!filter.excludes(2021));
        assert!(filter.excludes(2022));
        assert!(Filter::default().is_empty());
    }
}
