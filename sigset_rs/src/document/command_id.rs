//! Canonical Command Identifiers: `hdr.[rax.]cmd`.
//!
//! The identifier is the join key between a document's commands and the
//! per-model-year test fixtures, so every comparison goes through
//! [`normalize_id`] first.

use std::fmt;

use super::model::Command;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommandId(String);

impl CommandId {
    pub fn for_command(command: &Command) -> Self {
        let cmd = command.cmd.flatten();
        match command.rax.as_deref().filter(|rax| !rax.is_empty()) {
            Some(rax) => Self(format!("{}.{}.{}", command.hdr, rax, cmd)),
            None => Self(format!("{}.{}", command.hdr, cmd)),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Every form this identifier may appear under in fixtures: the
    /// normalized identifier, plus the two-segment `hdr.cmd` form when a
    /// response address is present.
    pub fn match_forms(&self) -> Vec<String> {
        let normalized = normalize_id(&self.0);
        let mut forms = vec![normalized.clone()];
        if let Some(short) = two_segment_form(&normalized) {
            forms.push(short);
        }
        forms
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Command {
    pub fn identifier(&self) -> CommandId {
        CommandId::for_command(self)
    }
}

/// Strip a trailing `:signal,...` list or `|property` suffix and surrounding
/// whitespace.
pub fn normalize_id(raw: &str) -> String {
    let end = raw.find([':', '|']).unwrap_or(raw.len());
    raw[..end].trim().to_string()
}

/// `hdr.rax.cmd` to `hdr.cmd`; `None` for identifiers without a rax segment.
pub fn two_segment_form(id: &str) -> Option<String> {
    let parts: Vec<&str> = id.split('.').collect();
    match parts.as_slice() {
        [hdr, _rax, cmd] => Some(format!("{hdr}.{cmd}")),
        _ => None,
    }
}

/// Whether a fixture identifier refers to the command.
pub fn matches_command(id: &CommandId, fixture_id: &str) -> bool {
    let candidate = normalize_id(fixture_id);
    if candidate.is_empty() {
        return false;
    }
    let forms = id.match_forms();
    if forms.iter().any(|form| *form == candidate) {
        return true;
    }
    two_segment_form(&candidate).is_some_and(|short| forms.contains(&short))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::model::CommandPayload;

    fn command(rax: Option<&str>) -> Command {
        Command {
            hdr: "7E0".to_string(),
            cmd: CommandPayload::Params(vec![("22".to_string(), "1100".to_string())]),
            rax: rax.map(str::to_string),
            dbg: false,
            dbgfilter: None,
        }
    }

    #[test]
    fn test_identifier_without_rax() {
        assert_eq!(command(None).identifier().as_str(), "7E0.221100");
    }

    #[test]
    fn test_identifier_with_rax() {
        assert_eq!(command(Some("7E8")).identifier().as_str(), "7E0.7E8.221100");
    }

    #[test]
    fn test_normalize_strips_suffixes() {
        assert_eq!(normalize_id("7E0.221100:ENG_RPM,ENG_LOAD"), "7E0.221100");
        assert_eq!(normalize_id("7E0.221100|freq"), "7E0.221100");
        assert_eq!(normalize_id(" 7E0.221100 "), "7E0.221100");
    }

    #[test]
    fn test_three_segment_id_matches_two_segment_fixture() {
        let id = command(Some("7E8")).identifier();
        assert!(matches_command(&id, "7E0.221100"));
        assert!(matches_command(&id, "7E0.7E8.221100:SIG"));
        assert!(!matches_command(&id, "7E0.221101"));

        let short = command(None).identifier();
        assert!(matches_command(&short, "7E0.7E8.221100"));
        assert!(!matches_command(&short, ""));
    }
}
