//! Per-model-year test fixtures.
//!
//! Layout under the test-case root:
//!
//! ```text
//! <root>/<year>/commands/<command-id>.yaml     per-command fixture
//! <root>/<year>/command_support.yaml           year-level support manifest
//! ```
//!
//! A year supports a command when a fixture file carries its identifier or
//! the manifest lists it under `supported_commands_by_ecu`. It rejects the
//! command when `unsupported_commands_by_ecu` lists it. Missing directories
//! and manifests are "no information"; a malformed manifest skips that year.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::document::{CommandId, matches_command};
use crate::error::SignalSetError;

pub const MANIFEST_FILE: &str = "command_support.yaml";
pub const COMMANDS_DIR: &str = "commands";

const FIXTURE_EXTENSIONS: &[&str] = &["yaml", "yml", "json"];

// ECU keys such as `7E0` or `720` would otherwise load as numbers.
static BARE_ECU_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^(\s+)([0-9A-Fa-f]+)\s*:").expect("valid regex"));

/// Years that support and reject one command.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CommandSupport {
    pub supported: BTreeSet<i32>,
    pub unsupported: BTreeSet<i32>,
}

impl CommandSupport {
    pub fn is_empty(&self) -> bool {
        self.supported.is_empty() && self.unsupported.is_empty()
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawManifest {
    #[serde(default)]
    supported_commands_by_ecu: BTreeMap<String, Option<Vec<String>>>,
    #[serde(default)]
    unsupported_commands_by_ecu: BTreeMap<String, Option<Vec<String>>>,
}

/// Year-level support manifest, flattened to command identifiers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SupportManifest {
    /// `{ecu}.{payload}` identifiers (signal lists kept, stripped on match).
    pub supported: Vec<String>,
    pub unsupported: Vec<String>,
}

impl SupportManifest {
    pub fn from_yaml_str(content: &str) -> Result<Self, serde_yaml::Error> {
        let quoted = BARE_ECU_KEY.replace_all(content, "${1}\"${2}\":");
        let raw: RawManifest = serde_yaml::from_str(&quoted)?;

        let supported = raw
            .supported_commands_by_ecu
            .iter()
            .flat_map(|(ecu, entries)| {
                entries
                    .iter()
                    .flatten()
                    .map(move |entry| format!("{ecu}.{}", entry.trim()))
            })
            .collect();
        let unsupported = raw
            .unsupported_commands_by_ecu
            .into_values()
            .flatten()
            .flatten()
            .map(|entry| entry.trim().to_string())
            .collect();

        Ok(Self {
            supported,
            unsupported,
        })
    }

    pub fn load(path: &Path) -> Result<Option<Self>, SignalSetError> {
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path).map_err(|source| SignalSetError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&content)
            .map(Some)
            .map_err(|source| SignalSetError::Yaml {
                path: path.to_path_buf(),
                source,
            })
    }
}

/// Fixture data for one model year.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct YearFixtures {
    pub year: i32,
    /// File stems under `commands/`.
    pub command_files: Vec<String>,
    pub manifest: Option<SupportManifest>,
}

impl YearFixtures {
    fn load(year: i32, dir: &Path) -> Result<Self, SignalSetError> {
        let manifest = SupportManifest::load(&dir.join(MANIFEST_FILE))?;
        let command_files = list_command_files(&dir.join(COMMANDS_DIR));
        Ok(Self {
            year,
            command_files,
            manifest,
        })
    }

    pub fn supports(&self, id: &CommandId) -> bool {
        if self
            .command_files
            .iter()
            .any(|stem| matches_command(id, stem))
        {
            return true;
        }
        self.manifest
            .as_ref()
            .is_some_and(|m| m.supported.iter().any(|entry| matches_command(id, entry)))
    }

    pub fn rejects(&self, id: &CommandId) -> bool {
        self.manifest
            .as_ref()
            .is_some_and(|m| m.unsupported.iter().any(|entry| matches_command(id, entry)))
    }
}

fn list_command_files(dir: &Path) -> Vec<String> {
    if !dir.is_dir() {
        return Vec::new();
    }
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| {
            let path = entry.path();
            let ext = path.extension()?.to_str()?.to_ascii_lowercase();
            if !FIXTURE_EXTENSIONS.contains(&ext.as_str()) {
                return None;
            }
            path.file_stem()?.to_str().map(str::to_string)
        })
        .collect()
}

fn parse_year(name: &str) -> Option<i32> {
    if name.len() != 4 {
        return None;
    }
    name.parse().ok().filter(|year| (1900..=2100).contains(year))
}

/// Every model year found under a test-case root.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestCaseIndex {
    root: PathBuf,
    years: Vec<YearFixtures>,
}

impl TestCaseIndex {
    /// Scan `root`. Never fails: unreadable years are logged and skipped.
    pub fn load(root: &Path) -> Self {
        let mut years = Vec::new();
        if !root.is_dir() {
            tracing::debug!(root = %root.display(), "no test case directory");
            return Self {
                root: root.to_path_buf(),
                years,
            };
        }

        let year_dirs = WalkDir::new(root)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_dir());

        for entry in year_dirs {
            let Some(year) = entry.file_name().to_str().and_then(parse_year) else {
                continue;
            };
            match YearFixtures::load(year, entry.path()) {
                Ok(fixtures) => {
                    tracing::debug!(
                        year,
                        commands = fixtures.command_files.len(),
                        manifest = fixtures.manifest.is_some(),
                        "loaded year fixtures"
                    );
                    years.push(fixtures);
                }
                Err(e) => tracing::warn!(year, "skipping year: {e}"),
            }
        }

        Self {
            root: root.to_path_buf(),
            years,
        }
    }

    pub fn from_years(years: Vec<YearFixtures>) -> Self {
        Self {
            root: PathBuf::new(),
            years,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn is_empty(&self) -> bool {
        self.years.is_empty()
    }

    pub fn years(&self) -> impl Iterator<Item = i32> + '_ {
        self.years.iter().map(|y| y.year)
    }

    /// Supported and unsupported years for one command.
    pub fn support_for(&self, id: &CommandId) -> CommandSupport {
        let mut support = CommandSupport::default();
        for fixtures in &self.years {
            if fixtures.supports(id) {
                support.supported.insert(fixtures.year);
            } else if fixtures.rejects(id) {
                support.unsupported.insert(fixtures.year);
            }
        }
        support
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Command, CommandPayload};
    use tempfile::TempDir;

    fn id(hdr: &str, rax: Option<&str>, cmd: &str) -> CommandId {
        Command {
            hdr: hdr.to_string(),
            cmd: CommandPayload::Text(cmd.to_string()),
            rax: rax.map(str::to_string),
            dbg: false,
            dbgfilter: None,
        }
        .identifier()
    }

    fn write(path: &Path, content: &str) {
        std::fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        std::fs::write(path, content).expect("write");
    }

    #[test]
    fn test_manifest_keeps_hex_keys_as_strings() {
        let manifest = SupportManifest::from_yaml_str(
            r#"
supported_commands_by_ecu:
  7E0:
    - "221100:ENG_RPM,ENG_LOAD"
  720: ["22F190"]
unsupported_commands_by_ecu:
  7E4:
    - "7E4.222000"
"#,
        )
        .unwrap();
        assert!(manifest.supported.contains(&"7E0.221100:ENG_RPM,ENG_LOAD".to_string()));
        assert!(manifest.supported.contains(&"720.22F190".to_string()));
        assert_eq!(manifest.unsupported, vec!["7E4.222000".to_string()]);
    }

    #[test]
    fn test_manifest_tolerates_empty_sections() {
        let manifest = SupportManifest::from_yaml_str("supported_commands_by_ecu:\n  7E0:\n").unwrap();
        assert!(manifest.supported.is_empty());
        assert!(manifest.unsupported.is_empty());
    }

    #[test]
    fn test_index_collects_supported_and_unsupported_years() {
        let temp = TempDir::new().expect("temp dir");
        let root = temp.path();
        write(&root.join("2019/commands/7E0.221100.yaml"), "tests: []\n");
        write(
            &root.join("2020").join(MANIFEST_FILE),
            "unsupported_commands_by_ecu:\n  7E0:\n    - 7E0.221100\n",
        );
        write(
            &root.join("2021").join(MANIFEST_FILE),
            "supported_commands_by_ecu:\n  7E0:\n    - \"221100:ENG_RPM\"\n",
        );
        // malformed manifest: year skipped, scan continues
        write(&root.join("2022").join(MANIFEST_FILE), "supported_commands_by_ecu: [\n");
        write(&root.join("notayear/commands/7E0.221100.yaml"), "");

        let index = TestCaseIndex::load(root);
        assert_eq!(index.years().collect::<Vec<_>>(), vec![2019, 2020, 2021]);

        let support = index.support_for(&id("7E0", Some("7E8"), "221100"));
        assert_eq!(support.supported, [2019, 2021].into_iter().collect());
        assert_eq!(support.unsupported, [2020].into_iter().collect());

        let other = index.support_for(&id("7E0", None, "221101"));
        assert!(other.is_empty());
    }

    #[test]
    fn test_missing_root_is_no_information() {
        let temp = TempDir::new().expect("temp dir");
        let index = TestCaseIndex::load(&temp.path().join("missing"));
        assert!(index.is_empty());
        assert!(index.support_for(&id("7E0", None, "0100")).is_empty());
    }
}
