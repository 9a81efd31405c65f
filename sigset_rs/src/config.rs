//! Configuration file support for sigset.
//!
//! Loads optional `.sigset/config.toml` from the project root.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::rules::Severity;

pub const CONFIG_DIR: &str = ".sigset";
pub const CONFIG_FILE: &str = "config.toml";

/// Root configuration structure
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct SigsetConfig {
    /// Per-rule overrides keyed by rule id.
    pub rules: BTreeMap<String, RuleOverride>,
    pub coverage: CoverageConfig,
}

/// Knobs a project may override for one rule.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RuleOverride {
    pub enabled: Option<bool>,
    pub severity: Option<Severity>,
}

/// Where the model-year data lives, relative to the project root.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CoverageConfig {
    pub test_cases: PathBuf,
    pub generations: PathBuf,
}

impl Default for CoverageConfig {
    fn default() -> Self {
        Self {
            test_cases: PathBuf::from("tests/test_cases"),
            generations: PathBuf::from("generations.yaml"),
        }
    }
}

impl SigsetConfig {
    /// Load config from `.sigset/config.toml` in the given root directory.
    /// Returns default config if file doesn't exist or is invalid.
    pub fn load(root: &Path) -> Self {
        Self::load_from_path(&root.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    /// Load config from a specific path.
    pub fn load_from_path(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {}", path.display(), e);
                    Self::default()
                }
            },
            Err(e) => {
                tracing::warn!("Failed to read {}: {}", path.display(), e);
                Self::default()
            }
        }
    }
}

impl CoverageConfig {
    pub fn test_cases_under(&self, root: &Path) -> PathBuf {
        root.join(&self.test_cases)
    }

    pub fn generations_under(&self, root: &Path) -> PathBuf {
        root.join(&self.generations)
    }
}
