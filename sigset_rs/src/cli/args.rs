//! Command-line arguments.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Static analysis and model-year coverage for OBD-II signal set documents.
#[derive(Parser, Debug)]
#[command(name = "sigset", author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
    /// Log level (trace|debug|info|warn|error). `RUST_LOG` takes precedence.
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run every enabled rule over a signal set document.
    Lint(LintArgs),
    /// Compute or tighten the debug filter of each command from test fixtures.
    Filters(FilterArgs),
    /// Print the canonical identifier of every command.
    Ids(IdsArgs),
    /// List the built-in rules and their effective configuration.
    Rules(RulesArgs),
}

/// Where project config and model-year data are looked up.
#[derive(Args, Debug, Clone, Default)]
pub struct ProjectArgs {
    /// Project root holding `.sigset/config.toml` (default: current directory).
    #[arg(long)]
    pub root: Option<PathBuf>,
    /// Model-year test case directory (overrides config).
    #[arg(long)]
    pub test_cases: Option<PathBuf>,
    /// Generation definitions YAML (overrides config).
    #[arg(long)]
    pub generations: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct LintArgs {
    /// Signal set JSON document.
    pub file: PathBuf,
    /// Emit a JSON report.
    #[arg(long, conflicts_with = "sarif")]
    pub json: bool,
    /// Emit SARIF 2.1.0.
    #[arg(long)]
    pub sarif: bool,
    /// Apply every non-conflicting suggested fix and rewrite the file.
    #[arg(long)]
    pub fix: bool,
    #[command(flatten)]
    pub project: ProjectArgs,
}

#[derive(Args, Debug)]
pub struct FilterArgs {
    /// Signal set JSON document.
    pub file: PathBuf,
    /// Bound filters by this generation instead of the detected one.
    #[arg(long)]
    pub generation: Option<String>,
    /// Write the changed filters back to the file.
    #[arg(long)]
    pub commit: bool,
    /// Emit the per-command plans as JSON.
    #[arg(long)]
    pub json: bool,
    #[command(flatten)]
    pub project: ProjectArgs,
}

#[derive(Args, Debug)]
pub struct IdsArgs {
    /// Signal set JSON document.
    pub file: PathBuf,
}

#[derive(Args, Debug)]
pub struct RulesArgs {
    /// Project root holding `.sigset/config.toml` (default: current directory).
    #[arg(long)]
    pub root: Option<PathBuf>,
    /// Emit JSON.
    #[arg(long)]
    pub json: bool,
}
