//! Shared `main()` body: parse, install logging, dispatch, map errors.

use clap::Parser;
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use super::args::{Cli, Command};
use super::commands;

pub const EXIT_FAILURE: i32 = 1;

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    // a second init (tests driving `run` twice) is harmless
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Run the CLI and return the process exit code.
pub fn run() -> i32 {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    let outcome = match &cli.command {
        Command::Lint(args) => commands::lint(args),
        Command::Filters(args) => commands::filters(args),
        Command::Ids(args) => commands::ids(args),
        Command::Rules(args) => commands::rules(args),
    };

    match outcome {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{} {err:#}", "error:".red().bold());
            EXIT_FAILURE
        }
    }
}
