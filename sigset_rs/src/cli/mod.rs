//! `sigset` command-line interface.
//!
//! ```text
//! sigset lint <file> [--json | --sarif] [--fix]
//! sigset filters <file> [--test-cases DIR] [--generations FILE] [--generation NAME] [--commit]
//! sigset ids <file>
//! sigset rules
//! ```
//!
//! Exit codes: 0 success, 1 unreadable or malformed input, 2 when `lint`
//! leaves error-severity findings.

pub mod args;
pub mod commands;
pub mod entrypoint;

pub use args::{Cli, Command};
pub use entrypoint::run;
