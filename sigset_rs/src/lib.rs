//! # sigset
//!
//! Static analysis and model-year coverage for OBD-II signal set documents.
//!
//! A signal set is a JSON document listing diagnostic commands (header,
//! service payload, optional response address) and the bit-packed signals
//! decoded from each response. This crate:
//!
//! - parses the document into a span-preserving tree and a typed model
//!   ([`document`]);
//! - runs a fixed registry of structural and semantic lint rules over it,
//!   each finding optionally carrying byte-range text edits ([`rules`]);
//! - maps commands to the model years their test fixtures cover and derives
//!   bounded debug filters from that coverage ([`coverage`]).
//!
//! ```no_run
//! use sigset::rules::RuleRegistry;
//!
//! let text = std::fs::read_to_string("signalset.json").unwrap();
//! let registry = RuleRegistry::default();
//! for finding in registry.lint(&text, None).unwrap() {
//!     println!("{}: {}", finding.rule_id, finding.message);
//! }
//! ```

pub mod cache;
pub mod cli;
pub mod config;
pub mod coverage;
pub mod document;
pub mod error;
pub mod output;
pub mod rules;
pub mod sarif;

pub use config::SigsetConfig;
pub use coverage::CoverageEngine;
pub use document::Document;
pub use error::{Result, SignalSetError};
pub use rules::{LintResult, RuleRegistry, Severity};
