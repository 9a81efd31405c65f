//! Error types for document loading and auxiliary data.
//!
//! Only unparsable document text is a hard stop. Everything else in the
//! analysis path degrades to fewer findings and is logged instead.

use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by the library.
#[derive(Debug, Error)]
pub enum SignalSetError {
    /// The document text is not valid JSON.
    #[error("malformed JSON at byte {offset}: {message}")]
    Parse { offset: usize, message: String },

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse YAML in {}: {source}", path.display())]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

impl SignalSetError {
    pub(crate) fn parse(offset: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            offset,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SignalSetError>;
