//! Centralized error types for mboxgrams.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that end a run.
///
/// Everything that can go wrong with a *single* message (missing plaintext,
/// undecodable charset, unknown offsets) is absorbed by the walker and never
/// shows up here.
#[derive(Error, Debug)]
pub enum GramsError {
    /// I/O error with the associated file path.
    #[error("I/O error reading '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The specified mailbox store does not exist.
    #[error("Mailbox file not found: {0}")]
    FileNotFound(PathBuf),

    /// The file does not appear to be a valid MBOX.
    #[error("File does not appear to be a valid MBOX: {0}")]
    InvalidMbox(PathBuf),

    /// Writing a frequency table failed.
    #[error("Could not write '{path}': {source}")]
    Output {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias for `Result<T, GramsError>`.
pub type Result<T> = std::result::Result<T, GramsError>;

impl GramsError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create an `Output` variant from a path and an `io::Error`.
    pub fn output(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Output {
            path: path.into(),
            source,
        }
    }

    /// Whether this error came from opening a mailbox store.
    pub fn is_store_open_error(&self) -> bool {
        matches!(
            self,
            Self::Io { .. } | Self::FileNotFound(_) | Self::InvalidMbox(_)
        )
    }
}

/// Failure to turn body bytes into text with a given charset.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CharsetError {
    /// The label is not a charset we know how to decode.
    #[error("Unknown charset '{0}'")]
    UnknownCharset(String),

    /// The bytes are not valid in the named charset.
    #[error("Bytes are not valid {charset}")]
    Malformed { charset: String },

    /// Every declared and fallback charset failed.
    #[error("No candidate charset could decode the body (tried: {})", .attempted.join(", "))]
    Exhausted { attempted: Vec<String> },
}
