//! Centralized error types for grouparc.

use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the grouparc library.
#[derive(Error, Debug)]
pub enum ArchiveError {
    /// I/O error with the associated file path.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The specified file does not exist.
    #[error("Archive file not found: {0}")]
    FileNotFound(PathBuf),

    /// The corpus file is missing or malformed beyond line-level recovery.
    #[error("Corrupt or missing corpus at '{path}': {reason}")]
    InvalidCorpus { path: PathBuf, reason: String },

    /// A site emission step failed.
    #[error("Render error: {0}")]
    RenderError(String),
}

/// Convenience alias for `Result<T, ArchiveError>`.
pub type Result<T> = std::result::Result<T, ArchiveError>;

impl ArchiveError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Allow `?` on `std::io::Error` inside functions returning `ArchiveError`
/// when no path context is available (rare — prefer `ArchiveError::io`).
impl From<std::io::Error> for ArchiveError {
    fn from(source: std::io::Error) -> Self {
        Self::Io {
            path: PathBuf::from("<unknown>"),
            source,
        }
    }
}
