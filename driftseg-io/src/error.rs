//! Errors raised while reading and writing driftseg files.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for file operations.
pub type Result<T> = std::result::Result<T, Error>;

/// File errors.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization failure not tied to a line of an input file.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A line of a JSON-lines file that does not decode as a record.
    #[error("{}:{line}: {source}", path.display())]
    InvalidRecord {
        path: PathBuf,
        line: usize,
        source: serde_json::Error,
    },

    /// Hits that do not fit their super-layer, or an invalid configuration.
    #[error(transparent)]
    Core(#[from] driftseg_core::Error),
}
