//! Error types for the storage layer.

use std::path::PathBuf;

use thiserror::Error;

/// A result type using `StoreError`.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading or writing the backing file failed.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// The file being accessed.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The backend refused the write.
    #[error("write rejected: {0}")]
    WriteRejected(String),
}

impl StoreError {
    /// Returns true if the stored bytes exist but do not decode.
    #[must_use]
    pub const fn is_corrupt(&self) -> bool {
        matches!(self, Self::Serialization(_))
    }
}
