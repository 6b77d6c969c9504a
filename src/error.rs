//! Centralized error types for mailstash.

use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the mailstash library.
#[derive(Error, Debug)]
pub enum StoreError {
    /// I/O error with the associated file path.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The mailbox has no index file (it holds no messages).
    #[error("No index at {0}")]
    IndexNotFound(PathBuf),

    /// The object file for a message does not exist.
    #[error("Message object not found: {0}")]
    ObjectNotFound(PathBuf),

    /// The mailbox index has no entry with this id.
    #[error("Message '{id}' not found")]
    MessageNotFound { id: String },

    /// The index lists a message whose object file is gone.
    ///
    /// Not part of the not-found family: it signals index/object divergence.
    #[error("Index lists message '{id}' but its object is missing: {path}")]
    ObjectMissing { id: String, path: PathBuf },

    /// The id does not have the shape of a minted id.
    #[error("Invalid message id '{id}'")]
    InvalidId { id: String },

    /// An object file for this id already exists.
    #[error("Message object already exists: {0}")]
    AlreadyExists(PathBuf),

    /// The index file exists but cannot be decoded.
    #[error("Corrupt index '{path}': {reason}")]
    Corrupt { path: PathBuf, reason: String },
}

/// Convenience alias for `Result<T, StoreError>`.
pub type Result<T> = std::result::Result<T, StoreError>;

impl StoreError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a `Corrupt` variant.
    pub fn corrupt(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Corrupt {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// True for `IndexNotFound`, `ObjectNotFound` and `MessageNotFound`.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::IndexNotFound(_) | Self::ObjectNotFound(_) | Self::MessageNotFound { .. }
        )
    }
}
