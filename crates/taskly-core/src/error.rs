//! Error types for all taskly operations.

use std::io;
use thiserror::Error;

use crate::types::Field;

/// Top-level error type for taskly operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("record not found: {0}")]
    NotFound(String),

    #[error("malformed record: attribute '{field}' {reason}")]
    MalformedRecord { field: Field, reason: String },

    #[error("invalid input: {0}")]
    Validation(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl Error {
    /// True for failures that should surface as "item not available" rather
    /// than a generic failure: the record is missing or unreadable.
    pub fn is_item_unavailable(&self) -> bool {
        matches!(self, Error::NotFound(_) | Error::MalformedRecord { .. })
    }

    pub(crate) fn missing(field: Field) -> Self {
        Error::MalformedRecord {
            field,
            reason: "is missing".to_string(),
        }
    }

    pub(crate) fn malformed(field: Field, reason: impl Into<String>) -> Self {
        Error::MalformedRecord {
            field,
            reason: reason.into(),
        }
    }
}

/// Failures raised by an item store adapter.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
