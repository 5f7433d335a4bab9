//! Error types for the server client.

use thiserror::Error;

use crate::protocol::ErrorResponse;

/// Errors returned by `TasklyClient` methods.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(serde_json::Error),

    #[error("server disconnected")]
    Disconnected,

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("server error: {}: {}", .0.error, .0.message)]
    Server(ErrorResponse),
}

impl ClientError {
    /// True when the server reported that the record does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::Server(e) if e.error == crate::protocol::NOT_FOUND)
    }

    /// True when the record is missing or stored in an unreadable shape.
    pub fn is_item_unavailable(&self) -> bool {
        matches!(
            self,
            ClientError::Server(e)
                if e.error == crate::protocol::NOT_FOUND
                    || e.error == crate::protocol::ITEM_UNAVAILABLE
        )
    }
}
