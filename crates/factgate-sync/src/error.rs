//! Error types for the sync module.

use std::time::Duration;

use thiserror::Error;

use crate::messages::ErrorCode;

/// Errors that can occur while talking to an upstream peer.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A frame could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(String),

    /// Transport-level error.
    #[error("transport error: {0}")]
    TransportError(String),

    /// The peer did not answer in time.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// Peer answered with an error.
    #[error("peer error ({code:?}): {message}")]
    PeerError { code: ErrorCode, message: String },

    /// Peer answered with the wrong kind of response.
    #[error("unexpected response: expected {expected}, got {actual}")]
    UnexpectedResponse {
        expected: &'static str,
        actual: &'static str,
    },

    /// Local store operation failed.
    #[error("store error: {0}")]
    StoreError(#[from] factgate_store::StoreError),
}

impl From<SyncError> for factgate_store::StoreError {
    fn from(e: SyncError) -> Self {
        match e {
            SyncError::StoreError(inner) => inner,
            other => factgate_store::StoreError::Upstream(other.to_string()),
        }
    }
}

/// Result type for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;
