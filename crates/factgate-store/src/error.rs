//! Error types for the store module.

use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// More than one key row exists for an identity.
    #[error("duplicate entries found in the keystore for {provider}:{user_id}")]
    DuplicateKey { provider: String, user_id: String },

    /// An upstream peer failed to serve a forwarded request.
    #[error("upstream error: {0}")]
    Upstream(String),

    /// A lock guarding in-memory state was poisoned by a panic.
    #[error("store lock poisoned")]
    Poisoned,

    /// A blocking task could not be joined.
    #[error("blocking task failed: {0}")]
    TaskFailed(String),

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
