//! Error types for the signing pipeline and sessions.

use factgate_auth::AuthError;
use factgate_core::{CoreError, Identity};
use factgate_store::StoreError;
use factgate_sync::SyncError;
use thiserror::Error;

/// Errors that can occur during gate operations.
#[derive(Debug, Error)]
pub enum GateError {
    /// More than one key row exists for an identity. The key table is
    /// corrupt; never retried.
    #[error("duplicate entries found in the keystore for {provider}:{user_id}")]
    DuplicateKey { provider: String, user_id: String },

    /// Signing was requested for an identity that was never issued a key.
    #[error("no key has been issued for {0}")]
    KeystoreNotFound(Identity),

    /// A logged-in operation named an identity with no user fact.
    #[error("unknown identity {0}")]
    UnknownIdentity(Identity),

    /// The composition has no logged-in user.
    #[error("no logged in user")]
    NotLoggedIn,

    /// The composition does not provide this operation.
    #[error("{0} is not implemented")]
    NotImplemented(&'static str),

    /// The forwarding composition has no local persistence.
    #[error("local device has no persistence")]
    LocalUnavailable,

    /// Forwarding was requested but no upstream is configured.
    #[error("no upstream peer is configured")]
    NoUpstream,

    /// Configuration could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Storage error.
    #[error("storage error: {0}")]
    Store(StoreError),

    /// Core error (key encoding, canonicalization).
    #[error("core error: {0}")]
    Core(#[from] CoreError),

    /// The rule evaluator failed.
    #[error("authorization error: {0}")]
    Authorization(#[from] AuthError),

    /// The upstream peer failed.
    #[error("remote error: {0}")]
    Remote(#[from] SyncError),
}

impl From<StoreError> for GateError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::DuplicateKey { provider, user_id } => {
                GateError::DuplicateKey { provider, user_id }
            }
            other => GateError::Store(other),
        }
    }
}

/// Result type for gate operations.
pub type Result<T> = std::result::Result<T, GateError>;
