//! Error types for the authorization module.

use thiserror::Error;

/// Errors that can occur while authorizing facts.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The rule evaluator failed; the whole batch is rejected.
    #[error("authorization evaluator failed: {0}")]
    Evaluator(String),
}

/// Result type for authorization operations.
pub type Result<T> = std::result::Result<T, AuthError>;
