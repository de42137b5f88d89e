//! Gate configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use factgate_core::Identity;

use crate::error::{GateError, Result};

/// What happens to a fact that could not be signed because of a hash
/// mismatch or a failed self-verification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnsignedFactPolicy {
    /// Store the fact with no signatures.
    #[default]
    Persist,
    /// Leave the fact out of the batch.
    Reject,
}

/// Configuration for a [`FactGate`](crate::FactGate).
///
/// Every field has a default, so hosts only spell out what they change:
///
/// ```
/// use factgate::GateConfig;
///
/// let config = GateConfig::from_json(r#"{ "httpTimeoutSeconds": 10 }"#).unwrap();
/// assert_eq!(config.http_timeout_seconds, 10);
/// assert!(config.keystore_path.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GateConfig {
    /// SQLite file for the key table. In-memory when absent.
    pub keystore_path: Option<PathBuf>,
    /// Timeout for requests to the upstream peer.
    pub http_timeout_seconds: u64,
    /// Policy for facts that fail their signing checks.
    pub unsigned_fact_policy: UnsignedFactPolicy,
    /// Identity of this server's own device fact.
    pub device_identity: Identity,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            keystore_path: None,
            http_timeout_seconds: 5,
            unsigned_fact_policy: UnsignedFactPolicy::default(),
            device_identity: Identity::local_device(),
        }
    }
}

impl GateConfig {
    /// Parse a configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| GateError::Config(e.to_string()))
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_seconds)
    }
}
