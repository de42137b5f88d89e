//! Identities and login results.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::fact::Fact;

/// An external principal: an OAuth provider plus subject id, or a fixed
/// sentinel for the local device.
///
/// Identities are not secrets. Two identities are the same principal exactly
/// when both fields are equal.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Identity {
    pub provider: String,
    pub id: String,
}

impl Identity {
    /// Create an identity from its provider and subject id.
    pub fn new(provider: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            id: id.into(),
        }
    }

    /// The identity every server uses for its own device fact.
    pub fn local_device() -> Self {
        Self::new("jinaga", "local")
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identity({}:{})", self.provider, self.id)
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.provider, self.id)
    }
}

/// Display profile returned alongside a user fact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub display_name: String,
}

/// Result of a successful login.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub user_fact: Fact,
    pub profile: Profile,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_structural_equality() {
        let a = Identity::new("google", "1234");
        let b = Identity::new("google".to_string(), "1234".to_string());
        assert_eq!(a, b);
        assert_ne!(a, Identity::new("github", "1234"));
    }

    #[test]
    fn test_identity_display() {
        assert_eq!(Identity::local_device().to_string(), "jinaga:local");
        assert_eq!(
            format!("{:?}", Identity::new("local", "device-1")),
            "Identity(local:device-1)"
        );
    }
}
