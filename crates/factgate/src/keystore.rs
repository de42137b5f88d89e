//! The identity keystore.
//!
//! Maps an external identity to an Ed25519 key pair. Keys are created on
//! first use and never change afterwards:
//!
//! ```text
//! Absent --get_or_create_public_key--> Issued
//! ```
//!
//! Signing needs an issued key. A fact whose declared hash does not match
//! its content, or whose fresh signature fails to verify, is not signed;
//! those are soft failures reported through [`SignOutcome::Failed`].

use std::sync::Arc;

use serde_json::Value;

use factgate_core::{
    fact_digest, verify_digest, Fact, FactEnvelope, Fields, Identity, Predecessors, Signature,
    SigningKeyPair, DEVICE_FACT_TYPE, USER_FACT_TYPE,
};
use factgate_store::{KeyRecord, KeyTable};

use crate::config::UnsignedFactPolicy;
use crate::error::{GateError, Result};

/// Why a fact was left unsigned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignFailure {
    /// The declared hash does not match the canonical content.
    HashMismatch { declared: String, computed: String },
    /// The signature just produced does not verify against the stored
    /// public key.
    SignatureVerification(String),
}

/// Result of signing one fact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignOutcome {
    /// No identity was acting; nothing to sign with.
    Unauthenticated,
    Signed(Signature),
    Failed(SignFailure),
}

impl SignOutcome {
    /// The signatures to attach to the fact: one when signed, none otherwise.
    pub fn signatures(self) -> Vec<Signature> {
        match self {
            SignOutcome::Signed(signature) => vec![signature],
            SignOutcome::Unauthenticated | SignOutcome::Failed(_) => Vec::new(),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, SignOutcome::Failed(_))
    }
}

/// Build the identity fact of `fact_type` for a public key.
///
/// Its only field is `publicKey` and it has no predecessors.
pub fn identity_fact(fact_type: &str, public_key: &str) -> Fact {
    let mut fields = Fields::new();
    fields.insert("publicKey".into(), Value::String(public_key.to_string()));
    Fact::new(fact_type, fields, Predecessors::new())
}

/// Per-identity key lifecycle and signing.
#[derive(Clone)]
pub struct Keystore {
    table: Arc<dyn KeyTable>,
}

impl Keystore {
    pub fn new(table: Arc<dyn KeyTable>) -> Self {
        Self { table }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Keys
    // ─────────────────────────────────────────────────────────────────────────

    /// The identity's public key, issuing a key pair on first use.
    ///
    /// Concurrent first calls for one identity all return the same key; the
    /// key table keeps whichever row was inserted first.
    pub async fn get_or_create_public_key(&self, identity: &Identity) -> Result<String> {
        if let Some(record) = self.table.find_key(identity).await? {
            return Ok(record.public_key);
        }

        let pair = SigningKeyPair::generate();
        let candidate = KeyRecord::new(identity, pair.public_pem()?, pair.private_pem()?);
        let generated = candidate.public_key.clone();
        let stored = self.table.insert_if_absent(candidate).await?;

        if stored.public_key == generated {
            tracing::debug!(identity = %identity, "issued signing key");
        }
        Ok(stored.public_key)
    }

    /// The identity's public key, if one was issued.
    pub async fn find_public_key(&self, identity: &Identity) -> Result<Option<String>> {
        Ok(self
            .table
            .find_key(identity)
            .await?
            .map(|record| record.public_key))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Identity facts
    // ─────────────────────────────────────────────────────────────────────────

    /// The identity fact of `fact_type`, issuing a key if needed.
    ///
    /// Returns `None` for an absent identity.
    pub async fn get_identity_fact(
        &self,
        fact_type: &str,
        identity: Option<&Identity>,
    ) -> Result<Option<Fact>> {
        let Some(identity) = identity else {
            return Ok(None);
        };
        let public_key = self.get_or_create_public_key(identity).await?;
        Ok(Some(identity_fact(fact_type, &public_key)))
    }

    pub async fn get_user_fact(&self, identity: &Identity) -> Result<Fact> {
        let public_key = self.get_or_create_public_key(identity).await?;
        Ok(identity_fact(USER_FACT_TYPE, &public_key))
    }

    pub async fn get_device_fact(&self, identity: &Identity) -> Result<Fact> {
        let public_key = self.get_or_create_public_key(identity).await?;
        Ok(identity_fact(DEVICE_FACT_TYPE, &public_key))
    }

    /// The user fact for an identity that already has a key. Never issues.
    pub async fn find_user_fact(&self, identity: &Identity) -> Result<Option<Fact>> {
        Ok(self
            .find_public_key(identity)
            .await?
            .map(|public_key| identity_fact(USER_FACT_TYPE, &public_key)))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Signing
    // ─────────────────────────────────────────────────────────────────────────

    /// Sign one fact as `identity`.
    ///
    /// Fails with [`GateError::KeystoreNotFound`] when the identity has no
    /// key. Hash and self-verification problems are soft failures.
    pub async fn sign(&self, identity: Option<&Identity>, fact: &Fact) -> Result<SignOutcome> {
        let Some(identity) = identity else {
            return Ok(SignOutcome::Unauthenticated);
        };

        let record = self
            .table
            .find_key(identity)
            .await?
            .ok_or_else(|| GateError::KeystoreNotFound(identity.clone()))?;

        let digest = fact_digest(fact);
        let computed = digest.to_base64();
        if computed != fact.hash {
            tracing::error!(
                fact_type = %fact.fact_type,
                declared = %fact.hash,
                computed = %computed,
                "hash does not match the fact content; leaving it unsigned"
            );
            return Ok(SignOutcome::Failed(SignFailure::HashMismatch {
                declared: fact.hash.clone(),
                computed,
            }));
        }

        let pair = SigningKeyPair::from_private_pem(&record.private_key)?;
        let signature = pair.sign_digest(&digest);

        if let Err(e) = verify_digest(&record.public_key, &digest, &signature) {
            tracing::error!(
                identity = %identity,
                fact_type = %fact.fact_type,
                hash = %fact.hash,
                error = %e,
                "signature failed self-verification; leaving the fact unsigned"
            );
            return Ok(SignOutcome::Failed(SignFailure::SignatureVerification(
                e.to_string(),
            )));
        }

        Ok(SignOutcome::Signed(Signature {
            signature,
            public_key: record.public_key,
        }))
    }

    /// Sign each fact independently and wrap it in an envelope.
    ///
    /// Facts that soft-fail are kept unsigned or dropped according to
    /// `policy`.
    pub async fn sign_facts(
        &self,
        identity: Option<&Identity>,
        facts: Vec<Fact>,
        policy: UnsignedFactPolicy,
    ) -> Result<Vec<FactEnvelope>> {
        let mut envelopes = Vec::with_capacity(facts.len());
        for fact in facts {
            let outcome = self.sign(identity, &fact).await?;
            if outcome.is_failure() && policy == UnsignedFactPolicy::Reject {
                tracing::warn!(hash = %fact.hash, "rejecting fact that could not be signed");
                continue;
            }
            envelopes.push(FactEnvelope::new(fact, outcome.signatures()));
        }
        Ok(envelopes)
    }
}
