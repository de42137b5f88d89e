//! The signing pipeline: authorize, sign, persist.
//!
//! With a rule evaluator configured, this is the only path to durable
//! storage. Reads pass through unrestricted.

use std::sync::Arc;

use factgate_auth::AuthorizationGate;
use factgate_core::{Fact, FactEnvelope, FactReference, Identity};
use factgate_store::{FactStore, Feed, Query};

use crate::config::UnsignedFactPolicy;
use crate::error::{GateError, Result};
use crate::keystore::Keystore;

/// Authorize → sign → persist, as one `save`.
#[derive(Clone)]
pub struct SigningPipeline {
    feed: Arc<dyn Feed>,
    keystore: Keystore,
    gate: AuthorizationGate,
    unsigned_policy: UnsignedFactPolicy,
}

impl SigningPipeline {
    pub fn new(feed: Arc<dyn Feed>, keystore: Keystore, gate: AuthorizationGate) -> Self {
        Self {
            feed,
            keystore,
            gate,
            unsigned_policy: UnsignedFactPolicy::default(),
        }
    }

    pub fn with_unsigned_policy(mut self, policy: UnsignedFactPolicy) -> Self {
        self.unsigned_policy = policy;
        self
    }

    pub fn feed(&self) -> &Arc<dyn Feed> {
        &self.feed
    }

    pub fn keystore(&self) -> &Keystore {
        &self.keystore
    }

    pub fn unsigned_policy(&self) -> UnsignedFactPolicy {
        self.unsigned_policy
    }

    pub fn is_policy_mode(&self) -> bool {
        self.gate.is_policy_mode()
    }

    /// Save candidate facts on behalf of `identity`.
    ///
    /// Without a policy every candidate is signed (or left unsigned for an
    /// anonymous caller) and persisted. With a policy the acting user fact
    /// must exist; only authorized facts are signed and persisted. Returns
    /// what the store reports as persisted.
    pub async fn save(&self, identity: Option<&Identity>, candidates: Vec<Fact>) -> Result<Vec<FactEnvelope>> {
        let total = candidates.len();

        let authorized = if self.gate.is_policy_mode() {
            let user_fact = match identity {
                Some(identity) => Some(
                    self.keystore
                        .find_user_fact(identity)
                        .await?
                        .ok_or_else(|| GateError::UnknownIdentity(identity.clone()))?,
                ),
                None => None,
            };
            self.gate.authorize(user_fact.as_ref(), candidates).await?
        } else {
            candidates
        };
        let authorized_count = authorized.len();

        let envelopes = self
            .keystore
            .sign_facts(identity, authorized, self.unsigned_policy)
            .await?;
        let signed = envelopes.iter().filter(|e| e.is_signed()).count();

        let saved = self.feed.save(envelopes).await?;

        tracing::debug!(
            candidates = total,
            authorized = authorized_count,
            signed,
            persisted = saved.len(),
            "pipeline saved facts"
        );
        Ok(saved)
    }

    /// Materialize the user fact for `identity` and persist it unsigned.
    pub async fn get_or_create_user_fact(&self, identity: &Identity) -> Result<Fact> {
        let fact = self.keystore.get_user_fact(identity).await?;
        self.feed
            .save(vec![FactEnvelope::unsigned(fact.clone())])
            .await?;
        Ok(fact)
    }

    pub async fn query(&self, start: &FactReference, query: &Query) -> Result<Vec<Vec<FactReference>>> {
        Ok(self.feed.query(start, query).await?)
    }

    pub async fn read(&self, start: &[FactReference], query: &Query) -> Result<Vec<Fact>> {
        Ok(self.feed.read(start, query).await?)
    }

    pub async fn load(&self, references: &[FactReference]) -> Result<Vec<Fact>> {
        Ok(self.feed.load(references).await?)
    }
}
