//! The session composition: a logged-in user.

use std::sync::Arc;

use factgate_core::{Fact, FactEnvelope, Identity, LoginResponse, Profile};
use factgate_store::{FactStore, Feed};

use crate::error::{GateError, Result};
use crate::pipeline::SigningPipeline;

/// A user bound for the length of one request.
///
/// Saves run through the signing pipeline as the user.
#[derive(Clone)]
pub struct SessionAuthentication {
    pipeline: SigningPipeline,
    user: Identity,
    display_name: String,
    device: Identity,
}

impl SessionAuthentication {
    pub fn new(
        pipeline: SigningPipeline,
        user: Identity,
        display_name: impl Into<String>,
        device: Identity,
    ) -> Self {
        Self {
            pipeline,
            user,
            display_name: display_name.into(),
            device,
        }
    }

    pub fn user(&self) -> &Identity {
        &self.user
    }

    pub(crate) fn feed(&self) -> &Arc<dyn Feed> {
        self.pipeline.feed()
    }

    /// Materialize, sign and persist the user fact.
    pub async fn login(&self) -> Result<LoginResponse> {
        let keystore = self.pipeline.keystore();
        let user_fact = keystore.get_user_fact(&self.user).await?;
        let signed = keystore
            .sign_facts(
                Some(&self.user),
                vec![user_fact.clone()],
                self.pipeline.unsigned_policy(),
            )
            .await?;
        self.feed().save(signed).await?;

        tracing::debug!(user = %self.user, "session login");
        Ok(LoginResponse {
            user_fact,
            profile: Profile {
                display_name: self.display_name.clone(),
            },
        })
    }

    /// The device fact, persisted unsigned.
    pub async fn local(&self) -> Result<Fact> {
        let fact = self.pipeline.keystore().get_device_fact(&self.device).await?;
        self.feed()
            .save(vec![FactEnvelope::unsigned(fact.clone())])
            .await?;
        Ok(fact)
    }

    /// Authorize, sign and persist as the session user.
    ///
    /// The user must have logged in before, so the user fact is stored;
    /// an issued key alone is not enough. Incoming signatures are discarded
    /// and replaced by the user's own.
    pub async fn save(&self, envelopes: Vec<FactEnvelope>) -> Result<Vec<FactEnvelope>> {
        let user_fact = self
            .pipeline
            .keystore()
            .find_user_fact(&self.user)
            .await?
            .ok_or_else(|| GateError::UnknownIdentity(self.user.clone()))?;
        if self.feed().which_exist(&[user_fact.reference()]).await?.is_empty() {
            return Err(GateError::UnknownIdentity(self.user.clone()));
        }

        let facts = envelopes.into_iter().map(|envelope| envelope.fact).collect();
        self.pipeline.save(Some(&self.user), facts).await
    }
}
