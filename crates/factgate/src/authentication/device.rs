//! The device composition: the server acting as itself.

use std::sync::Arc;

use factgate_core::{Fact, FactEnvelope, Identity, LoginResponse};
use factgate_store::{FactStore, Feed};

use crate::error::{GateError, Result};
use crate::keystore::Keystore;

/// No logged-in user. Saves go straight to the feed without local
/// authorization.
#[derive(Clone)]
pub struct DeviceAuthentication {
    pub(crate) feed: Arc<dyn Feed>,
    keystore: Keystore,
    device: Identity,
}

impl DeviceAuthentication {
    pub fn new(feed: Arc<dyn Feed>, keystore: Keystore, device: Identity) -> Self {
        Self {
            feed,
            keystore,
            device,
        }
    }

    pub fn device(&self) -> &Identity {
        &self.device
    }

    pub async fn login(&self) -> Result<LoginResponse> {
        Err(GateError::NotLoggedIn)
    }

    /// The device fact, issuing the device key on first use.
    pub async fn local(&self) -> Result<Fact> {
        let fact = self.keystore.get_device_fact(&self.device).await?;
        self.feed
            .save(vec![FactEnvelope::unsigned(fact.clone())])
            .await?;
        Ok(fact)
    }

    pub async fn save(&self, envelopes: Vec<FactEnvelope>) -> Result<Vec<FactEnvelope>> {
        Ok(self.feed.save(envelopes).await?)
    }
}
