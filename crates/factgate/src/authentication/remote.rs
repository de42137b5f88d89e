//! The forwarding composition: everything goes to an upstream peer.

use std::sync::Arc;

use factgate_core::{Fact, FactEnvelope, LoginResponse};
use factgate_store::{FactStore, Feed};
use factgate_sync::{RemoteClient, TransientFork};

use crate::error::{GateError, Result};

/// Delegates to an upstream peer through a transient fork.
#[derive(Clone)]
pub struct RemoteAuthentication {
    fork: Arc<TransientFork>,
}

impl RemoteAuthentication {
    pub fn new(fork: Arc<TransientFork>) -> Self {
        Self { fork }
    }

    pub fn client(&self) -> &RemoteClient {
        self.fork.client()
    }

    pub(crate) fn feed(&self) -> Arc<dyn Feed> {
        self.fork.clone()
    }

    /// Log in as the user behind the upstream connection.
    pub async fn login(&self) -> Result<LoginResponse> {
        Ok(self.client().login().await?)
    }

    pub async fn local(&self) -> Result<Fact> {
        Err(GateError::LocalUnavailable)
    }

    pub async fn save(&self, envelopes: Vec<FactEnvelope>) -> Result<Vec<FactEnvelope>> {
        Ok(self.fork.save(envelopes).await?)
    }

    /// Pull open channels from the upstream.
    pub async fn refresh_channels(&self) -> Result<usize> {
        Ok(self.fork.refresh_channels().await?)
    }
}
