//! A feed that forwards to an upstream peer.
//!
//! The upstream is authoritative. Saves go upstream first and land in the
//! local feed only once the peer accepted them. Queries and reads are
//! answered upstream; loads try the local feed first. The local feed
//! drives subscriptions, and channels are refreshed from the upstream on
//! demand.

use std::collections::HashSet;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use factgate_core::{Fact, FactEnvelope, FactReference};
use factgate_store::{Channel, FactStore, Feed, Observable, Query, Result, StoreError};

use crate::client::RemoteClient;

/// A transient fork: a local feed in front of a remote peer.
pub struct TransientFork {
    local: Arc<dyn Feed>,
    client: RemoteClient,
    channels: RwLock<Vec<Channel>>,
}

impl TransientFork {
    pub fn new(local: Arc<dyn Feed>, client: RemoteClient) -> Self {
        Self {
            local,
            client,
            channels: RwLock::new(Vec::new()),
        }
    }

    pub fn client(&self) -> &RemoteClient {
        &self.client
    }

    /// Pull the current results of every open channel from upstream into
    /// the local feed. Returns the number of facts fetched.
    ///
    /// Facts fetched this way are stored without signatures.
    pub async fn refresh_channels(&self) -> Result<usize> {
        let channels = self
            .channels
            .read()
            .map_err(|_| StoreError::Poisoned)?
            .clone();

        let mut wanted = Vec::new();
        let mut seen = HashSet::new();
        for channel in &channels {
            let paths = self.client.query(&channel.start, &channel.query).await?;
            for reference in paths.into_iter().flatten() {
                if seen.insert(reference.clone()) {
                    wanted.push(reference);
                }
            }
        }
        if wanted.is_empty() {
            return Ok(0);
        }

        let present: HashSet<FactReference> =
            self.local.which_exist(&wanted).await?.into_iter().collect();
        let missing: Vec<FactReference> = wanted
            .into_iter()
            .filter(|reference| !present.contains(reference))
            .collect();
        if missing.is_empty() {
            return Ok(0);
        }

        let facts = self.client.load(&missing).await?;
        let fetched = facts.len();
        self.local
            .save(facts.into_iter().map(FactEnvelope::unsigned).collect())
            .await?;

        tracing::debug!(channels = channels.len(), fetched, "refreshed channels from upstream");
        Ok(fetched)
    }
}

#[async_trait]
impl FactStore for TransientFork {
    async fn save(&self, envelopes: Vec<FactEnvelope>) -> Result<Vec<FactEnvelope>> {
        let accepted = self.client.save(envelopes).await?;
        self.local.save(accepted).await
    }

    async fn load(&self, references: &[FactReference]) -> Result<Vec<Fact>> {
        let mut facts = self.local.load(references).await?;
        let known: HashSet<FactReference> = facts.iter().map(Fact::reference).collect();
        let remaining: Vec<FactReference> = references
            .iter()
            .filter(|reference| !known.contains(reference))
            .cloned()
            .collect();
        if remaining.is_empty() {
            return Ok(facts);
        }

        let upstream = self.client.load(&remaining).await?;
        facts.extend(
            upstream
                .into_iter()
                .filter(|fact| !known.contains(&fact.reference())),
        );
        Ok(facts)
    }

    async fn query(&self, start: &FactReference, query: &Query) -> Result<Vec<Vec<FactReference>>> {
        Ok(self.client.query(start, query).await?)
    }

    async fn read(&self, start: &[FactReference], query: &Query) -> Result<Vec<Fact>> {
        Ok(self.client.read(start, query).await?)
    }

    async fn which_exist(&self, references: &[FactReference]) -> Result<Vec<FactReference>> {
        self.local.which_exist(references).await
    }
}

#[async_trait]
impl Feed for TransientFork {
    fn from(&self, start: &FactReference, query: &Query) -> Observable {
        self.local.from(start, query)
    }

    fn add_channel(&self, start: &FactReference, query: &Query) -> Channel {
        let channel = self.local.add_channel(start, query);
        if let Ok(mut channels) = self.channels.write() {
            channels.push(channel.clone());
        }
        channel
    }

    fn remove_channel(&self, channel: &Channel) {
        if let Ok(mut channels) = self.channels.write() {
            channels.retain(|open| open.id != channel.id);
        }
        self.local.remove_channel(channel);
    }

    async fn close(&self) -> Result<()> {
        self.channels.write().map_err(|_| StoreError::Poisoned)?.clear();
        self.local.close().await
    }
}
