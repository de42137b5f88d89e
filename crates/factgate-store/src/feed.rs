//! Local feed: subscriptions and channels over a fact store.
//!
//! Every envelope saved through a [`LocalFeed`] is announced on a broadcast
//! channel. An [`Observable`] listens to those announcements and re-runs its
//! query to find result paths that the new fact completed.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use tokio::sync::broadcast;

use factgate_core::{Fact, FactEnvelope, FactReference};

use crate::error::{Result, StoreError};
use crate::query::Query;
use crate::traits::{FactStore, Feed};

/// Capacity of the save announcement channel.
const NOTIFY_CAPACITY: usize = 1024;

/// A registered interest in a query from a starting fact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channel {
    pub id: u64,
    pub start: FactReference,
    pub query: Query,
}

/// A subscription to new results of a query.
pub struct Observable {
    start: FactReference,
    query: Query,
    source: Arc<dyn FactStore>,
    receiver: broadcast::Receiver<FactReference>,
    seen: HashSet<Vec<FactReference>>,
}

impl Observable {
    pub fn new(
        start: FactReference,
        query: Query,
        source: Arc<dyn FactStore>,
        receiver: broadcast::Receiver<FactReference>,
    ) -> Self {
        Self {
            start,
            query,
            source,
            receiver,
            seen: HashSet::new(),
        }
    }

    /// Wait for the next batch of result paths completed by a saved fact.
    ///
    /// Returns `None` once the feed is closed.
    pub async fn next(&mut self) -> Option<Result<Vec<Vec<FactReference>>>> {
        loop {
            let saved = match self.receiver.recv().await {
                Ok(reference) => reference,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "observable lagged behind saves");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            };

            let paths = match self.source.query(&self.start, &self.query).await {
                Ok(paths) => paths,
                Err(e) => return Some(Err(e)),
            };

            let fresh: Vec<Vec<FactReference>> = paths
                .into_iter()
                .filter(|path| path.contains(&saved) || (path.is_empty() && saved == self.start))
                .filter(|path| self.seen.insert(path.clone()))
                .collect();

            if !fresh.is_empty() {
                return Some(Ok(fresh));
            }
        }
    }
}

/// A [`Feed`] over any [`FactStore`].
///
/// Closing drops the announcement sender, which ends every observable.
pub struct LocalFeed {
    store: Arc<dyn FactStore>,
    notify: RwLock<Option<broadcast::Sender<FactReference>>>,
    channels: RwLock<HashMap<u64, Channel>>,
    next_channel: AtomicU64,
}

impl LocalFeed {
    pub fn new(store: Arc<dyn FactStore>) -> Self {
        let (notify, _) = broadcast::channel(NOTIFY_CAPACITY);
        Self {
            store,
            notify: RwLock::new(Some(notify)),
            channels: RwLock::new(HashMap::new()),
            next_channel: AtomicU64::new(1),
        }
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<dyn FactStore> {
        &self.store
    }

    /// A receiver of save announcements. Already closed if the feed is.
    fn subscribe(&self) -> broadcast::Receiver<FactReference> {
        let sender = self.notify.read().ok().and_then(|notify| notify.clone());
        match sender {
            Some(sender) => sender.subscribe(),
            None => broadcast::channel(1).1,
        }
    }

    /// Channels currently registered, ordered by id.
    pub fn channels(&self) -> Vec<Channel> {
        let mut channels: Vec<Channel> = self
            .channels
            .read()
            .map(|channels| channels.values().cloned().collect())
            .unwrap_or_default();
        channels.sort_by_key(|channel| channel.id);
        channels
    }
}

#[async_trait]
impl FactStore for LocalFeed {
    async fn save(&self, envelopes: Vec<FactEnvelope>) -> Result<Vec<FactEnvelope>> {
        let saved = self.store.save(envelopes).await?;
        if let Some(notify) = self.notify.read().map_err(|_| StoreError::Poisoned)?.as_ref() {
            for envelope in &saved {
                // No receivers is not an error.
                let _ = notify.send(envelope.reference());
            }
        }
        tracing::debug!(count = saved.len(), "feed saved envelopes");
        Ok(saved)
    }

    async fn load(&self, references: &[FactReference]) -> Result<Vec<Fact>> {
        self.store.load(references).await
    }

    async fn query(&self, start: &FactReference, query: &Query) -> Result<Vec<Vec<FactReference>>> {
        self.store.query(start, query).await
    }

    async fn read(&self, start: &[FactReference], query: &Query) -> Result<Vec<Fact>> {
        self.store.read(start, query).await
    }

    async fn which_exist(&self, references: &[FactReference]) -> Result<Vec<FactReference>> {
        self.store.which_exist(references).await
    }
}

#[async_trait]
impl Feed for LocalFeed {
    fn from(&self, start: &FactReference, query: &Query) -> Observable {
        Observable::new(
            start.clone(),
            query.clone(),
            Arc::clone(&self.store),
            self.subscribe(),
        )
    }

    fn add_channel(&self, start: &FactReference, query: &Query) -> Channel {
        let channel = Channel {
            id: self.next_channel.fetch_add(1, Ordering::Relaxed),
            start: start.clone(),
            query: query.clone(),
        };
        if let Ok(mut channels) = self.channels.write() {
            channels.insert(channel.id, channel.clone());
        }
        channel
    }

    fn remove_channel(&self, channel: &Channel) {
        if let Ok(mut channels) = self.channels.write() {
            channels.remove(&channel.id);
        }
    }

    async fn close(&self) -> Result<()> {
        self.notify.write().map_err(|_| StoreError::Poisoned)?.take();
        let mut channels = self.channels.write().map_err(|_| StoreError::Poisoned)?;
        channels.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryFactStore;
    use factgate_core::Predecessors;
    use serde_json::json;

    fn fact(fact_type: &str, fields: serde_json::Value, predecessors: Predecessors) -> Fact {
        Fact::new(fact_type, fields.as_object().cloned().unwrap(), predecessors)
    }

    #[tokio::test]
    async fn test_observable_sees_new_successor() {
        let feed = LocalFeed::new(Arc::new(MemoryFactStore::new()));
        let blog = fact("Blog", json!({"name": "notes"}), Predecessors::new());
        feed.save(vec![FactEnvelope::unsigned(blog.clone())]).await.unwrap();

        let mut observable = feed.from(&blog.reference(), &Query::new().successor("Blog.Post", "blog"));

        let mut predecessors = Predecessors::new();
        predecessors.insert("blog".into(), blog.reference().into());
        let post = fact("Blog.Post", json!({"title": "hello"}), predecessors);
        feed.save(vec![FactEnvelope::unsigned(post.clone())]).await.unwrap();

        let paths = observable.next().await.unwrap().unwrap();
        assert_eq!(paths, vec![vec![post.reference()]]);
    }

    #[tokio::test]
    async fn test_channels_register_and_remove() {
        let feed = LocalFeed::new(Arc::new(MemoryFactStore::new()));
        let start = fact("Blog", json!({}), Predecessors::new()).reference();

        let a = feed.add_channel(&start, &Query::new());
        let b = feed.add_channel(&start, &Query::new().predecessor("x"));
        assert_ne!(a.id, b.id);
        assert_eq!(feed.channels(), vec![a.clone(), b.clone()]);

        feed.remove_channel(&a);
        assert_eq!(feed.channels(), vec![b]);

        feed.close().await.unwrap();
        assert!(feed.channels().is_empty());
    }

    #[tokio::test]
    async fn test_close_ends_observables() {
        let feed = LocalFeed::new(Arc::new(MemoryFactStore::new()));
        let blog = fact("Blog", json!({"name": "notes"}), Predecessors::new());
        let query = Query::new().successor("Blog.Post", "blog");
        let mut before = feed.from(&blog.reference(), &query);

        feed.close().await.unwrap();
        let ended = tokio::time::timeout(std::time::Duration::from_millis(300), before.next())
            .await
            .expect("observable should end when the feed closes");
        assert!(ended.is_none());

        let mut after = feed.from(&blog.reference(), &query);
        assert!(after.next().await.is_none());

        // Saving still works; there is just nobody to tell.
        let saved = feed.save(vec![FactEnvelope::unsigned(blog.clone())]).await.unwrap();
        assert_eq!(saved.len(), 1);
    }
}
