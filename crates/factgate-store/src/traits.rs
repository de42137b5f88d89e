//! Store traits: the abstract interfaces for fact and key persistence.
//!
//! These traits let the signing pipeline stay storage-agnostic. The fact
//! store is an external collaborator; the key table is the keystore's only
//! persistent state.

use async_trait::async_trait;
use std::fmt;

use factgate_core::{Fact, FactEnvelope, FactReference, Identity};

use crate::error::Result;
use crate::feed::{Channel, Observable};
use crate::query::Query;

/// The FactStore trait: async interface for fact persistence.
///
/// # Design Notes
///
/// - **Idempotent saves**: saving a fact whose hash is already stored is a
///   no-op that still returns the stored envelope, with any new signatures
///   appended.
/// - **Opaque reads**: `query` and `read` impose no authorization; read-time
///   filtering belongs to the caller.
#[async_trait]
pub trait FactStore: Send + Sync {
    /// Persist envelopes. Returns the stored envelope for every input.
    async fn save(&self, envelopes: Vec<FactEnvelope>) -> Result<Vec<FactEnvelope>>;

    /// Load the referenced facts and all of their ancestors.
    ///
    /// Predecessors come before the facts that reference them. Unknown
    /// references are skipped.
    async fn load(&self, references: &[FactReference]) -> Result<Vec<Fact>>;

    /// Walk `query` from `start`, returning every completed path.
    async fn query(&self, start: &FactReference, query: &Query) -> Result<Vec<Vec<FactReference>>>;

    /// Walk `query` from each start and return the facts at the path ends.
    async fn read(&self, start: &[FactReference], query: &Query) -> Result<Vec<Fact>>;

    /// The subset of `references` that are stored.
    async fn which_exist(&self, references: &[FactReference]) -> Result<Vec<FactReference>>;
}

/// A fact store plus the capabilities a session needs: subscriptions and
/// upstream interest channels.
#[async_trait]
pub trait Feed: FactStore {
    /// Observe new results of `query` from `start`.
    fn from(&self, start: &FactReference, query: &Query) -> Observable;

    /// Register interest in `query` from `start`.
    fn add_channel(&self, start: &FactReference, query: &Query) -> Channel;

    /// Withdraw a channel registered with [`Feed::add_channel`].
    fn remove_channel(&self, channel: &Channel);

    /// Release subscriptions and channels.
    async fn close(&self) -> Result<()>;
}

/// A persisted key pair for one identity.
#[derive(Clone, PartialEq, Eq)]
pub struct KeyRecord {
    pub provider: String,
    pub user_id: String,
    /// SPKI PEM.
    pub public_key: String,
    /// PKCS#8 PEM.
    pub private_key: String,
}

impl KeyRecord {
    pub fn new(identity: &Identity, public_key: String, private_key: String) -> Self {
        Self {
            provider: identity.provider.clone(),
            user_id: identity.id.clone(),
            public_key,
            private_key,
        }
    }

    pub fn identity(&self) -> Identity {
        Identity::new(self.provider.clone(), self.user_id.clone())
    }

    pub fn belongs_to(&self, identity: &Identity) -> bool {
        self.provider == identity.provider && self.user_id == identity.id
    }
}

impl fmt::Debug for KeyRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyRecord")
            .field("provider", &self.provider)
            .field("user_id", &self.user_id)
            .field("public_key", &self.public_key)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

/// The KeyTable trait: one key row per identity.
///
/// Rows are created at most once and never updated or deleted.
#[async_trait]
pub trait KeyTable: Send + Sync {
    /// Look up the row for an identity.
    ///
    /// Fails with `DuplicateKey` if more than one row exists.
    async fn find_key(&self, identity: &Identity) -> Result<Option<KeyRecord>>;

    /// Store `record` unless a row already exists for its identity.
    ///
    /// The lookup and the insert are one atomic step. Returns the row that
    /// is stored afterwards, which is the existing row when another caller
    /// won the race.
    async fn insert_if_absent(&self, record: KeyRecord) -> Result<KeyRecord>;
}
