//! The gate factory: wires stores, keystore, pipeline and compositions.

use std::sync::Arc;

use factgate_auth::{AuthorizationGate, AuthorizationRules, RuleEvaluator};
use factgate_core::Identity;
use factgate_store::{
    FactStore, Feed, KeyTable, LocalFeed, MemoryFactStore, MemoryKeyTable, SqliteKeyTable,
};
use factgate_sync::{RemoteClient, Transport, TransientFork};

use crate::authentication::{
    Authentication, DeviceAuthentication, ExecutionContext, RemoteAuthentication, RequestUser,
    SessionAuthentication,
};
use crate::config::GateConfig;
use crate::error::{GateError, Result};
use crate::keystore::Keystore;
use crate::peer::PeerService;
use crate::pipeline::SigningPipeline;

/// Builder for a [`FactGate`].
#[derive(Default)]
pub struct FactGateBuilder {
    config: GateConfig,
    evaluator: Option<Arc<dyn RuleEvaluator>>,
    store: Option<Arc<dyn FactStore>>,
    key_table: Option<Arc<dyn KeyTable>>,
    upstream: Option<Arc<dyn Transport>>,
}

impl FactGateBuilder {
    pub fn config(mut self, config: GateConfig) -> Self {
        self.config = config;
        self
    }

    /// Enable policy mode with declarative rules.
    pub fn rules(self, rules: AuthorizationRules) -> Self {
        self.evaluator(Arc::new(rules))
    }

    /// Enable policy mode with any evaluator.
    pub fn evaluator(mut self, evaluator: Arc<dyn RuleEvaluator>) -> Self {
        self.evaluator = Some(evaluator);
        self
    }

    /// Persist facts in `store` instead of memory.
    pub fn store(mut self, store: Arc<dyn FactStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Keep keys in `table`, overriding `keystore_path`.
    pub fn key_table(mut self, table: Arc<dyn KeyTable>) -> Self {
        self.key_table = Some(table);
        self
    }

    /// Forward to an upstream peer.
    pub fn upstream(mut self, transport: Arc<dyn Transport>) -> Self {
        self.upstream = Some(transport);
        self
    }

    pub fn build(self) -> Result<FactGate> {
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(MemoryFactStore::new()) as Arc<dyn FactStore>);
        let feed: Arc<dyn Feed> = Arc::new(LocalFeed::new(store));

        let fork = self.upstream.map(|transport| {
            let client = RemoteClient::with_timeout(transport, self.config.http_timeout());
            Arc::new(TransientFork::new(Arc::clone(&feed), client))
        });
        let writable: Arc<dyn Feed> = match &fork {
            Some(fork) => Arc::clone(fork) as Arc<dyn Feed>,
            None => Arc::clone(&feed),
        };

        let key_table: Arc<dyn KeyTable> = match (self.key_table, &self.config.keystore_path) {
            (Some(table), _) => table,
            (None, Some(path)) => Arc::new(SqliteKeyTable::open(path)?),
            (None, None) => Arc::new(MemoryKeyTable::new()),
        };
        let keystore = Keystore::new(key_table);

        let gate = match self.evaluator {
            Some(evaluator) => AuthorizationGate::with_evaluator(evaluator),
            None => AuthorizationGate::open(),
        };
        let pipeline = SigningPipeline::new(Arc::clone(&writable), keystore.clone(), gate)
            .with_unsigned_policy(self.config.unsigned_fact_policy);

        tracing::debug!(
            policy = pipeline.is_policy_mode(),
            upstream = fork.is_some(),
            durable_keys = self.config.keystore_path.is_some(),
            "fact gate built"
        );

        Ok(FactGate {
            device: DeviceAuthentication::new(
                writable,
                keystore.clone(),
                self.config.device_identity.clone(),
            ),
            config: self.config,
            feed,
            fork,
            keystore,
            pipeline,
        })
    }
}

/// A configured fact gate.
///
/// Holds one store, one key table and one pipeline; hands out a
/// composition per execution context.
pub struct FactGate {
    config: GateConfig,
    feed: Arc<dyn Feed>,
    fork: Option<Arc<TransientFork>>,
    keystore: Keystore,
    pipeline: SigningPipeline,
    device: DeviceAuthentication,
}

impl FactGate {
    pub fn builder() -> FactGateBuilder {
        FactGateBuilder::default()
    }

    /// A gate with default configuration, no policy and no upstream.
    pub fn in_memory() -> Result<Self> {
        Self::builder().build()
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// The local feed, before any forwarding.
    pub fn feed(&self) -> &Arc<dyn Feed> {
        &self.feed
    }

    pub fn keystore(&self) -> &Keystore {
        &self.keystore
    }

    pub fn pipeline(&self) -> &SigningPipeline {
        &self.pipeline
    }

    /// The composition for an execution context.
    pub fn authentication(&self, context: ExecutionContext) -> Result<Authentication> {
        match context {
            ExecutionContext::Device => Ok(self.device()),
            ExecutionContext::User(user) => Ok(self.with_session(user)),
            ExecutionContext::Upstream => {
                let fork = self.fork.as_ref().ok_or(GateError::NoUpstream)?;
                Ok(Authentication::Remote(RemoteAuthentication::new(Arc::clone(fork))))
            }
        }
    }

    /// The server's own composition.
    pub fn device(&self) -> Authentication {
        Authentication::Device(self.device.clone())
    }

    /// A composition for one request's user.
    pub fn with_session(&self, user: RequestUser) -> Authentication {
        Authentication::Session(self.session(user))
    }

    fn session(&self, user: RequestUser) -> SessionAuthentication {
        SessionAuthentication::new(
            self.pipeline.clone(),
            Identity::new(user.provider, user.id),
            user.display_name,
            self.config.device_identity.clone(),
        )
    }

    /// Serve remote peers as `user`.
    ///
    /// Peers always act through a session, so their saves go through the
    /// signing pipeline. The device composition stays in-process.
    pub fn peer_service(&self, user: RequestUser) -> PeerService {
        PeerService::new(self.session(user))
    }
}
