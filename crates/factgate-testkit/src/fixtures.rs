//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::sync::Arc;

use serde_json::Value;

use factgate::{AuthorizationRules, FactGate, FactGateBuilder, RequestUser, Result};
use factgate_core::{Fact, Fields, Identity, PredecessorSet, Predecessors};
use factgate_store::{MemoryFactStore, MemoryKeyTable};

/// A gate over memory stores the test can inspect directly.
pub struct TestFixture {
    pub store: Arc<MemoryFactStore>,
    pub key_table: Arc<MemoryKeyTable>,
}

impl TestFixture {
    pub fn new() -> Self {
        Self {
            store: Arc::new(MemoryFactStore::new()),
            key_table: Arc::new(MemoryKeyTable::new()),
        }
    }

    /// A builder already wired to this fixture's stores.
    pub fn builder(&self) -> FactGateBuilder {
        FactGate::builder()
            .store(self.store.clone())
            .key_table(self.key_table.clone())
    }

    /// A gate with no rule evaluator.
    pub fn open_gate(&self) -> Result<FactGate> {
        self.builder().build()
    }

    /// A gate in policy mode.
    pub fn gate_with_rules(&self, rules: AuthorizationRules) -> Result<FactGate> {
        self.builder().rules(rules).build()
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// A request user from the `google` provider.
pub fn user(id: &str) -> RequestUser {
    RequestUser {
        provider: "google".into(),
        id: id.into(),
        display_name: format!("User {id}"),
    }
}

pub fn identity_of(user: &RequestUser) -> Identity {
    Identity::new(user.provider.clone(), user.id.clone())
}

/// Build a fact from a JSON object of fields.
///
/// # Panics
///
/// Panics when `fields` is not an object.
pub fn fact(fact_type: &str, fields: Value) -> Fact {
    fact_with(fact_type, fields, &[])
}

/// Build a fact with one predecessor per role.
pub fn fact_with(fact_type: &str, fields: Value, predecessors: &[(&str, &Fact)]) -> Fact {
    let Value::Object(fields) = fields else {
        panic!("fact fields must be a JSON object");
    };
    let predecessors: Predecessors = predecessors
        .iter()
        .map(|(role, fact)| (role.to_string(), PredecessorSet::Single(fact.reference())))
        .collect();
    Fact::new(fact_type, fields, predecessors)
}

/// A fact with no fields, distinguished only by type.
pub fn empty_fact(fact_type: &str) -> Fact {
    Fact::new(fact_type, Fields::new(), Predecessors::new())
}

/// A fact whose declared hash belongs to different content.
pub fn tampered_fact(fact_type: &str, fields: Value) -> Fact {
    let mut fact = fact(fact_type, fields);
    fact.hash = empty_fact("Tampered").hash;
    fact
}
