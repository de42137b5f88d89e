//! In-memory implementations of the store traits.
//!
//! [`MemoryFactStore`] backs local feeds when no durable store is
//! configured and is what the tests run against. [`MemoryKeyTable`] keeps
//! key rows in an arena; it performs lookup-and-insert under one write lock.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use async_trait::async_trait;

use factgate_core::{Fact, FactEnvelope, FactReference, Identity};

use crate::error::{Result, StoreError};
use crate::query::{Query, Step};
use crate::traits::{FactStore, KeyRecord, KeyTable};

/// In-memory fact store.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
pub struct MemoryFactStore {
    inner: RwLock<MemoryFactStoreInner>,
}

#[derive(Default)]
struct MemoryFactStoreInner {
    /// Envelopes indexed by reference.
    envelopes: HashMap<FactReference, FactEnvelope>,

    /// Insertion order, for stable results.
    order: Vec<FactReference>,

    /// Successor index: predecessor -> (role, successor).
    successors: HashMap<FactReference, Vec<(String, FactReference)>>,
}

impl MemoryFactStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryFactStoreInner::default()),
        }
    }

    /// Number of stored facts.
    pub fn len(&self) -> usize {
        self.inner.read().map(|inner| inner.order.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The stored envelope for a reference, signatures included.
    pub fn envelope(&self, reference: &FactReference) -> Result<Option<FactEnvelope>> {
        let inner = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        Ok(inner.envelopes.get(reference).cloned())
    }
}

impl Default for MemoryFactStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryFactStoreInner {
    fn walk(&self, start: &FactReference, query: &Query) -> Vec<Vec<FactReference>> {
        if !self.envelopes.contains_key(start) {
            return Vec::new();
        }

        let mut frontier: Vec<(Vec<FactReference>, FactReference)> =
            vec![(Vec::new(), start.clone())];

        for step in &query.steps {
            let mut next = Vec::new();
            for (path, head) in frontier {
                for reference in self.step_from(&head, step) {
                    let mut extended = path.clone();
                    extended.push(reference.clone());
                    next.push((extended, reference));
                }
            }
            frontier = next;
        }

        frontier.into_iter().map(|(path, _)| path).collect()
    }

    fn step_from(&self, head: &FactReference, step: &Step) -> Vec<FactReference> {
        match step {
            Step::Predecessor { role } => self
                .envelopes
                .get(head)
                .map(|envelope| {
                    envelope
                        .fact
                        .predecessors_in_role(role)
                        .iter()
                        .filter(|reference| self.envelopes.contains_key(reference))
                        .cloned()
                        .collect()
                })
                .unwrap_or_default(),
            Step::Successor { fact_type, role } => self
                .successors
                .get(head)
                .map(|successors| {
                    successors
                        .iter()
                        .filter(|(r, successor)| r == role && &successor.fact_type == fact_type)
                        .map(|(_, successor)| successor.clone())
                        .collect()
                })
                .unwrap_or_default(),
        }
    }

    /// Depth-first: ancestors are pushed before the facts that need them.
    fn collect_ancestors(
        &self,
        reference: &FactReference,
        visited: &mut HashSet<FactReference>,
        out: &mut Vec<Fact>,
    ) {
        if !visited.insert(reference.clone()) {
            return;
        }
        if let Some(envelope) = self.envelopes.get(reference) {
            for (_, predecessor) in envelope.fact.predecessor_references() {
                self.collect_ancestors(predecessor, visited, out);
            }
            out.push(envelope.fact.clone());
        }
    }
}

#[async_trait]
impl FactStore for MemoryFactStore {
    async fn save(&self, envelopes: Vec<FactEnvelope>) -> Result<Vec<FactEnvelope>> {
        let mut inner = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        let mut saved = Vec::with_capacity(envelopes.len());

        for envelope in envelopes {
            let reference = envelope.reference();

            // Same hash, same fact: keep the stored copy, collect new signers.
            if let Some(existing) = inner.envelopes.get_mut(&reference) {
                existing.merge_signatures(&envelope.signatures);
                saved.push(existing.clone());
                continue;
            }

            for (role, predecessor) in envelope.fact.predecessor_references() {
                inner
                    .successors
                    .entry(predecessor.clone())
                    .or_default()
                    .push((role.to_string(), reference.clone()));
            }
            inner.order.push(reference.clone());
            inner.envelopes.insert(reference, envelope.clone());
            saved.push(envelope);
        }

        Ok(saved)
    }

    async fn load(&self, references: &[FactReference]) -> Result<Vec<Fact>> {
        let inner = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        let mut visited = HashSet::new();
        let mut facts = Vec::new();
        for reference in references {
            inner.collect_ancestors(reference, &mut visited, &mut facts);
        }
        Ok(facts)
    }

    async fn query(&self, start: &FactReference, query: &Query) -> Result<Vec<Vec<FactReference>>> {
        let inner = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        Ok(inner.walk(start, query))
    }

    async fn read(&self, start: &[FactReference], query: &Query) -> Result<Vec<Fact>> {
        let inner = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        let mut seen = HashSet::new();
        let mut facts = Vec::new();

        for reference in start {
            for path in inner.walk(reference, query) {
                let end = path.last().unwrap_or(reference);
                if seen.insert(end.clone()) {
                    if let Some(envelope) = inner.envelopes.get(end) {
                        facts.push(envelope.fact.clone());
                    }
                }
            }
        }

        Ok(facts)
    }

    async fn which_exist(&self, references: &[FactReference]) -> Result<Vec<FactReference>> {
        let inner = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        Ok(references
            .iter()
            .filter(|reference| inner.envelopes.contains_key(reference))
            .cloned()
            .collect())
    }
}

/// In-memory key table.
///
/// Rows live in an arena rather than a map so that a corrupted table (two
/// rows for one identity) can be represented and detected.
pub struct MemoryKeyTable {
    rows: RwLock<Vec<KeyRecord>>,
}

impl MemoryKeyTable {
    /// Create a new empty key table.
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(Vec::new()),
        }
    }

    /// Create a table holding the given rows exactly as provided.
    pub fn with_rows(rows: Vec<KeyRecord>) -> Self {
        Self {
            rows: RwLock::new(rows),
        }
    }

    /// Total number of rows.
    pub fn len(&self) -> usize {
        self.rows.read().map(|rows| rows.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryKeyTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Find the single row for an identity, rejecting duplicates.
fn single_row<'a>(rows: &'a [KeyRecord], identity: &Identity) -> Result<Option<&'a KeyRecord>> {
    let mut matching = rows.iter().filter(|row| row.belongs_to(identity));
    let first = matching.next();
    if matching.next().is_some() {
        return Err(StoreError::DuplicateKey {
            provider: identity.provider.clone(),
            user_id: identity.id.clone(),
        });
    }
    Ok(first)
}

#[async_trait]
impl KeyTable for MemoryKeyTable {
    async fn find_key(&self, identity: &Identity) -> Result<Option<KeyRecord>> {
        let rows = self.rows.read().map_err(|_| StoreError::Poisoned)?;
        Ok(single_row(&rows, identity)?.cloned())
    }

    async fn insert_if_absent(&self, record: KeyRecord) -> Result<KeyRecord> {
        let mut rows = self.rows.write().map_err(|_| StoreError::Poisoned)?;
        let identity = record.identity();
        if let Some(existing) = single_row(&rows, &identity)? {
            return Ok(existing.clone());
        }
        rows.push(record.clone());
        Ok(record)
    }
}
