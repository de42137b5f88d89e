//! Facts and fact references.
//!
//! A fact is identified by the hash of its canonical fields and
//! predecessors. Facts are never updated; new facts reference old ones as
//! predecessors.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use crate::canonical::compute_hash;

/// Field values of a fact, keyed by field name.
pub type Fields = serde_json::Map<String, serde_json::Value>;

/// Predecessors of a fact, keyed by role.
pub type Predecessors = BTreeMap<String, PredecessorSet>;

/// A weak reference to a fact.
///
/// References never imply ownership, only identity. They order by hash
/// first and type second, which is the order used by canonicalization.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FactReference {
    #[serde(rename = "type")]
    pub fact_type: String,
    pub hash: String,
}

impl FactReference {
    pub fn new(fact_type: impl Into<String>, hash: impl Into<String>) -> Self {
        Self {
            fact_type: fact_type.into(),
            hash: hash.into(),
        }
    }
}

impl Ord for FactReference {
    fn cmp(&self, other: &Self) -> Ordering {
        self.hash
            .cmp(&other.hash)
            .then_with(|| self.fact_type.cmp(&other.fact_type))
    }
}

impl PartialOrd for FactReference {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Debug for FactReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let short = self.hash.get(..12).unwrap_or(&self.hash);
        write!(f, "{}({})", self.fact_type, short)
    }
}

/// One or many references under a single predecessor role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PredecessorSet {
    Single(FactReference),
    Many(Vec<FactReference>),
}

impl PredecessorSet {
    /// All references in this set.
    pub fn references(&self) -> &[FactReference] {
        match self {
            PredecessorSet::Single(reference) => std::slice::from_ref(reference),
            PredecessorSet::Many(references) => references,
        }
    }

    pub fn contains(&self, reference: &FactReference) -> bool {
        self.references().contains(reference)
    }
}

impl From<FactReference> for PredecessorSet {
    fn from(reference: FactReference) -> Self {
        PredecessorSet::Single(reference)
    }
}

impl From<Vec<FactReference>> for PredecessorSet {
    fn from(references: Vec<FactReference>) -> Self {
        PredecessorSet::Many(references)
    }
}

/// An immutable, content-addressed record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fact {
    #[serde(rename = "type")]
    pub fact_type: String,
    pub hash: String,
    pub fields: Fields,
    pub predecessors: Predecessors,
}

impl Fact {
    /// Build a fact and compute its hash.
    pub fn new(fact_type: impl Into<String>, fields: Fields, predecessors: Predecessors) -> Self {
        let hash = compute_hash(&fields, &predecessors);
        Self {
            fact_type: fact_type.into(),
            hash,
            fields,
            predecessors,
        }
    }

    /// Assemble a fact from parts without recomputing the hash.
    ///
    /// Used for facts that arrive from elsewhere; check them with
    /// [`Fact::has_consistent_hash`] before trusting the hash.
    pub fn from_parts(
        fact_type: impl Into<String>,
        hash: impl Into<String>,
        fields: Fields,
        predecessors: Predecessors,
    ) -> Self {
        Self {
            fact_type: fact_type.into(),
            hash: hash.into(),
            fields,
            predecessors,
        }
    }

    /// The reference that identifies this fact.
    pub fn reference(&self) -> FactReference {
        FactReference::new(self.fact_type.clone(), self.hash.clone())
    }

    /// Whether the declared hash matches the canonical hash of the content.
    pub fn has_consistent_hash(&self) -> bool {
        compute_hash(&self.fields, &self.predecessors) == self.hash
    }

    /// Iterate over every predecessor reference with its role.
    pub fn predecessor_references(&self) -> impl Iterator<Item = (&str, &FactReference)> {
        self.predecessors.iter().flat_map(|(role, set)| {
            set.references()
                .iter()
                .map(move |reference| (role.as_str(), reference))
        })
    }

    /// The references recorded under `role`, if any.
    pub fn predecessors_in_role(&self, role: &str) -> &[FactReference] {
        self.predecessors
            .get(role)
            .map(PredecessorSet::references)
            .unwrap_or(&[])
    }
}
