//! Path queries over the fact graph.
//!
//! A query is a sequence of steps walked from a starting fact. Each step
//! either follows a predecessor role backwards or finds successors of a
//! given type that point at the current fact through a role. The result of
//! a query is every path that completes all steps.

use serde::{Deserialize, Serialize};

/// One hop through the fact graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Step {
    /// Follow the predecessors recorded under `role`.
    Predecessor { role: String },
    /// Find facts of `fact_type` that list the current fact under `role`.
    Successor { fact_type: String, role: String },
}

/// A sequence of steps.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Query {
    pub steps: Vec<Step>,
}

impl Query {
    /// The empty query; matches its starting fact.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a predecessor step.
    pub fn predecessor(mut self, role: impl Into<String>) -> Self {
        self.steps.push(Step::Predecessor { role: role.into() });
        self
    }

    /// Append a successor step.
    pub fn successor(mut self, fact_type: impl Into<String>, role: impl Into<String>) -> Self {
        self.steps.push(Step::Successor {
            fact_type: fact_type.into(),
            role: role.into(),
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}
