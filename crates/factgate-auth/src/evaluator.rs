//! The rule evaluator contract.

use async_trait::async_trait;

use factgate_core::Fact;

use crate::error::Result;

/// Decides which candidate facts an acting user may store.
///
/// `user_fact` is the acting user's identity fact, or `None` for an
/// anonymous caller. Implementations return the authorized facts; anything
/// returned that was not a candidate is ignored by the gate.
#[async_trait]
pub trait RuleEvaluator: Send + Sync {
    async fn authorize_facts(&self, candidates: &[Fact], user_fact: Option<&Fact>)
        -> Result<Vec<Fact>>;
}
