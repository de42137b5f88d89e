//! The authorization gate.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use factgate_core::{Fact, FactReference};

use crate::error::Result;
use crate::evaluator::RuleEvaluator;

/// Filters candidate facts through an optional rule evaluator.
#[derive(Clone, Default)]
pub struct AuthorizationGate {
    evaluator: Option<Arc<dyn RuleEvaluator>>,
}

impl AuthorizationGate {
    /// A gate that authorizes every fact.
    pub fn open() -> Self {
        Self { evaluator: None }
    }

    /// A gate that defers to `evaluator`.
    pub fn with_evaluator(evaluator: Arc<dyn RuleEvaluator>) -> Self {
        Self {
            evaluator: Some(evaluator),
        }
    }

    pub fn is_policy_mode(&self) -> bool {
        self.evaluator.is_some()
    }

    /// Return the candidates the acting user may store.
    ///
    /// In no-policy mode the candidates come back unchanged. Otherwise
    /// candidates whose hash does not match their content are dropped, the
    /// evaluator decides on the rest, and its answer is narrowed to a
    /// duplicate-free subset of the candidates in their original order.
    pub async fn authorize(&self, user_fact: Option<&Fact>, candidates: Vec<Fact>) -> Result<Vec<Fact>> {
        let Some(evaluator) = &self.evaluator else {
            return Ok(candidates);
        };

        let total = candidates.len();
        let (candidates, inconsistent): (Vec<Fact>, Vec<Fact>) = candidates
            .into_iter()
            .partition(Fact::has_consistent_hash);
        for fact in &inconsistent {
            tracing::warn!(
                fact_type = %fact.fact_type,
                hash = %fact.hash,
                "dropping candidate whose hash does not match its content"
            );
        }

        let authorized = evaluator.authorize_facts(&candidates, user_fact).await?;
        let permitted = retain_authorized(candidates, &authorized);

        if permitted.len() < total {
            tracing::warn!(
                candidates = total,
                authorized = permitted.len(),
                "authorization dropped facts"
            );
        }
        Ok(permitted)
    }
}

/// Keep the candidates that appear in `authorized`, in candidate order,
/// each at most once.
///
/// A candidate matches only a fact equal to it in full, so a forged copy
/// sharing an authorized fact's reference is not kept in its place.
pub fn retain_authorized(candidates: Vec<Fact>, authorized: &[Fact]) -> Vec<Fact> {
    let mut allowed: HashMap<FactReference, Vec<&Fact>> = HashMap::new();
    for fact in authorized {
        allowed.entry(fact.reference()).or_default().push(fact);
    }
    let mut emitted = HashSet::new();
    candidates
        .into_iter()
        .filter(|fact| {
            let reference = fact.reference();
            let approved = allowed
                .get(&reference)
                .is_some_and(|facts| facts.iter().any(|a| *a == fact));
            approved && emitted.insert(reference)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AuthError;
    use crate::rules::AuthorizationRules;
    use async_trait::async_trait;
    use factgate_core::{Fields, Predecessors};
    use proptest::prelude::*;
    use serde_json::json;

    fn fact(fact_type: &str, n: u32) -> Fact {
        let fields: Fields = json!({ "n": n }).as_object().cloned().unwrap();
        Fact::new(fact_type, fields, Predecessors::new())
    }

    /// Returns a fixed answer regardless of the candidates.
    struct Fixed(Vec<Fact>);

    #[async_trait]
    impl RuleEvaluator for Fixed {
        async fn authorize_facts(&self, _: &[Fact], _: Option<&Fact>) -> Result<Vec<Fact>> {
            Ok(self.0.clone())
        }
    }

    struct Failing;

    #[async_trait]
    impl RuleEvaluator for Failing {
        async fn authorize_facts(&self, _: &[Fact], _: Option<&Fact>) -> Result<Vec<Fact>> {
            Err(AuthError::Evaluator("rules unavailable".into()))
        }
    }

    #[tokio::test]
    async fn test_open_gate_is_identity() {
        let gate = AuthorizationGate::open();
        let candidates = vec![fact("A", 1), fact("B", 2)];
        assert!(!gate.is_policy_mode());
        assert_eq!(gate.authorize(None, candidates.clone()).await.unwrap(), candidates);
    }

    #[tokio::test]
    async fn test_policy_drops_rejected_facts() {
        let rules = AuthorizationRules::new().any("Public").no("Secret");
        let gate = AuthorizationGate::with_evaluator(Arc::new(rules));
        let public = fact("Public", 1);
        let secret = fact("Secret", 2);

        let permitted = gate
            .authorize(None, vec![public.clone(), secret])
            .await
            .unwrap();
        assert_eq!(permitted, vec![public]);
    }

    #[tokio::test]
    async fn test_evaluator_output_is_narrowed_to_candidates() {
        let a = fact("A", 1);
        let b = fact("B", 2);
        let stranger = fact("X", 9);
        let gate = AuthorizationGate::with_evaluator(Arc::new(Fixed(vec![
            b.clone(),
            stranger,
            a.clone(),
            b.clone(),
        ])));

        let permitted = gate.authorize(None, vec![a.clone(), b.clone()]).await.unwrap();
        assert_eq!(permitted, vec![a, b]);
    }

    #[test]
    fn test_forged_copy_does_not_take_the_approved_slot() {
        let genuine = fact("A", 1);
        let mut forged = fact("A", 2);
        forged.hash = genuine.hash.clone();

        let kept = retain_authorized(vec![forged, genuine.clone()], &[genuine.clone()]);
        assert_eq!(kept, vec![genuine]);
    }

    #[tokio::test]
    async fn test_inconsistent_candidates_never_reach_the_evaluator() {
        let genuine = fact("A", 1);
        let mut forged = fact("A", 2);
        forged.hash = genuine.hash.clone();

        // Approves whatever it is shown.
        struct Echo;

        #[async_trait]
        impl RuleEvaluator for Echo {
            async fn authorize_facts(&self, facts: &[Fact], _: Option<&Fact>) -> Result<Vec<Fact>> {
                assert!(facts.iter().all(Fact::has_consistent_hash));
                Ok(facts.to_vec())
            }
        }

        let gate = AuthorizationGate::with_evaluator(Arc::new(Echo));
        let permitted = gate.authorize(None, vec![forged.clone()]).await.unwrap();
        assert!(permitted.is_empty());

        let permitted = gate.authorize(None, vec![forged, genuine.clone()]).await.unwrap();
        assert_eq!(permitted, vec![genuine]);
    }

    #[tokio::test]
    async fn test_evaluator_failure_propagates() {
        let gate = AuthorizationGate::with_evaluator(Arc::new(Failing));
        let result = gate.authorize(None, vec![fact("A", 1)]).await;
        assert!(matches!(result, Err(AuthError::Evaluator(_))));
    }

    proptest! {
        #[test]
        fn prop_result_is_ordered_subset(
            candidates in prop::collection::vec(0u32..20, 0..12),
            authorized in prop::collection::vec(0u32..30, 0..12),
        ) {
            let candidates: Vec<Fact> = candidates.into_iter().map(|n| fact("T", n)).collect();
            let authorized: Vec<Fact> = authorized.into_iter().map(|n| fact("T", n)).collect();

            let result = retain_authorized(candidates.clone(), &authorized);

            // Every result is a candidate the evaluator named.
            for fact in &result {
                prop_assert!(candidates.contains(fact));
                prop_assert!(authorized.contains(fact));
            }

            // No duplicates.
            let unique: HashSet<FactReference> = result.iter().map(Fact::reference).collect();
            prop_assert_eq!(unique.len(), result.len());

            // Candidate order is preserved.
            let positions: Vec<usize> = result
                .iter()
                .map(|fact| candidates.iter().position(|c| c == fact).unwrap())
                .collect();
            prop_assert!(positions.windows(2).all(|w| w[0] < w[1]));
        }
    }
}
