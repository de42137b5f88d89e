//! Declarative authorization rules keyed by fact type.
//!
//! Each fact type gets one or more rules; a fact is authorized when any
//! rule for its type allows it. Types without rules are rejected.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use factgate_core::Fact;

use crate::error::Result;
use crate::evaluator::RuleEvaluator;

/// A predicate over a candidate fact and the acting user fact.
pub type Predicate = Arc<dyn Fn(&Fact, Option<&Fact>) -> bool + Send + Sync>;

/// A single authorization rule.
#[derive(Clone)]
pub enum Rule {
    /// Anyone, including anonymous callers.
    Any,
    /// Nobody.
    Never,
    /// The acting user fact must be a predecessor of the candidate in `role`.
    ByPredecessor(String),
    /// A custom predicate.
    When(Predicate),
}

impl Rule {
    fn allows(&self, fact: &Fact, user_fact: Option<&Fact>) -> bool {
        match self {
            Rule::Any => true,
            Rule::Never => false,
            Rule::ByPredecessor(role) => match user_fact {
                Some(user) => fact
                    .predecessors_in_role(role)
                    .contains(&user.reference()),
                None => false,
            },
            Rule::When(predicate) => predicate(fact, user_fact),
        }
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rule::Any => write!(f, "Any"),
            Rule::Never => write!(f, "Never"),
            Rule::ByPredecessor(role) => write!(f, "ByPredecessor({role})"),
            Rule::When(_) => write!(f, "When(..)"),
        }
    }
}

/// Rules for every fact type a host accepts.
///
/// ```
/// use factgate_auth::AuthorizationRules;
///
/// let rules = AuthorizationRules::new()
///     .any("Blog")
///     .by_predecessor("Blog.Post", "author")
///     .no("Blog.Secret");
/// assert!(rules.covers("Blog.Post"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct AuthorizationRules {
    rules: HashMap<String, Vec<Rule>>,
}

impl AuthorizationRules {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a rule for a fact type.
    pub fn with_rule(mut self, fact_type: impl Into<String>, rule: Rule) -> Self {
        self.rules.entry(fact_type.into()).or_default().push(rule);
        self
    }

    /// Anyone may store facts of this type.
    pub fn any(self, fact_type: impl Into<String>) -> Self {
        self.with_rule(fact_type, Rule::Any)
    }

    /// Nobody may store facts of this type.
    pub fn no(self, fact_type: impl Into<String>) -> Self {
        self.with_rule(fact_type, Rule::Never)
    }

    /// Only the user named in `role` may store facts of this type.
    pub fn by_predecessor(self, fact_type: impl Into<String>, role: impl Into<String>) -> Self {
        self.with_rule(fact_type, Rule::ByPredecessor(role.into()))
    }

    /// Facts of this type are authorized when `predicate` holds.
    pub fn when<F>(self, fact_type: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&Fact, Option<&Fact>) -> bool + Send + Sync + 'static,
    {
        self.with_rule(fact_type, Rule::When(Arc::new(predicate)))
    }

    /// Whether any rule is registered for the type.
    pub fn covers(&self, fact_type: &str) -> bool {
        self.rules.contains_key(fact_type)
    }

    /// Whether a single fact is authorized.
    pub fn allows(&self, fact: &Fact, user_fact: Option<&Fact>) -> bool {
        self.rules
            .get(&fact.fact_type)
            .map(|rules| rules.iter().any(|rule| rule.allows(fact, user_fact)))
            .unwrap_or(false)
    }
}

#[async_trait]
impl RuleEvaluator for AuthorizationRules {
    async fn authorize_facts(
        &self,
        candidates: &[Fact],
        user_fact: Option<&Fact>,
    ) -> Result<Vec<Fact>> {
        Ok(candidates
            .iter()
            .filter(|fact| self.allows(fact, user_fact))
            .cloned()
            .collect())
    }
}
