//! # Factgate Authorization
//!
//! The gate that sits in front of persistence.
//!
//! ## Overview
//!
//! Given the acting user's identity fact and a batch of candidate facts,
//! the [`AuthorizationGate`] returns the subset that may be stored. The
//! decision itself belongs to a [`RuleEvaluator`]; this crate only defines
//! that contract and enforces its output:
//!
//! - the result is a subset of the candidates
//! - candidate order is preserved
//! - no duplicates are introduced
//!
//! A gate without an evaluator is in no-policy mode and authorizes
//! everything.
//!
//! [`AuthorizationRules`] is a small declarative evaluator keyed by fact
//! type, enough for hosts with simple policies and for tests.

pub mod error;
pub mod evaluator;
pub mod gate;
pub mod rules;

pub use error::{AuthError, Result};
pub use evaluator::RuleEvaluator;
pub use gate::{retain_authorized, AuthorizationGate};
pub use rules::{AuthorizationRules, Rule};
