//! # Factgate
//!
//! Authorization and signing in front of a content-addressed fact store.
//!
//! ## Overview
//!
//! Before a fact is stored it is:
//!
//! 1. checked against its declared hash,
//! 2. authorized for the acting identity, when a rule evaluator is
//!    configured, and
//! 3. signed with the acting identity's key.
//!
//! The [`Keystore`] issues one Ed25519 key pair per identity on first use.
//! The [`SigningPipeline`] runs authorize → sign → persist. An
//! [`Authentication`] picks the identity and composition for each execution
//! context, and [`FactGate`] wires all of it from a [`GateConfig`].
//!
//! ## Usage
//!
//! ```rust,no_run
//! use factgate::{AuthorizationRules, FactGate, RequestUser};
//!
//! async fn example() -> factgate::Result<()> {
//!     let gate = FactGate::builder()
//!         .rules(AuthorizationRules::new().any("Public").no("Secret"))
//!         .build()?;
//!
//!     let session = gate.with_session(RequestUser {
//!         provider: "google".into(),
//!         id: "1234".into(),
//!         display_name: "Ada".into(),
//!     });
//!     let login = session.login().await?;
//!     println!("logged in as {}", login.profile.display_name);
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `factgate::core` - facts, identities, canonicalization, signatures
//! - `factgate::store` - persistence contracts and reference stores
//! - `factgate::auth` - authorization gate and rules
//! - `factgate::sync` - forwarding to an upstream peer

pub mod authentication;
pub mod config;
pub mod error;
pub mod keystore;
pub mod peer;
pub mod pipeline;
pub mod server;

// Re-export component crates
pub use factgate_auth as auth;
pub use factgate_core as core;
pub use factgate_store as store;
pub use factgate_sync as sync;

// Re-export main types for convenience
pub use authentication::{
    Authentication, DeviceAuthentication, ExecutionContext, RemoteAuthentication, RequestUser,
    SessionAuthentication,
};
pub use config::{GateConfig, UnsignedFactPolicy};
pub use error::{GateError, Result};
pub use keystore::{identity_fact, Keystore, SignFailure, SignOutcome};
pub use peer::{error_code, PeerService};
pub use pipeline::SigningPipeline;
pub use server::{FactGate, FactGateBuilder};

// Re-export commonly used types
pub use factgate_auth::{AuthorizationGate, AuthorizationRules, RuleEvaluator};
pub use factgate_core::{
    Fact, FactEnvelope, FactReference, Identity, LoginResponse, Signature, DEVICE_FACT_TYPE,
    USER_FACT_TYPE,
};
pub use factgate_store::Query;
