//! # Factgate Core
//!
//! Pure primitives for Factgate: facts, identities, canonicalization and
//! signatures.
//!
//! This crate contains no I/O, no storage, no networking. It is pure
//! computation over content-addressed facts.
//!
//! ## Key Types
//!
//! - [`Fact`] - An immutable, content-addressed record
//! - [`FactReference`] - A weak `(type, hash)` pointer to a fact
//! - [`FactEnvelope`] - A fact together with the signatures collected for it
//! - [`Identity`] - An external principal (provider + id)
//! - [`SigningKeyPair`] - An Ed25519 key pair that round-trips through PEM
//!
//! ## Canonicalization
//!
//! Fact hashes are base64(SHA-512) over a canonical JSON rendering of the
//! fields and predecessors. See the [`canonical`] module.

pub mod canonical;
pub mod crypto;
pub mod envelope;
pub mod error;
pub mod fact;
pub mod identity;
pub mod validation;

pub use canonical::{canonical_string, canonicalize, compute_hash, content_digest, fact_digest};
pub use crypto::{verify_digest, Sha512Digest, SigningKeyPair};
pub use envelope::{FactEnvelope, Signature};
pub use error::{CoreError, Result};
pub use fact::{Fact, FactReference, Fields, PredecessorSet, Predecessors};
pub use identity::{Identity, LoginResponse, Profile};
pub use validation::{verify_envelope, verify_fact_hash, verify_signature};

/// Fact type of the identity fact that represents a logged-in user.
pub const USER_FACT_TYPE: &str = "Jinaga.User";

/// Fact type of the identity fact that represents a device.
pub const DEVICE_FACT_TYPE: &str = "Jinaga.Device";
