//! # Factgate Testkit
//!
//! Testing utilities for Factgate.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: Facts with known canonical strings and hashes
//! - **Generators**: Proptest strategies for property-based testing
//! - **Fixtures**: Gates over inspectable memory stores, plus fact helpers
//!
//! ## Golden Vectors
//!
//! Golden vectors pin the canonical encoding that content addressing and
//! signing both depend on:
//!
//! ```rust
//! use factgate_testkit::vectors::all_vectors;
//!
//! for vector in all_vectors() {
//!     assert_eq!(vector.fact().hash, vector.expected_hash);
//! }
//! ```
//!
//! ## Property Testing
//!
//! Use the generators with proptest:
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use factgate_testkit::generators::FactParams;
//!
//! proptest! {
//!     #[test]
//!     fn hash_is_consistent(params: FactParams) {
//!         prop_assert!(params.fact().has_consistent_hash());
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust
//! use factgate_testkit::fixtures::{fact, TestFixture};
//!
//! let fixture = TestFixture::new();
//! let gate = fixture.open_gate().unwrap();
//! let blog = fact("Blog", serde_json::json!({ "name": "notes" }));
//! # let _ = (gate, blog);
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{empty_fact, fact, fact_with, identity_of, tampered_fact, user, TestFixture};
pub use generators::{reversed, FactParams};
pub use vectors::{all_vectors, verify_all_vectors, GoldenVector};
