//! # Factgate Store
//!
//! Persistence contracts for Factgate and the reference implementations the
//! rest of the workspace runs against.
//!
//! ## Overview
//!
//! Facts are persisted through the [`FactStore`] trait. A [`Feed`] adds the
//! capabilities sessions need on top of persistence: subscriptions
//! ([`Observable`]) and upstream interest registration ([`Channel`]). Signing
//! keys live in a [`KeyTable`], one row per identity.
//!
//! ## Key Types
//!
//! - [`FactStore`] - save / load / query / read / which_exist
//! - [`Feed`] - a fact store plus subscriptions and channels
//! - [`KeyTable`] - the per-identity key rows with atomic insert-if-absent
//! - [`MemoryFactStore`] - content-addressed in-memory fact store
//! - [`LocalFeed`] - a [`Feed`] over any [`FactStore`]
//! - [`MemoryKeyTable`] / [`SqliteKeyTable`] - key table implementations
//!
//! ## Design Notes
//!
//! - **Idempotent saves**: saving a fact that already exists is a no-op that
//!   still returns it; new signatures are appended.
//! - **One key row per identity**: `insert_if_absent` is atomic, backed in
//!   SQLite by `UNIQUE(provider, user_id)` inside an immediate transaction.
//! - **Duplicate rows are corruption**: lookups that see more than one row
//!   fail with [`StoreError::DuplicateKey`].

pub mod error;
pub mod feed;
pub mod memory;
pub mod migration;
pub mod query;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use feed::{Channel, LocalFeed, Observable};
pub use memory::{MemoryFactStore, MemoryKeyTable};
pub use query::{Query, Step};
pub use sqlite::SqliteKeyTable;
pub use traits::{FactStore, Feed, KeyRecord, KeyTable};
