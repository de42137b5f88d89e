//! # Factgate Sync
//!
//! Forwarding to an upstream peer.
//!
//! ## Overview
//!
//! A server without local authority forwards its work to an upstream
//! peer. This crate carries that conversation:
//!
//! - [`Request`] / [`Response`] frames, CBOR-encoded
//! - the [`Transport`] trait that moves frames, and the [`PeerHandler`]
//!   trait that answers them on the far side
//! - [`RemoteClient`], typed calls bounded by a timeout
//! - [`TransientFork`], a feed that writes through to the upstream and
//!   keeps a transient local copy for subscriptions
//!
//! ## Message Flow
//!
//! ```text
//! Fork                               Upstream
//!   |-------- Save ------------------->|
//!   |<------- Saved -------------------|
//!   |-------- Query ------------------>|
//!   |<------- Paths -------------------|
//!   |-------- Load ------------------->|
//!   |<------- Facts -------------------|
//! ```

pub mod client;
pub mod error;
pub mod fork;
pub mod messages;
pub mod transport;

pub use client::{RemoteClient, DEFAULT_TIMEOUT};
pub use error::{Result, SyncError};
pub use fork::TransientFork;
pub use messages::{decode, encode, ErrorCode, Request, Response};
pub use transport::{memory::MemoryTransport, PeerHandler, Transport};
