//! Per-context compositions behind one capability surface.
//!
//! Each execution context gets exactly one [`Authentication`] variant:
//!
//! | context | variant | identity | saves |
//! |---|---|---|---|
//! | server acting as itself | [`DeviceAuthentication`] | device | straight to the feed |
//! | request with a user | [`SessionAuthentication`] | user | signing pipeline |
//! | forwarding | [`RemoteAuthentication`] | upstream's | upstream peer |
//!
//! The variants differ only in `login`, `local` and `save`. Everything else
//! is served by the feed they sit on.

mod device;
mod remote;
mod session;

use std::sync::Arc;

use serde::Deserialize;

use factgate_core::{Fact, FactEnvelope, FactReference, LoginResponse};
use factgate_store::{Channel, FactStore, Feed, Observable, Query};

use crate::error::{GateError, Result};

pub use device::DeviceAuthentication;
pub use remote::RemoteAuthentication;
pub use session::SessionAuthentication;

/// The user attached to an incoming request by the host's login layer.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestUser {
    pub provider: String,
    pub id: String,
    pub display_name: String,
}

/// Which composition a caller needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionContext {
    /// The server acting as its own device.
    Device,
    /// A request on behalf of a logged-in user.
    User(RequestUser),
    /// Forward everything to the configured upstream.
    Upstream,
}

/// One of the compositions.
#[derive(Clone)]
pub enum Authentication {
    Device(DeviceAuthentication),
    Session(SessionAuthentication),
    Remote(RemoteAuthentication),
}

impl Authentication {
    pub fn kind(&self) -> &'static str {
        match self {
            Authentication::Device(_) => "device",
            Authentication::Session(_) => "session",
            Authentication::Remote(_) => "remote",
        }
    }

    fn feed(&self) -> Arc<dyn Feed> {
        match self {
            Authentication::Device(device) => Arc::clone(&device.feed),
            Authentication::Session(session) => Arc::clone(session.feed()),
            Authentication::Remote(remote) => remote.feed(),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Identity
    // ─────────────────────────────────────────────────────────────────────────

    pub async fn login(&self) -> Result<LoginResponse> {
        match self {
            Authentication::Device(device) => device.login().await,
            Authentication::Session(session) => session.login().await,
            Authentication::Remote(remote) => remote.login().await,
        }
    }

    /// The device fact of this server.
    pub async fn local(&self) -> Result<Fact> {
        match self {
            Authentication::Device(device) => device.local().await,
            Authentication::Session(session) => session.local().await,
            Authentication::Remote(remote) => remote.local().await,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Persistence
    // ─────────────────────────────────────────────────────────────────────────

    pub async fn save(&self, envelopes: Vec<FactEnvelope>) -> Result<Vec<FactEnvelope>> {
        match self {
            Authentication::Device(device) => device.save(envelopes).await,
            Authentication::Session(session) => session.save(envelopes).await,
            Authentication::Remote(remote) => remote.save(envelopes).await,
        }
    }

    pub async fn query(&self, start: &FactReference, query: &Query) -> Result<Vec<Vec<FactReference>>> {
        Ok(self.feed().query(start, query).await?)
    }

    pub async fn read(&self, start: &[FactReference], query: &Query) -> Result<Vec<Fact>> {
        Ok(self.feed().read(start, query).await?)
    }

    pub async fn load(&self, references: &[FactReference]) -> Result<Vec<Fact>> {
        Ok(self.feed().load(references).await?)
    }

    /// Not provided by any composition.
    pub async fn which_exist(&self, _references: &[FactReference]) -> Result<Vec<FactReference>> {
        Err(GateError::NotImplemented("which_exist"))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Subscriptions
    // ─────────────────────────────────────────────────────────────────────────

    pub fn from(&self, start: &FactReference, query: &Query) -> Observable {
        self.feed().from(start, query)
    }

    pub fn add_channel(&self, start: &FactReference, query: &Query) -> Channel {
        self.feed().add_channel(start, query)
    }

    pub fn remove_channel(&self, channel: &Channel) {
        self.feed().remove_channel(channel)
    }

    /// Release subscriptions and channels.
    pub async fn close(&self) -> Result<()> {
        Ok(self.feed().close().await?)
    }
}
