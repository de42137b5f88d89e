//! Client for an upstream peer.

use std::sync::Arc;
use std::time::Duration;

use factgate_core::{Fact, FactEnvelope, FactReference, LoginResponse};
use factgate_store::Query;

use crate::error::{Result, SyncError};
use crate::messages::{decode, encode, Request, Response};
use crate::transport::Transport;

/// Default time to wait for an upstream response.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Typed requests to an upstream peer over a [`Transport`].
#[derive(Clone)]
pub struct RemoteClient {
    transport: Arc<dyn Transport>,
    timeout: Duration,
}

impl RemoteClient {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self::with_timeout(transport, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(transport: Arc<dyn Transport>, timeout: Duration) -> Self {
        Self { transport, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn login(&self) -> Result<LoginResponse> {
        match self.call(Request::Login).await? {
            Response::Login(login) => Ok(login),
            other => Err(unexpected("login", &other)),
        }
    }

    pub async fn save(&self, envelopes: Vec<FactEnvelope>) -> Result<Vec<FactEnvelope>> {
        match self.call(Request::Save { envelopes }).await? {
            Response::Saved(saved) => Ok(saved),
            other => Err(unexpected("saved", &other)),
        }
    }

    pub async fn load(&self, references: &[FactReference]) -> Result<Vec<Fact>> {
        let request = Request::Load {
            references: references.to_vec(),
        };
        match self.call(request).await? {
            Response::Facts(facts) => Ok(facts),
            other => Err(unexpected("facts", &other)),
        }
    }

    pub async fn query(&self, start: &FactReference, query: &Query) -> Result<Vec<Vec<FactReference>>> {
        let request = Request::Query {
            start: start.clone(),
            query: query.clone(),
        };
        match self.call(request).await? {
            Response::Paths(paths) => Ok(paths),
            other => Err(unexpected("paths", &other)),
        }
    }

    pub async fn read(&self, start: &[FactReference], query: &Query) -> Result<Vec<Fact>> {
        let request = Request::Read {
            start: start.to_vec(),
            query: query.clone(),
        };
        match self.call(request).await? {
            Response::Facts(facts) => Ok(facts),
            other => Err(unexpected("facts", &other)),
        }
    }

    /// Send one request, bounded by the configured timeout.
    async fn call(&self, request: Request) -> Result<Response> {
        let kind = request.kind();
        let frame = encode(&request)?;

        let reply = tokio::time::timeout(self.timeout, self.transport.request(frame))
            .await
            .map_err(|_| {
                tracing::warn!(request = kind, timeout = ?self.timeout, "upstream request timed out");
                SyncError::Timeout(self.timeout)
            })??;

        match decode::<Response>(&reply)? {
            Response::Error { code, message } => Err(SyncError::PeerError { code, message }),
            response => Ok(response),
        }
    }
}

fn unexpected(expected: &'static str, actual: &Response) -> SyncError {
    SyncError::UnexpectedResponse {
        expected,
        actual: actual.kind(),
    }
}
