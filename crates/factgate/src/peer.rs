//! The upstream side of forwarding.
//!
//! A [`PeerService`] answers [`Request`]s from a forwarding peer by invoking
//! a session composition. Peer saves always run through the signing
//! pipeline.

use async_trait::async_trait;

use factgate_sync::{ErrorCode, PeerHandler, Request, Response};

use crate::authentication::{Authentication, SessionAuthentication};
use crate::error::GateError;

/// Serves remote requests as one session user.
pub struct PeerService {
    authentication: Authentication,
}

impl PeerService {
    pub fn new(session: SessionAuthentication) -> Self {
        Self {
            authentication: Authentication::Session(session),
        }
    }
}

/// The wire code for a gate error.
pub fn error_code(error: &GateError) -> ErrorCode {
    match error {
        GateError::NotLoggedIn => ErrorCode::NotLoggedIn,
        GateError::NotImplemented(_) | GateError::LocalUnavailable | GateError::NoUpstream => {
            ErrorCode::NotImplemented
        }
        GateError::UnknownIdentity(_) => ErrorCode::UnknownIdentity,
        GateError::KeystoreNotFound(_) | GateError::Authorization(_) => ErrorCode::Unauthorized,
        _ => ErrorCode::InternalError,
    }
}

#[async_trait]
impl PeerHandler for PeerService {
    async fn handle(&self, request: Request) -> Response {
        let kind = request.kind();
        let auth = &self.authentication;
        let result = match request {
            Request::Login => auth.login().await.map(Response::Login),
            Request::Save { envelopes } => auth.save(envelopes).await.map(Response::Saved),
            Request::Load { references } => auth.load(&references).await.map(Response::Facts),
            Request::Query { start, query } => auth.query(&start, &query).await.map(Response::Paths),
            Request::Read { start, query } => auth.read(&start, &query).await.map(Response::Facts),
        };

        result.unwrap_or_else(|e| {
            tracing::warn!(request = kind, composition = auth.kind(), error = %e, "peer request failed");
            Response::error(error_code(&e), e.to_string())
        })
    }
}
