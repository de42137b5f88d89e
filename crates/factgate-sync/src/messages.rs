//! Request and response frames exchanged with an upstream peer.
//!
//! Frames are CBOR-encoded with ciborium. One request produces exactly one
//! response; failures travel as [`Response::Error`].

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use factgate_core::{Fact, FactEnvelope, FactReference, LoginResponse};
use factgate_store::Query;

use crate::error::{Result, SyncError};

/// Requests a forwarding peer can make.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Request {
    /// Identify the user behind the connection.
    Login,
    /// Persist envelopes.
    Save { envelopes: Vec<FactEnvelope> },
    /// Load facts and their ancestors.
    Load { references: Vec<FactReference> },
    /// Walk a query from one start.
    Query { start: FactReference, query: Query },
    /// Walk a query from several starts and return the facts reached.
    Read {
        start: Vec<FactReference>,
        query: Query,
    },
}

impl Request {
    pub fn kind(&self) -> &'static str {
        match self {
            Request::Login => "login",
            Request::Save { .. } => "save",
            Request::Load { .. } => "load",
            Request::Query { .. } => "query",
            Request::Read { .. } => "read",
        }
    }
}

/// Responses to [`Request`]s.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Response {
    Login(LoginResponse),
    Saved(Vec<FactEnvelope>),
    Facts(Vec<Fact>),
    Paths(Vec<Vec<FactReference>>),
    Error { code: ErrorCode, message: String },
}

impl Response {
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Response::Error {
            code,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Response::Login(_) => "login",
            Response::Saved(_) => "saved",
            Response::Facts(_) => "facts",
            Response::Paths(_) => "paths",
            Response::Error { .. } => "error",
        }
    }
}

/// Error codes carried by [`Response::Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u16)]
pub enum ErrorCode {
    /// Unknown/unspecified error.
    Unknown = 0,
    /// The request frame could not be decoded.
    Malformed = 1,
    /// The peer has no logged-in user.
    NotLoggedIn = 2,
    /// The peer does not support the operation.
    NotImplemented = 3,
    /// The acting identity was never issued a key.
    UnknownIdentity = 4,
    /// Authorization or signing could not proceed.
    Unauthorized = 5,
    /// Internal error on peer.
    InternalError = 6,
}

/// Encode a frame as CBOR.
pub fn encode<T: Serialize>(value: &T) -> Result<Bytes> {
    let mut buf = Vec::new();
    ciborium::into_writer(value, &mut buf).map_err(|e| SyncError::Codec(e.to_string()))?;
    Ok(Bytes::from(buf))
}

/// Decode a CBOR frame.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    ciborium::from_reader(bytes).map_err(|e| SyncError::Codec(e.to_string()))
}
