//! Transport abstraction for forwarding requests upstream.
//!
//! The transport moves opaque frames. Implementations may use HTTP,
//! WebSockets, or anything else with request/response semantics.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;
use crate::messages::{Request, Response};

/// Sends a request frame and waits for the matching response frame.
///
/// Implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait Transport: Send + Sync {
    async fn request(&self, frame: Bytes) -> Result<Bytes>;
}

/// The serving side of a transport: answers decoded requests.
#[async_trait]
pub trait PeerHandler: Send + Sync {
    async fn handle(&self, request: Request) -> Response;
}

/// A simple in-memory transport for testing and in-process peers.
///
/// Uses channels to simulate a request/response connection.
pub mod memory {
    use super::*;
    use std::sync::Arc;
    use tokio::sync::{mpsc, oneshot};

    use crate::error::SyncError;
    use crate::messages::{decode, encode, ErrorCode};

    const CHANNEL_CAPACITY: usize = 256;

    /// A frame and the slot its response goes into.
    type Call = (Bytes, oneshot::Sender<Bytes>);

    /// In-memory transport connected to a [`PeerHandler`].
    #[derive(Clone)]
    pub struct MemoryTransport {
        sender: mpsc::Sender<Call>,
    }

    impl MemoryTransport {
        /// Start serving `handler` and return a transport connected to it.
        ///
        /// Must be called from within a tokio runtime. Each request is
        /// handled on its own task. The serving loop ends when every clone
        /// of the transport is dropped.
        pub fn serve(handler: Arc<dyn PeerHandler>) -> Self {
            let (sender, mut receiver) = mpsc::channel::<Call>(CHANNEL_CAPACITY);

            tokio::spawn(async move {
                while let Some((frame, reply)) = receiver.recv().await {
                    let handler = Arc::clone(&handler);
                    tokio::spawn(async move {
                        let response = match decode::<Request>(&frame) {
                            Ok(request) => handler.handle(request).await,
                            Err(e) => Response::error(ErrorCode::Malformed, e.to_string()),
                        };
                        match encode(&response) {
                            // The caller may have given up waiting.
                            Ok(bytes) => {
                                let _ = reply.send(bytes);
                            }
                            Err(e) => tracing::error!(error = %e, "failed to encode response"),
                        }
                    });
                }
            });

            Self { sender }
        }
    }

    #[async_trait]
    impl Transport for MemoryTransport {
        async fn request(&self, frame: Bytes) -> Result<Bytes> {
            let (reply, response) = oneshot::channel();
            self.sender
                .send((frame, reply))
                .await
                .map_err(|_| SyncError::TransportError("peer disconnected".into()))?;
            response
                .await
                .map_err(|_| SyncError::TransportError("peer dropped the request".into()))
        }
    }
}
