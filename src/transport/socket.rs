//! Socket primitive the engine runs on.
//!
//! The engine only needs a message sink and a message stream. Anything that
//! can produce that pair from a URL implements [`Connector`];
//! [`WebSocketConnector`] is the production implementation.

// ============================================================================
// Imports
// ============================================================================

use std::pin::Pin;

use async_trait::async_trait;
use futures_util::{Sink, Stream, StreamExt};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tracing::debug;
use url::Url;

use crate::error::Result;

// ============================================================================
// Types
// ============================================================================

/// Outbound half of a socket.
pub type FrameSink = Pin<Box<dyn Sink<Message, Error = WsError> + Send>>;

/// Inbound half of a socket.
pub type FrameStream = Pin<Box<dyn Stream<Item = std::result::Result<Message, WsError>> + Send>>;

// ============================================================================
// Socket
// ============================================================================

/// An open, message-based, full-duplex socket.
pub struct Socket {
    /// Frames to the server.
    pub sink: FrameSink,
    /// Frames from the server. Ends when the socket closes.
    pub stream: FrameStream,
}

impl Socket {
    /// Wraps a sink/stream pair.
    pub fn new<S, R>(sink: S, stream: R) -> Self
    where
        S: Sink<Message, Error = WsError> + Send + 'static,
        R: Stream<Item = std::result::Result<Message, WsError>> + Send + 'static,
    {
        Self {
            sink: Box::pin(sink),
            stream: Box::pin(stream),
        }
    }
}

// ============================================================================
// Connector
// ============================================================================

/// Opens sockets for the engine.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Opens a socket to `url`.
    ///
    /// Resolves once the socket reports "open".
    async fn open(&self, url: &Url) -> Result<Socket>;
}

// ============================================================================
// WebSocketConnector
// ============================================================================

/// Opens WebSocket client connections with `tokio-tungstenite`.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketConnector;

#[async_trait]
impl Connector for WebSocketConnector {
    async fn open(&self, url: &Url) -> Result<Socket> {
        let (ws_stream, response) = connect_async(url.as_str()).await?;

        debug!(%url, status = %response.status(), "WebSocket handshake completed");

        let (sink, stream) = ws_stream.split();
        Ok(Socket::new(sink, stream))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use tokio::net::TcpListener;

    use crate::error::Error;

    #[tokio::test]
    async fn test_refused_handshake_is_websocket_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let url = Url::parse(&format!("ws://{addr}/ws")).unwrap();
        let err = match WebSocketConnector.open(&url).await {
            Ok(_) => panic!("nothing is listening on {addr}"),
            Err(e) => e,
        };

        assert!(matches!(err, Error::WebSocket(_)));
        assert!(err.is_connection_error());
    }
}
