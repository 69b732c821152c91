//! Scripted in-memory sockets for engine tests.
//!
//! [`mock`] returns a connector for the client and a [`MockServer`] that
//! accepts every socket the connector opens. Each accepted socket is a
//! [`ServerSide`] that reads the client's frames and writes frames back.

use std::future::pending;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::{sink, stream};
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use url::Url;

use crate::client::{RpcClient, TransportOptions};
use crate::error::{Error, Result};

use super::socket::{Connector, Socket};

// ============================================================================
// Types
// ============================================================================

type ServerFrame = std::result::Result<Message, WsError>;

#[derive(Default)]
struct Script {
    opens: usize,
    refuse: usize,
    hang: usize,
}

/// Creates a connected connector/server pair.
pub(crate) fn mock() -> (Arc<MockConnector>, MockServer) {
    let script = Arc::new(Mutex::new(Script::default()));
    let (accepted_tx, accepted_rx) = mpsc::unbounded_channel();

    let connector = Arc::new(MockConnector {
        script: Arc::clone(&script),
        accepted: accepted_tx,
    });
    let server = MockServer {
        script,
        accepted: accepted_rx,
    };
    (connector, server)
}

/// Client connected to a fresh mock server, with heartbeat and
/// reconnection disabled.
pub(crate) async fn connected_client() -> (RpcClient, MockServer, ServerSide) {
    let (connector, mut server) = mock();
    let client = RpcClient::with_connector(
        "ws://camera.test/ws",
        TransportOptions::one_shot(),
        connector,
    )
    .expect("client");
    client.connect().await.expect("connect");
    let side = server.accept().await;
    (client, server, side)
}

// ============================================================================
// MockConnector
// ============================================================================

pub(crate) struct MockConnector {
    script: Arc<Mutex<Script>>,
    accepted: mpsc::UnboundedSender<ServerSide>,
}

#[async_trait]
impl Connector for MockConnector {
    async fn open(&self, _url: &Url) -> Result<Socket> {
        let (refused, hung) = {
            let mut script = self.script.lock();
            script.opens += 1;
            if script.refuse > 0 {
                script.refuse -= 1;
                (true, false)
            } else if script.hang > 0 {
                script.hang -= 1;
                (false, true)
            } else {
                (false, false)
            }
        };

        if refused {
            return Err(Error::connection("connection refused"));
        }
        if hung {
            pending::<()>().await;
        }

        let (client_tx, client_rx) = mpsc::unbounded_channel::<Message>();
        let (server_tx, server_rx) = mpsc::unbounded_channel::<ServerFrame>();

        let sink = sink::unfold(client_tx, |tx, message: Message| async move {
            tx.send(message).map_err(|_| WsError::ConnectionClosed)?;
            Ok::<_, WsError>(tx)
        });
        let stream = stream::unfold(server_rx, |mut rx| async move {
            rx.recv().await.map(|frame| (frame, rx))
        });

        let side = ServerSide {
            incoming: client_rx,
            outgoing: Some(server_tx),
        };
        self.accepted
            .send(side)
            .map_err(|_| Error::connection("mock server dropped"))?;

        Ok(Socket::new(sink, stream))
    }
}

// ============================================================================
// MockServer
// ============================================================================

pub(crate) struct MockServer {
    script: Arc<Mutex<Script>>,
    accepted: mpsc::UnboundedReceiver<ServerSide>,
}

impl MockServer {
    /// Refuses the next `n` open attempts.
    pub(crate) fn refuse_next(&self, n: usize) {
        self.script.lock().refuse = n;
    }

    /// Refuses every open attempt from now on.
    pub(crate) fn refuse_all(&self) {
        self.refuse_next(usize::MAX);
    }

    /// Makes the next `n` open attempts never complete.
    pub(crate) fn hang_next(&self, n: usize) {
        self.script.lock().hang = n;
    }

    /// Open attempts seen so far, including refused ones.
    pub(crate) fn opens(&self) -> usize {
        self.script.lock().opens
    }

    /// Waits for the next opened socket.
    pub(crate) async fn accept(&mut self) -> ServerSide {
        self.accepted.recv().await.expect("connector dropped")
    }
}

// ============================================================================
// ServerSide
// ============================================================================

/// Server end of one in-memory socket.
pub(crate) struct ServerSide {
    incoming: mpsc::UnboundedReceiver<Message>,
    outgoing: Option<mpsc::UnboundedSender<ServerFrame>>,
}

impl ServerSide {
    /// Next frame from the client, or `None` once the client dropped it.
    pub(crate) async fn recv(&mut self) -> Option<Message> {
        self.incoming.recv().await
    }

    /// Next text frame from the client, parsed as JSON.
    pub(crate) async fn recv_json(&mut self) -> Value {
        loop {
            match self.recv().await.expect("client closed the socket") {
                Message::Text(text) => {
                    return serde_json::from_str(text.as_str()).expect("client sent invalid JSON");
                }
                Message::Close(frame) => panic!("unexpected close frame: {frame:?}"),
                _ => {}
            }
        }
    }

    /// Next request from the client. Returns `(id, method, params)`.
    pub(crate) async fn recv_request(&mut self) -> (u64, String, Value) {
        let request = self.recv_json().await;
        assert_eq!(request["jsonrpc"], "2.0");
        let id = request["id"].as_u64().expect("request without numeric id");
        let method = request["method"].as_str().expect("request without method").to_string();
        (id, method, request["params"].clone())
    }

    /// Waits for the client's close frame.
    pub(crate) async fn recv_close(&mut self) -> Option<CloseFrame> {
        loop {
            match self.recv().await? {
                Message::Close(frame) => return frame,
                _ => continue,
            }
        }
    }

    /// Waits until the client drops its end.
    pub(crate) async fn closed(&mut self) {
        while self.recv().await.is_some() {}
    }

    pub(crate) fn send_raw(&self, text: &str) {
        self.send(Message::Text(text.to_string().into()));
    }

    pub(crate) fn send_json(&self, value: Value) {
        self.send_raw(&value.to_string());
    }

    pub(crate) fn respond(&self, id: u64, result: Value) {
        self.send_json(json!({ "jsonrpc": "2.0", "id": id, "result": result }));
    }

    pub(crate) fn respond_error(&self, id: u64, code: i64, message: &str) {
        self.send_json(json!({
            "jsonrpc": "2.0",
            "id": id,
            "error": { "code": code, "message": message }
        }));
    }

    pub(crate) fn notify(&self, method: &str, params: Value) {
        self.send_json(json!({ "jsonrpc": "2.0", "method": method, "params": params }));
    }

    /// Sends a close frame with `code`.
    pub(crate) fn close(&self, code: u16) {
        self.send(Message::Close(Some(CloseFrame {
            code: CloseCode::from(code),
            reason: "server closing".into(),
        })));
    }

    /// Delivers a socket error to the client.
    pub(crate) fn fail(&self) {
        if let Some(tx) = &self.outgoing {
            let _ = tx.send(Err(WsError::ConnectionClosed));
        }
    }

    /// Ends the client's stream without a close frame.
    pub(crate) fn hang_up(&mut self) {
        self.outgoing = None;
    }

    fn send(&self, message: Message) {
        if let Some(tx) = &self.outgoing {
            let _ = tx.send(Ok(message));
        }
    }
}
