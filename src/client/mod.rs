//! Public client handle.
//!
//! [`RpcClient`] is the contract every service builds on: connection
//! control, correlated calls, one-way notifications, state queries and
//! observer registration. Handles are cheap to clone; all clones drive the
//! same connection. The connection is torn down when the last clone drops.
//!
//! # Example
//!
//! ```no_run
//! use camera_rpc::RpcClient;
//! use serde_json::json;
//!
//! # async fn example() -> camera_rpc::Result<()> {
//! let client = RpcClient::new("ws://localhost:8002/ws")?;
//! client.connect().await?;
//!
//! let status = client
//!     .call("get_camera_status", Some(json!({ "device": "/dev/video0" })))
//!     .await?;
//! println!("{status}");
//!
//! client.disconnect("done");
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Fluent client builder.
pub mod builder;

/// Transport tuning options.
pub mod options;


// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::debug;
use url::Url;

use crate::error::{Error, Result};
use crate::identifiers::SubscriptionId;
use crate::transport::engine::{Command, Engine, Shared};
use crate::transport::{ConnectionState, Connector, EventKind, TransportEvent, TransportStats};

pub use builder::ClientBuilder;
pub use options::TransportOptions;

// ============================================================================
// RpcClient
// ============================================================================

/// Handle to a JSON-RPC connection.
#[derive(Clone)]
pub struct RpcClient {
    inner: Arc<Inner>,
}

struct Inner {
    commands: mpsc::UnboundedSender<Command>,
    state_tx: Arc<watch::Sender<ConnectionState>>,
    state: watch::Receiver<ConnectionState>,
    shared: Arc<Shared>,
    request_timeout: Duration,
}

impl fmt::Debug for RpcClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RpcClient")
            .field("state", &self.state())
            .field("request_timeout", &self.inner.request_timeout)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl RpcClient {
    /// Creates a builder.
    #[inline]
    #[must_use]
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Creates a client for `url` with default options.
    ///
    /// # Errors
    ///
    /// See [`ClientBuilder::build`].
    pub fn new(url: &str) -> Result<Self> {
        Self::builder().url(url).build()
    }

    /// Creates a client that opens sockets through `connector`.
    ///
    /// # Errors
    ///
    /// See [`ClientBuilder::build`].
    pub fn with_connector(
        url: &str,
        options: TransportOptions,
        connector: Arc<dyn Connector>,
    ) -> Result<Self> {
        Self::builder()
            .url(url)
            .options(options)
            .connector(connector)
            .build()
    }

    pub(crate) fn spawn(
        url: Url,
        options: TransportOptions,
        connector: Arc<dyn Connector>,
    ) -> Result<Self> {
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (state_tx, state) = watch::channel(ConnectionState::Disconnected);
        let state_tx = Arc::new(state_tx);
        let shared = Arc::new(Shared::default());
        let request_timeout = options.request_timeout;

        Engine::spawn(
            url,
            options,
            connector,
            Arc::clone(&shared),
            Arc::clone(&state_tx),
            command_rx,
        )?;

        Ok(Self {
            inner: Arc::new(Inner {
                commands,
                state_tx,
                state,
                shared,
                request_timeout,
            }),
        })
    }
}

// ============================================================================
// Connection Control
// ============================================================================

impl RpcClient {
    /// Opens the connection.
    ///
    /// Resolves immediately when already connected and joins the attempt in
    /// progress when connecting or reconnecting. A failed initial connect is
    /// not retried.
    ///
    /// # Errors
    ///
    /// - [`Error::Connection`] if the socket fails before opening
    /// - [`Error::ConnectionTimeout`] if the socket does not open in time
    /// - [`Error::ConnectionClosed`] if [`disconnect`](Self::disconnect) runs first
    /// - [`Error::ReconnectExhausted`] if joined reconnection gives up
    pub async fn connect(&self) -> Result<()> {
        self.request_connect(None).await
    }

    /// Opens the connection to a different address.
    ///
    /// # Errors
    ///
    /// As [`connect`](Self::connect), plus [`Error::Config`] if `url` is
    /// invalid or differs from the current target while not disconnected.
    pub async fn connect_to(&self, url: &str) -> Result<()> {
        let url = builder::parse_ws_url(url)?;
        self.request_connect(Some(url)).await
    }

    async fn request_connect(&self, url: Option<Url>) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.send_command(Command::Connect { url, reply })?;
        rx.await?
    }

    /// Closes the connection with a normal-closure frame.
    ///
    /// The state reads [`ConnectionState::Disconnected`] as soon as this
    /// returns, so later calls and notifications are rejected with
    /// [`Error::NotConnected`]. Every pending and queued call is rejected
    /// with [`Error::ConnectionClosed`] and reconnection is cancelled.
    pub fn disconnect(&self, reason: impl Into<String>) {
        let reason = reason.into();
        debug!(%reason, "Disconnect requested");

        // The command is queued under the state lock, so the engine cannot
        // publish a newer state before this one lands.
        let commands = &self.inner.commands;
        self.inner.state_tx.send_if_modified(|state| {
            let _ = commands.send(Command::Disconnect { reason });
            let changed = *state != ConnectionState::Disconnected;
            *state = ConnectionState::Disconnected;
            changed
        });
    }

    /// Current lifecycle state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.inner.state.borrow()
    }

    /// Returns `true` if calls are sent immediately.
    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state().is_connected()
    }

    /// Waits until the connection reaches `target`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ClientClosed`] if the engine stops first.
    pub async fn wait_for_state(&self, target: ConnectionState) -> Result<()> {
        let mut state = self.inner.state.clone();
        tokio::select! {
            biased;

            reached = state.wait_for(|current| *current == target) => {
                reached.map(drop).map_err(|_| Error::ClientClosed)
            }
            () = self.inner.commands.closed() => Err(Error::ClientClosed),
        }
    }

    /// Subscribes to state changes.
    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state.clone()
    }

    /// Snapshot of the engine's counters.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ClientClosed`] if the engine has stopped.
    pub async fn stats(&self) -> Result<TransportStats> {
        let (reply, rx) = oneshot::channel();
        self.send_command(Command::Stats { reply })?;
        Ok(rx.await?)
    }

    /// Caller requests currently awaiting a response.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ClientClosed`] if the engine has stopped.
    pub async fn pending_count(&self) -> Result<usize> {
        Ok(self.stats().await?.pending)
    }
}

// ============================================================================
// Calls
// ============================================================================

impl RpcClient {
    /// Calls `method` with the default timeout.
    ///
    /// Absent `params` are sent as `{}`.
    ///
    /// # Errors
    ///
    /// - [`Error::NotConnected`] if not connected and not queuing
    /// - [`Error::QueueFull`] if the outbound queue is at capacity
    /// - [`Error::TooManyPending`] if the in-flight cap is reached
    /// - [`Error::Rpc`] if the server answers with an error object
    /// - [`Error::RequestTimeout`] if no response arrives in time
    /// - [`Error::ConnectionClosed`] if the connection ends first
    pub async fn call(&self, method: &str, params: Option<Value>) -> Result<Value> {
        self.call_with_timeout(method, params, self.inner.request_timeout)
            .await
    }

    /// Calls `method` with an explicit time budget.
    ///
    /// # Errors
    ///
    /// See [`call`](Self::call).
    pub async fn call_with_timeout(
        &self,
        method: &str,
        params: Option<Value>,
        timeout: Duration,
    ) -> Result<Value> {
        let (reply, rx) = oneshot::channel();
        self.send_command(Command::Call {
            method: method.to_string(),
            params,
            timeout,
            reply,
        })?;
        rx.await?
    }

    /// Calls `method` and deserializes the result.
    ///
    /// # Errors
    ///
    /// As [`call`](Self::call), plus [`Error::Json`] if the result does not
    /// match `T`.
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Option<Value>,
    ) -> Result<T> {
        let value = self.call(method, params).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Sends a one-way notification.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotConnected`] unless connected.
    pub fn send_notification(&self, method: &str, params: Option<Value>) -> Result<()> {
        if !self.is_connected() {
            return Err(Error::NotConnected);
        }
        self.send_command(Command::Notify {
            method: method.to_string(),
            params,
        })
    }

    fn send_command(&self, command: Command) -> Result<()> {
        self.inner
            .commands
            .send(command)
            .map_err(|_| Error::ClientClosed)
    }
}

// ============================================================================
// Observers
// ============================================================================

impl RpcClient {
    /// Registers `handler` for server notifications named `method`.
    ///
    /// Handlers run on the connection task and must not block.
    pub fn subscribe<F>(&self, method: impl Into<String>, handler: F) -> SubscriptionId
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.inner
            .shared
            .notifications
            .subscribe(method.into(), Arc::new(handler))
    }

    /// Removes a notification handler. Returns `false` if unknown.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.shared.notifications.unsubscribe(id)
    }

    /// Registers `handler` for lifecycle events of `kind`.
    pub fn on_event<F>(&self, kind: EventKind, handler: F) -> SubscriptionId
    where
        F: Fn(&TransportEvent) + Send + Sync + 'static,
    {
        self.inner.shared.events.subscribe(kind, Arc::new(handler))
    }

    /// Removes a lifecycle handler. Returns `false` if unknown.
    pub fn off_event(&self, id: SubscriptionId) -> bool {
        self.inner.shared.events.unsubscribe(id)
    }

    /// Runs `handler` with the server address on every successful open.
    pub fn on_connect<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&Url) + Send + Sync + 'static,
    {
        self.on_event(EventKind::Connected, move |event| {
            if let TransportEvent::Connected { url } = event {
                handler(url);
            }
        })
    }

    /// Runs `handler` with `(reason, clean)` whenever the socket closes.
    pub fn on_disconnect<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&str, bool) + Send + Sync + 'static,
    {
        self.on_event(EventKind::Disconnected, move |event| {
            if let TransportEvent::Disconnected { reason, clean } = event {
                handler(reason, *clean);
            }
        })
    }

    /// Runs `handler` with the message of every connection-level error.
    pub fn on_error<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.on_event(EventKind::Error, move |event| {
            if let TransportEvent::Error { message } = event {
                handler(message);
            }
        })
    }
}
