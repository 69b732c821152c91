//! Connection engine.
//!
//! One spawned task owns the socket, the pending-request map, the heartbeat
//! and reconnection state. Public handles talk to it through a command
//! channel, so every mutation happens on this task in arrival order.
//!
//! # Event Loop
//!
//! Each iteration waits on whichever comes first:
//!
//! - a command from a client handle (connect, call, notify, disconnect)
//! - completion of an in-flight dial
//! - an inbound frame from the open socket
//! - the earliest deadline (request timeout, queued-call timeout,
//!   heartbeat tick, reconnect attempt)
//!
//! Commands are polled first, so a disconnect that is already queued wins
//! over a response frame that became ready in the same wakeup.
//!
//! # Teardown Ordering
//!
//! Pending requests are drained before the socket is closed or dropped, and
//! a dropped socket's stream is never polled again, so a response can never
//! settle a request that teardown already rejected.

// ============================================================================
// Imports
// ============================================================================

use std::future::{Future, pending};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, to_string};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{Instant, sleep_until, timeout};
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tracing::{debug, error, info, trace, warn};
use url::Url;

use crate::client::TransportOptions;
use crate::error::{Error, Result};
use crate::identifiers::RequestId;
use crate::protocol::{Inbound, Notification, Request, Response};

use super::backoff::{Backoff, ReconnectState};
use super::deadline_after;
use super::correlator::{Correlator, ReplySender, Responder};
use super::events::{EventKind, TransportEvent};
use super::heartbeat::{Heartbeat, HeartbeatState};
use super::observers::Observers;
use super::queue::{OutboundQueue, QueuedCall};
use super::socket::{Connector, Socket};
use super::state::ConnectionState;

// ============================================================================
// Constants
// ============================================================================

/// Upper bound on sending the close frame during teardown.
const CLOSE_FRAME_TIMEOUT: Duration = Duration::from_secs(5);

// ============================================================================
// Types
// ============================================================================

/// In-flight socket open.
type Dial = Pin<Box<dyn Future<Output = Result<Socket>> + Send>>;

/// Observer lists shared between client handles and the engine.
#[derive(Default)]
pub(crate) struct Shared {
    /// Server notification observers keyed by method.
    pub notifications: Observers<String, Value>,
    /// Lifecycle observers keyed by event kind.
    pub events: Observers<EventKind, TransportEvent>,
}

/// Requests from client handles.
pub(crate) enum Command {
    /// Open the connection, optionally retargeting it first.
    Connect {
        url: Option<Url>,
        reply: oneshot::Sender<Result<()>>,
    },
    /// Caller-initiated clean shutdown.
    Disconnect { reason: String },
    /// Correlated method call.
    Call {
        method: String,
        params: Option<Value>,
        timeout: Duration,
        reply: ReplySender,
    },
    /// One-way notification.
    Notify {
        method: String,
        params: Option<Value>,
    },
    /// Snapshot of internal counters.
    Stats {
        reply: oneshot::Sender<TransportStats>,
    },
}

// ============================================================================
// TransportStats
// ============================================================================

/// Point-in-time view of the engine's bookkeeping.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportStats {
    /// Lifecycle state.
    pub state: ConnectionState,
    /// Current target address.
    pub url: Url,
    /// Caller requests awaiting a response.
    pub pending: usize,
    /// Calls waiting in the outbound queue.
    pub queued: usize,
    /// Reconnect attempts since the last successful connection.
    pub reconnect_attempts: u32,
    /// When the current or last connection opened.
    pub last_connected: Option<Instant>,
    /// Liveness bookkeeping.
    pub heartbeat: HeartbeatState,
}

// ============================================================================
// Engine
// ============================================================================

pub(crate) struct Engine {
    url: Url,
    options: TransportOptions,
    backoff: Backoff,
    connector: Arc<dyn Connector>,
    shared: Arc<Shared>,
    state_tx: Arc<watch::Sender<ConnectionState>>,
    commands: mpsc::UnboundedReceiver<Command>,

    /// Authoritative lifecycle state. The published copy may run ahead of it
    /// after a client-side disconnect.
    state: ConnectionState,
    /// Open socket, present only while connected.
    link: Option<Socket>,
    /// Socket open in progress.
    dial: Option<Dial>,
    /// Callers of `connect()` waiting for the socket to open.
    connect_waiters: Vec<oneshot::Sender<Result<()>>>,
    last_connected: Option<Instant>,

    correlator: Correlator,
    heartbeat: Heartbeat,
    reconnect: ReconnectState,
    queue: OutboundQueue,
}

impl Engine {
    /// Creates the engine and spawns its task on the current runtime.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if called outside a Tokio runtime.
    pub(crate) fn spawn(
        url: Url,
        options: TransportOptions,
        connector: Arc<dyn Connector>,
        shared: Arc<Shared>,
        state_tx: Arc<watch::Sender<ConnectionState>>,
        commands: mpsc::UnboundedReceiver<Command>,
    ) -> Result<()> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|_| Error::config("the client must be created inside a Tokio runtime"))?;

        let engine = Self {
            backoff: options.backoff(),
            heartbeat: Heartbeat::new(options.heartbeat_interval),
            queue: OutboundQueue::new(options.outbound_queue_size),
            url,
            options,
            connector,
            shared,
            state_tx,
            commands,
            state: ConnectionState::Disconnected,
            link: None,
            dial: None,
            connect_waiters: Vec::new(),
            last_connected: None,
            correlator: Correlator::default(),
            reconnect: ReconnectState::default(),
        };

        runtime.spawn(engine.run());
        Ok(())
    }

    /// Event loop.
    async fn run(mut self) {
        loop {
            let wake = self.next_wake();

            tokio::select! {
                biased;

                command = self.commands.recv() => {
                    match command {
                        Some(command) => self.handle_command(command).await,
                        None => {
                            debug!("All client handles dropped");
                            self.teardown("client dropped".to_string()).await;
                            break;
                        }
                    }
                }

                opened = poll_dial(&mut self.dial) => {
                    self.dial = None;
                    self.on_dial_complete(opened).await;
                }

                frame = next_frame(&mut self.link) => {
                    self.on_frame(frame);
                }

                () = sleep_until_opt(wake) => {
                    self.on_deadline().await;
                }
            }
        }

        debug!("Engine terminated");
    }

    // ========================================================================
    // State & Events
    // ========================================================================

    #[inline]
    fn state(&self) -> ConnectionState {
        self.state
    }

    fn set_state(&mut self, state: ConnectionState) {
        let previous = std::mem::replace(&mut self.state, state);
        self.state_tx.send_if_modified(|published| {
            let changed = *published != state;
            *published = state;
            changed
        });
        if previous != state {
            debug!(from = %previous, to = %state, "Connection state changed");
        }
    }

    fn emit(&self, event: TransportEvent) {
        self.shared.events.emit(&event.kind(), &event);
    }

    /// Earliest instant the loop must wake for.
    fn next_wake(&self) -> Option<Instant> {
        [
            self.correlator.next_deadline(),
            self.queue.next_deadline(),
            self.heartbeat.next_deadline(),
            self.reconnect.next_deadline(),
        ]
        .into_iter()
        .flatten()
        .min()
    }

    // ========================================================================
    // Commands
    // ========================================================================

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::Connect { url, reply } => self.handle_connect(url, reply),

            Command::Disconnect { reason } => self.teardown(reason).await,

            Command::Call {
                method,
                params,
                timeout,
                reply,
            } => self.handle_call(method, params, timeout, reply).await,

            Command::Notify { method, params } => self.handle_notify(method, params).await,

            Command::Stats { reply } => {
                let _ = reply.send(TransportStats {
                    state: self.state(),
                    url: self.url.clone(),
                    pending: self.correlator.caller_count(),
                    queued: self.queue.len(),
                    reconnect_attempts: self.reconnect.attempts(),
                    last_connected: self.last_connected,
                    heartbeat: self.heartbeat.state(),
                });
            }
        }
    }

    fn handle_connect(&mut self, url: Option<Url>, reply: oneshot::Sender<Result<()>>) {
        let state = self.state();

        if let Some(url) = url
            && url != self.url
        {
            if state != ConnectionState::Disconnected {
                let _ = reply.send(Err(Error::config(format!(
                    "already {state} to {}; disconnect before retargeting",
                    self.url
                ))));
                return;
            }
            self.url = url;
        }

        match state {
            ConnectionState::Connected => {
                let _ = reply.send(Ok(()));
            }
            ConnectionState::Connecting | ConnectionState::Reconnecting => {
                self.connect_waiters.push(reply);
            }
            ConnectionState::Disconnected => {
                self.connect_waiters.push(reply);
                self.set_state(ConnectionState::Connecting);
                self.start_dial();
            }
        }
    }

    async fn handle_call(
        &mut self,
        method: String,
        params: Option<Value>,
        call_timeout: Duration,
        reply: ReplySender,
    ) {
        let deadline = deadline_after(Instant::now(), call_timeout);

        match self.state() {
            ConnectionState::Connected => {
                let id = self.correlator.allocate_id();
                self.dispatch_call(id, method, params, call_timeout, deadline, reply)
                    .await;
            }

            state if state.is_pending() && self.queue.is_enabled() => {
                let call = QueuedCall {
                    id: self.correlator.allocate_id(),
                    method,
                    params,
                    timeout: call_timeout,
                    deadline,
                    reply,
                };
                match self.queue.push(call) {
                    Ok(()) => debug!(queued = self.queue.len(), "Call queued until connected"),
                    Err(call) => {
                        warn!(
                            method = %call.method,
                            capacity = self.queue.capacity(),
                            "Outbound queue full"
                        );
                        let _ = call.reply.send(Err(Error::QueueFull {
                            capacity: self.queue.capacity(),
                        }));
                    }
                }
            }

            _ => {
                let _ = reply.send(Err(Error::NotConnected));
            }
        }
    }

    /// Registers and writes a call. Assumes the connection is open.
    async fn dispatch_call(
        &mut self,
        id: RequestId,
        method: String,
        params: Option<Value>,
        call_timeout: Duration,
        deadline: Instant,
        reply: ReplySender,
    ) {
        let pending = self.correlator.caller_count();
        let max = self.options.max_pending_requests;
        if pending >= max {
            warn!(pending, max, "Too many pending requests");
            let _ = reply.send(Err(Error::TooManyPending { pending, max }));
            return;
        }

        let request = Request::new(id, method.clone(), params);
        let json = match to_string(&request) {
            Ok(json) => json,
            Err(e) => {
                let _ = reply.send(Err(Error::Json(e)));
                return;
            }
        };

        // Registered before the write; a failed write drains it with the rest.
        self.correlator
            .register(id, method, Responder::Caller(reply), call_timeout, deadline);

        if self.write(json).await {
            trace!(%id, method = %request.method, in_flight = self.correlator.len(), "Request sent");
        }
    }

    async fn handle_notify(&mut self, method: String, params: Option<Value>) {
        if !self.state().is_connected() {
            warn!(%method, "Dropping notification while not connected");
            return;
        }

        match to_string(&Notification::new(method, params)) {
            Ok(json) => {
                self.write(json).await;
            }
            Err(e) => warn!(error = %e, "Failed to serialize notification"),
        }
    }

    /// Writes a text frame. A failed write is an unclean close.
    async fn write(&mut self, json: String) -> bool {
        let Some(link) = self.link.as_mut() else {
            return false;
        };

        match link.sink.send(Message::Text(json.into())).await {
            Ok(()) => true,
            Err(e) => {
                error!(error = %e, "Failed to write frame");
                self.on_connection_lost(format!("write failed: {e}"));
                false
            }
        }
    }

    // ========================================================================
    // Connection Lifecycle
    // ========================================================================

    fn start_dial(&mut self) {
        let connector = Arc::clone(&self.connector);
        let url = self.url.clone();
        let connect_timeout = self.options.connect_timeout;

        info!(%url, "Opening connection");

        self.dial = Some(Box::pin(async move {
            match timeout(connect_timeout, connector.open(&url)).await {
                Ok(result) => result,
                Err(_) => Err(Error::connection_timeout(
                    u64::try_from(connect_timeout.as_millis()).unwrap_or(u64::MAX),
                )),
            }
        }));
    }

    async fn on_dial_complete(&mut self, opened: Result<Socket>) {
        match (opened, self.state()) {
            (Ok(socket), _) => self.on_open(socket).await,

            (Err(e), ConnectionState::Connecting) => {
                warn!(url = %self.url, error = %e, "Connect failed");
                self.emit(TransportEvent::Error {
                    message: e.to_string(),
                });
                self.set_state(ConnectionState::Disconnected);
                self.fail_queue(|| replicate(&e));
                self.fail_waiters(|| replicate(&e));
            }

            (Err(e), ConnectionState::Reconnecting) => {
                warn!(
                    attempt = self.reconnect.attempts(),
                    error = %e,
                    "Reconnect attempt failed"
                );
                self.emit(TransportEvent::Error {
                    message: e.to_string(),
                });
                self.schedule_reconnect();
            }

            (Err(e), state) => debug!(%state, error = %e, "Ignoring stale dial result"),
        }
    }

    async fn on_open(&mut self, socket: Socket) {
        let now = Instant::now();
        let attempts = self.reconnect.attempts();

        self.link = Some(socket);
        self.reconnect.reset();
        self.last_connected = Some(now);
        self.heartbeat.start(now);
        self.set_state(ConnectionState::Connected);

        info!(url = %self.url, reconnect_attempts = attempts, "Connected");

        for waiter in self.connect_waiters.drain(..) {
            let _ = waiter.send(Ok(()));
        }
        self.emit(TransportEvent::Connected {
            url: self.url.clone(),
        });

        self.flush_queue().await;
    }

    /// Sends queued calls in admission order.
    async fn flush_queue(&mut self) {
        let queued = self.queue.drain();
        if queued.is_empty() {
            return;
        }
        debug!(count = queued.len(), "Flushing outbound queue");

        for call in queued {
            if self.state().is_connected() {
                self.dispatch_call(
                    call.id,
                    call.method,
                    call.params,
                    call.timeout,
                    call.deadline,
                    call.reply,
                )
                .await;
            } else if let Err(call) = self.queue.push(call) {
                let _ = call.reply.send(Err(Error::NotConnected));
            }
        }
    }

    /// Handles an unclean loss of the open socket.
    fn on_connection_lost(&mut self, reason: String) {
        if !self.state().is_connected() {
            return;
        }
        warn!(%reason, "Connection lost");

        self.heartbeat.stop();
        self.link = None;
        self.fail_pending(|| Error::ConnectionClosed);
        self.emit(TransportEvent::Disconnected {
            reason,
            clean: false,
        });

        self.set_state(ConnectionState::Reconnecting);
        self.schedule_reconnect();
    }

    /// Handles a normal-closure close frame from the server.
    fn on_remote_close(&mut self, reason: String) {
        if !self.state().is_connected() {
            return;
        }
        info!(%reason, "Server closed the connection");

        drop(self.release());
        self.set_state(ConnectionState::Disconnected);
        self.emit(TransportEvent::Disconnected {
            reason,
            clean: true,
        });
    }

    fn schedule_reconnect(&mut self) {
        match self.reconnect.schedule(&self.backoff, Instant::now()) {
            Some((attempt, delay)) => {
                info!(
                    attempt,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    "Reconnect scheduled"
                );
                self.emit(TransportEvent::Reconnecting { attempt, delay });
            }
            None => self.give_up(),
        }
    }

    /// Terminal failure after exhausting reconnect attempts.
    fn give_up(&mut self) {
        let attempts = self.reconnect.attempts();
        error!(attempts, url = %self.url, "Reconnect attempts exhausted");

        self.reconnect.reset();
        self.set_state(ConnectionState::Disconnected);
        self.fail_queue(|| Error::ReconnectExhausted { attempts });
        self.fail_waiters(|| Error::ReconnectExhausted { attempts });
        self.emit(TransportEvent::ReconnectFailed { attempts });
    }

    /// Caller-initiated clean shutdown.
    ///
    /// No-op when already disconnected.
    async fn teardown(&mut self, reason: String) {
        if self.state() == ConnectionState::Disconnected {
            return;
        }

        if let Some(mut link) = self.release() {
            let frame = CloseFrame {
                code: CloseCode::Normal,
                reason: reason.clone().into(),
            };
            match timeout(CLOSE_FRAME_TIMEOUT, link.sink.send(Message::Close(Some(frame)))).await {
                Ok(Ok(())) => trace!("Close frame sent"),
                Ok(Err(e)) => debug!(error = %e, "Failed to send close frame"),
                Err(_) => debug!("Timed out sending close frame"),
            }
        }

        self.set_state(ConnectionState::Disconnected);
        info!(%reason, "Disconnected");
        self.emit(TransportEvent::Disconnected {
            reason,
            clean: true,
        });
    }

    /// Cancels every timer and rejects everything outstanding.
    ///
    /// Returns the socket, if any, for the caller to close.
    fn release(&mut self) -> Option<Socket> {
        self.dial = None;
        self.reconnect.reset();
        self.heartbeat.stop();
        self.fail_pending(|| Error::ConnectionClosed);
        self.fail_queue(|| Error::ConnectionClosed);
        self.fail_waiters(|| Error::ConnectionClosed);
        self.link.take()
    }

    fn fail_pending(&mut self, make: impl Fn() -> Error) {
        let drained = self.correlator.drain();
        let count = drained.len();

        for (_, request) in drained {
            request.settle(Err(make()));
        }

        if count > 0 {
            debug!(count, "Failed pending requests");
        }
    }

    fn fail_queue(&mut self, make: impl Fn() -> Error) {
        for call in self.queue.drain() {
            let _ = call.reply.send(Err(make()));
        }
    }

    fn fail_waiters(&mut self, make: impl Fn() -> Error) {
        for waiter in self.connect_waiters.drain(..) {
            let _ = waiter.send(Err(make()));
        }
    }

    // ========================================================================
    // Inbound Frames
    // ========================================================================

    fn on_frame(&mut self, frame: Option<std::result::Result<Message, WsError>>) {
        match frame {
            Some(Ok(Message::Text(text))) => self.route(text.as_str()),

            Some(Ok(Message::Binary(bytes))) => match std::str::from_utf8(&bytes) {
                Ok(text) => self.route(text),
                Err(e) => {
                    warn!(len = bytes.len(), "Discarding non-UTF-8 binary frame");
                    self.emit(TransportEvent::parse_error(e, "<binary>"));
                }
            },

            Some(Ok(Message::Close(frame))) => {
                let clean = frame.as_ref().is_some_and(|f| f.code == CloseCode::Normal);
                let reason = frame
                    .map(|f| format!("closed by server ({}): {}", u16::from(f.code), f.reason.as_str()))
                    .unwrap_or_else(|| "closed by server".to_string());

                if clean {
                    self.on_remote_close(reason);
                } else {
                    self.on_connection_lost(reason);
                }
            }

            // Ping/Pong are answered by tungstenite.
            Some(Ok(_)) => {}

            Some(Err(e)) => {
                error!(error = %e, "WebSocket error");
                self.emit(TransportEvent::Error {
                    message: e.to_string(),
                });
                self.on_connection_lost(format!("socket error: {e}"));
            }

            None => {
                debug!("WebSocket stream ended");
                self.on_connection_lost("stream ended".to_string());
            }
        }
    }

    /// Classifies a text frame and dispatches it.
    fn route(&mut self, text: &str) {
        match Inbound::parse(text) {
            Ok(Inbound::Response(response)) => self.on_response(response),

            Ok(Inbound::Notification(notification)) => {
                let delivered = self
                    .shared
                    .notifications
                    .emit(notification.method.as_str(), &notification.params);
                trace!(method = %notification.method, delivered, "Notification dispatched");
            }

            Err(e) => {
                warn!(error = %e, "Discarding malformed frame");
                self.emit(TransportEvent::parse_error(&e, text));
            }
        }
    }

    fn on_response(&mut self, response: Response) {
        let id = response.id;

        let Some(request) = self.correlator.take(id) else {
            debug!(%id, "Response for unknown or expired request");
            return;
        };

        if request.is_probe() {
            trace!(%id, "Heartbeat answered");
            self.heartbeat.record_pong(id, Instant::now());
            return;
        }

        trace!(%id, method = %request.method, error = response.is_error(), "Response received");
        request.settle(response.into_result());
    }

    // ========================================================================
    // Deadlines
    // ========================================================================

    async fn on_deadline(&mut self) {
        let now = Instant::now();
        let mut probe_expired = false;

        for (id, request) in self.correlator.expire(now) {
            if request.is_probe() {
                probe_expired = true;
                continue;
            }

            let timeout_ms = u64::try_from(request.timeout.as_millis()).unwrap_or(u64::MAX);
            warn!(%id, method = %request.method, timeout_ms, "Request timed out");
            let err = Error::request_timeout(request.method.clone(), id, timeout_ms);
            request.settle(Err(err));
        }

        for call in self.queue.expire(now) {
            let timeout_ms = u64::try_from(call.timeout.as_millis()).unwrap_or(u64::MAX);
            warn!(id = %call.id, method = %call.method, timeout_ms, "Queued call timed out");
            let _ = call
                .reply
                .send(Err(Error::request_timeout(call.method, call.id, timeout_ms)));
        }

        if probe_expired {
            warn!("Heartbeat probe unanswered; treating connection as dead");
            self.on_connection_lost("heartbeat timeout".to_string());
        }

        if self.state().is_connected() && self.heartbeat.tick(now) {
            self.send_probe(now).await;
        }

        if self.state() == ConnectionState::Reconnecting && self.reconnect.take_due(now) {
            info!(attempt = self.reconnect.attempts(), "Reconnecting");
            self.start_dial();
        }
    }

    async fn send_probe(&mut self, now: Instant) {
        let id = self.correlator.allocate_id();
        let method = self.options.heartbeat_method.clone();
        let probe_timeout = self.options.request_timeout;

        let json = match to_string(&Request::new(id, method.clone(), None)) {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "Failed to serialize heartbeat probe");
                return;
            }
        };

        let deadline = deadline_after(now, probe_timeout);
        self.correlator
            .register(id, method, Responder::Probe, probe_timeout, deadline);
        self.heartbeat.record_ping(id, now);

        if self.write(json).await {
            trace!(%id, "Heartbeat probe sent");
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Awaits the in-flight dial, or never resolves if there is none.
async fn poll_dial(dial: &mut Option<Dial>) -> Result<Socket> {
    match dial {
        Some(dial) => dial.await,
        None => pending().await,
    }
}

/// Reads the next frame, or never resolves if there is no socket.
async fn next_frame(link: &mut Option<Socket>) -> Option<std::result::Result<Message, WsError>> {
    match link {
        Some(socket) => socket.stream.next().await,
        None => pending().await,
    }
}

/// Sleeps until `deadline`, or forever if there is none.
async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => pending().await,
    }
}

/// Produces an equivalent error for each of several waiters.
fn replicate(err: &Error) -> Error {
    match err {
        Error::ConnectionTimeout { timeout_ms } => Error::connection_timeout(*timeout_ms),
        Error::Connection { message } => Error::connection(message.clone()),
        Error::WebSocket(e) => Error::connection(e.to_string()),
        other => Error::connection(other.to_string()),
    }
}
