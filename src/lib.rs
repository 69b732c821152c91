//! Camera RPC - WebSocket JSON-RPC 2.0 client for a camera-control service.
//!
//! This library owns the single connection to the camera service and turns
//! method calls into correlated request/response pairs over it.
//!
//! # Architecture
//!
//! Every [`RpcClient`] is backed by one spawned engine task that owns:
//!
//! - **Connection manager**: socket lifecycle, clean/unclean close,
//!   reconnection with exponential backoff
//! - **Correlator**: request ids, pending calls, per-call deadlines
//! - **Heartbeat**: periodic liveness probes through the correlator
//! - **Router**: classifies inbound frames as responses, notifications or
//!   malformed input
//!
//! Handles talk to the engine over channels, so no transport state is
//! shared or locked.
//!
//! # Quick Start
//!
//! ```no_run
//! use camera_rpc::{Result, RpcClient};
//! use camera_rpc::service::DeviceService;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let client = RpcClient::builder()
//!         .url("ws://localhost:8002/ws")
//!         .build()?;
//!     client.connect().await?;
//!
//!     let devices = DeviceService::new(client.clone());
//!     let list = devices.get_camera_list().await?;
//!     println!("{} cameras", list.total);
//!
//!     client.on_disconnect(|reason, clean| println!("closed ({clean}): {reason}"));
//!     client.disconnect("done");
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | [`RpcClient`], builder and options |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`protocol`] | JSON-RPC message types |
//! | [`service`] | Typed facades for the camera service methods |
//! | [`transport`] | Connection engine and socket abstraction |

// ============================================================================
// Modules
// ============================================================================

/// Client handle, builder and options.
///
/// Use [`RpcClient::builder()`] to create a configured client.
pub mod client;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers.
///
/// Newtype wrappers keep request and subscription ids apart.
pub mod identifiers;

/// JSON-RPC 2.0 message types.
pub mod protocol;

/// Typed service facades.
pub mod service;

/// WebSocket transport layer.
///
/// Connection engine, reconnection policy and socket abstraction.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Client types
pub use client::{ClientBuilder, RpcClient, TransportOptions};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{RequestId, SubscriptionId};

// Transport types
pub use transport::{
    Backoff, ConnectionState, Connector, EventKind, Socket, TransportEvent, TransportStats,
    WebSocketConnector,
};
