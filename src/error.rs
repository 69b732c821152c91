//! Error types for the camera RPC transport.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use camera_rpc::{Error, Result, RpcClient};
//!
//! async fn example(client: &RpcClient) -> Result<()> {
//!     match client.call("get_camera_list", None).await {
//!         Ok(cameras) => println!("{cameras}"),
//!         Err(e) if e.rpc_code() == Some(-32601) => println!("not supported"),
//!         Err(e) => return Err(e),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`] |
//! | Not ready | [`Error::NotConnected`], [`Error::QueueFull`], [`Error::TooManyPending`] |
//! | Connection | [`Error::Connection`], [`Error::ConnectionTimeout`], [`Error::ConnectionClosed`], [`Error::ReconnectExhausted`], [`Error::ClientClosed`] |
//! | Protocol | [`Error::Rpc`], [`Error::Protocol`] |
//! | Execution | [`Error::RequestTimeout`] |
//! | External | [`Error::Json`], [`Error::WebSocket`], [`Error::Url`] |

// ============================================================================
// Imports
// ============================================================================

use std::result::Result as StdResult;

use serde_json::Value;
use thiserror::Error;
use tokio::sync::oneshot::error::RecvError;
use tokio_tungstenite::tungstenite::Error as WsError;

use crate::identifiers::RequestId;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when client configuration is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // Not-Ready Errors
    // ========================================================================
    /// Operation attempted while the transport is not connected.
    #[error("Not connected")]
    NotConnected,

    /// Outbound queue is full.
    ///
    /// Returned for the newest call when the queue is at capacity.
    #[error("Outbound queue full ({capacity} calls)")]
    QueueFull {
        /// Configured queue capacity.
        capacity: usize,
    },

    /// Too many requests in flight.
    #[error("Too many pending requests: {pending}/{max}")]
    TooManyPending {
        /// Requests currently in flight.
        pending: usize,
        /// Configured maximum.
        max: usize,
    },

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// WebSocket connection failed.
    ///
    /// Returned when the socket cannot be opened.
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// Socket did not open within the connect timeout.
    #[error("Connection timeout after {timeout_ms}ms")]
    ConnectionTimeout {
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    /// Connection closed while the request was pending.
    #[error("Connection closed")]
    ConnectionClosed,

    /// Reconnection gave up after exhausting its attempts.
    #[error("Reconnect failed after {attempts} attempts")]
    ReconnectExhausted {
        /// Number of attempts made.
        attempts: u32,
    },

    /// The client's engine task has stopped.
    #[error("Client closed")]
    ClientClosed,

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// JSON-RPC error object returned by the server.
    #[error("RPC error {code}: {message}")]
    Rpc {
        /// JSON-RPC error code.
        code: i64,
        /// Error message from the server.
        message: String,
        /// Optional structured error data.
        data: Option<Value>,
    },

    /// Protocol violation or unexpected payload.
    #[error("Protocol error: {message}")]
    Protocol {
        /// Description of the protocol violation.
        message: String,
    },

    // ========================================================================
    // Execution Errors
    // ========================================================================
    /// No response arrived within the call's time budget.
    #[error("Request {request_id} ({method}) timed out after {timeout_ms}ms")]
    RequestTimeout {
        /// Method that timed out.
        method: String,
        /// The request ID that timed out.
        request_id: RequestId,
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    ///
    /// Raised when the handshake fails. Callers of `connect()` receive it as
    /// [`Error::Connection`].
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),

    /// Invalid URL.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// Channel receive error.
    #[error("Channel closed")]
    ChannelClosed(#[from] RecvError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a connection timeout error.
    #[inline]
    pub fn connection_timeout(timeout_ms: u64) -> Self {
        Self::ConnectionTimeout { timeout_ms }
    }

    /// Creates a protocol error.
    #[inline]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Creates a JSON-RPC error from its parts.
    #[inline]
    pub fn rpc(code: i64, message: impl Into<String>, data: Option<Value>) -> Self {
        Self::Rpc {
            code,
            message: message.into(),
            data,
        }
    }

    /// Creates a request timeout error.
    #[inline]
    pub fn request_timeout(method: impl Into<String>, request_id: RequestId, timeout_ms: u64) -> Self {
        Self::RequestTimeout {
            method: method.into(),
            request_id,
            timeout_ms,
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::ConnectionTimeout { .. } | Self::RequestTimeout { .. }
        )
    }

    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::NotConnected
                | Self::Connection { .. }
                | Self::ConnectionTimeout { .. }
                | Self::ConnectionClosed
                | Self::ReconnectExhausted { .. }
                | Self::ClientClosed
                | Self::WebSocket(_)
        )
    }

    /// Returns `true` if this error is recoverable.
    ///
    /// Recoverable errors may succeed on retry.
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::NotConnected
                | Self::ConnectionTimeout { .. }
                | Self::RequestTimeout { .. }
                | Self::ConnectionClosed
                | Self::QueueFull { .. }
                | Self::TooManyPending { .. }
        )
    }

    /// Returns the JSON-RPC error code if the server rejected the call.
    #[inline]
    #[must_use]
    pub fn rpc_code(&self) -> Option<i64> {
        match self {
            Self::Rpc { code, .. } => Some(*code),
            _ => None,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn test_error_display() {
        let err = Error::connection("refused");
        assert_eq!(err.to_string(), "Connection failed: refused");
    }

    #[test]
    fn test_config_error() {
        let err = Error::config("missing url");
        assert_eq!(err.to_string(), "Configuration error: missing url");
    }

    #[test]
    fn test_request_timeout_names_method() {
        let err = Error::request_timeout("slow_method", RequestId::new(7), 5000);
        let text = err.to_string();
        assert!(text.contains("slow_method"));
        assert!(text.contains("5000ms"));
        assert!(err.is_timeout());
    }

    #[test]
    fn test_rpc_code() {
        let err = Error::rpc(-32601, "Method not found", Some(json!({"method": "x"})));
        assert_eq!(err.rpc_code(), Some(-32601));
        assert_eq!(err.to_string(), "RPC error -32601: Method not found");
        assert_eq!(Error::ConnectionClosed.rpc_code(), None);
    }

    #[test]
    fn test_is_connection_error() {
        assert!(Error::NotConnected.is_connection_error());
        assert!(Error::ConnectionClosed.is_connection_error());
        assert!(Error::ReconnectExhausted { attempts: 3 }.is_connection_error());
        assert!(!Error::config("test").is_connection_error());
        assert!(!Error::rpc(1, "x", None).is_connection_error());
    }

    #[test]
    fn test_is_recoverable() {
        let timeout_err = Error::request_timeout("ping", RequestId::new(1), 1000);
        assert!(timeout_err.is_recoverable());
        assert!(Error::QueueFull { capacity: 4 }.is_recoverable());
        assert!(!Error::config("test").is_recoverable());
        assert!(!Error::ReconnectExhausted { attempts: 5 }.is_recoverable());
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<String>("invalid").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }

    #[test]
    fn test_from_url_error() {
        let url_err = url::Url::parse("not a url").unwrap_err();
        let err: Error = url_err.into();
        assert!(matches!(err, Error::Url(_)));
    }
}
