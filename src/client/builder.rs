//! Builder pattern for client configuration.
//!
//! Provides a fluent API for configuring and creating [`RpcClient`] instances.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use camera_rpc::RpcClient;
//!
//! # async fn example() -> camera_rpc::Result<()> {
//! let client = RpcClient::builder()
//!     .url("ws://localhost:8002/ws")
//!     .request_timeout(Duration::from_secs(10))
//!     .build()?;
//! client.connect().await?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use url::Url;

use crate::error::{Error, Result};
use crate::transport::{Connector, WebSocketConnector};

use super::RpcClient;
use super::options::TransportOptions;

// ============================================================================
// ClientBuilder
// ============================================================================

/// Builder for configuring an [`RpcClient`] instance.
///
/// Use [`RpcClient::builder()`] to create a new builder.
#[derive(Default, Clone)]
pub struct ClientBuilder {
    /// Server address.
    url: Option<String>,
    /// Transport tuning.
    options: TransportOptions,
    /// Socket factory. Defaults to [`WebSocketConnector`].
    connector: Option<Arc<dyn Connector>>,
}

impl fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("url", &self.url)
            .field("options", &self.options)
            .field("custom_connector", &self.connector.is_some())
            .finish()
    }
}

// ============================================================================
// ClientBuilder Implementation
// ============================================================================

impl ClientBuilder {
    /// Creates a new builder with default options.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the server address.
    ///
    /// # Arguments
    ///
    /// * `url` - `ws://` or `wss://` address of the camera service
    #[inline]
    #[must_use]
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Replaces all transport options at once.
    #[inline]
    #[must_use]
    pub fn options(mut self, options: TransportOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets the default per-call timeout.
    #[inline]
    #[must_use]
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.options.request_timeout = timeout;
        self
    }

    /// Sets the connect timeout.
    #[inline]
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.options.connect_timeout = timeout;
        self
    }

    /// Sets the heartbeat interval. Zero disables the heartbeat.
    #[inline]
    #[must_use]
    pub fn heartbeat_interval(mut self, interval: Duration) -> Self {
        self.options.heartbeat_interval = interval;
        self
    }

    /// Sets the reconnect attempt limit. Zero disables reconnection.
    #[inline]
    #[must_use]
    pub fn max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.options.max_reconnect_attempts = attempts;
        self
    }

    /// Enables the outbound queue with the given capacity.
    #[inline]
    #[must_use]
    pub fn outbound_queue_size(mut self, size: usize) -> Self {
        self.options.outbound_queue_size = size;
        self
    }

    /// Sets the socket factory.
    ///
    /// Useful for custom TLS setups or in-process servers.
    #[inline]
    #[must_use]
    pub fn connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connector = Some(connector);
        self
    }

    /// Builds the client with validation.
    ///
    /// The client starts disconnected; call [`RpcClient::connect`].
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the URL is missing or not `ws`/`wss`
    /// - [`Error::Url`] if the URL cannot be parsed
    /// - [`Error::Config`] if an option is invalid
    /// - [`Error::Config`] if called outside a Tokio runtime
    pub fn build(self) -> Result<RpcClient> {
        let url = self.validate_url()?;
        self.options.validate()?;

        let connector = self
            .connector
            .unwrap_or_else(|| Arc::new(WebSocketConnector));

        RpcClient::spawn(url, self.options, connector)
    }
}

// ============================================================================
// Validation
// ============================================================================

impl ClientBuilder {
    fn validate_url(&self) -> Result<Url> {
        let url = self.url.as_deref().ok_or_else(|| {
            Error::config(
                "server URL is required. Use .url() to set it.\n\
                 Example: RpcClient::builder().url(\"ws://localhost:8002/ws\")",
            )
        })?;

        parse_ws_url(url)
    }
}

/// Parses a `ws://` or `wss://` address.
pub(crate) fn parse_ws_url(url: &str) -> Result<Url> {
    let parsed = Url::parse(url)?;

    match parsed.scheme() {
        "ws" | "wss" => Ok(parsed),
        other => Err(Error::config(format!(
            "unsupported URL scheme '{other}' in {url}; expected ws or wss"
        ))),
    }
}

// ============================================================================
// Tests
// ============================================================================
