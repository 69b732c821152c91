//! Transport tuning options.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use camera_rpc::TransportOptions;
//!
//! let options = TransportOptions::new()
//!     .with_request_timeout(Duration::from_secs(5))
//!     .with_heartbeat_interval(Duration::from_secs(15))
//!     .with_outbound_queue_size(32);
//! ```
//!
//! | Option | Default |
//! |--------|---------|
//! | `max_reconnect_attempts` | 5 |
//! | `reconnect_base_delay` | 1s |
//! | `reconnect_max_delay` | 30s |
//! | `backoff_multiplier` | 2.0 |
//! | `heartbeat_interval` | 30s (zero disables) |
//! | `heartbeat_method` | `ping` |
//! | `request_timeout` | 30s |
//! | `connect_timeout` | 30s |
//! | `outbound_queue_size` | 0 (queuing disabled) |
//! | `max_pending_requests` | 100 |

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use crate::error::{Error, Result};
use crate::transport::Backoff;

// ============================================================================
// Defaults
// ============================================================================

const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 5;
const DEFAULT_RECONNECT_BASE_DELAY: Duration = Duration::from_secs(1);
const DEFAULT_RECONNECT_MAX_DELAY: Duration = Duration::from_secs(30);
const DEFAULT_BACKOFF_MULTIPLIER: f64 = 2.0;
const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);
const DEFAULT_HEARTBEAT_METHOD: &str = "ping";
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_MAX_PENDING_REQUESTS: usize = 100;

// ============================================================================
// TransportOptions
// ============================================================================

/// Reconnection, heartbeat, timeout and queuing settings.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportOptions {
    /// Reconnect attempts after an unclean close before giving up.
    pub max_reconnect_attempts: u32,

    /// Delay before the first reconnect attempt.
    pub reconnect_base_delay: Duration,

    /// Cap on the delay between reconnect attempts.
    pub reconnect_max_delay: Duration,

    /// Growth factor between reconnect delays.
    pub backoff_multiplier: f64,

    /// Interval between liveness probes. Zero disables the heartbeat.
    pub heartbeat_interval: Duration,

    /// Reserved method used as the liveness probe.
    pub heartbeat_method: String,

    /// Default per-call time budget.
    pub request_timeout: Duration,

    /// Time budget for opening the socket.
    pub connect_timeout: Duration,

    /// Calls held while (re)connecting. Zero rejects them immediately.
    pub outbound_queue_size: usize,

    /// Calls allowed in flight at once.
    pub max_pending_requests: usize,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            max_reconnect_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
            reconnect_base_delay: DEFAULT_RECONNECT_BASE_DELAY,
            reconnect_max_delay: DEFAULT_RECONNECT_MAX_DELAY,
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            heartbeat_method: DEFAULT_HEARTBEAT_METHOD.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            outbound_queue_size: 0,
            max_pending_requests: DEFAULT_MAX_PENDING_REQUESTS,
        }
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl TransportOptions {
    /// Creates options with default settings.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Options for a client that never reconnects or probes.
    #[must_use]
    pub fn one_shot() -> Self {
        Self {
            max_reconnect_attempts: 0,
            heartbeat_interval: Duration::ZERO,
            ..Default::default()
        }
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl TransportOptions {
    /// Sets the reconnect attempt limit.
    #[inline]
    #[must_use]
    pub fn with_max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.max_reconnect_attempts = attempts;
        self
    }

    /// Sets the base and maximum reconnect delays.
    #[inline]
    #[must_use]
    pub fn with_reconnect_delay(mut self, base: Duration, max: Duration) -> Self {
        self.reconnect_base_delay = base;
        self.reconnect_max_delay = max;
        self
    }

    /// Sets the backoff growth factor.
    #[inline]
    #[must_use]
    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Sets the heartbeat interval.
    #[inline]
    #[must_use]
    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    /// Sets the probe method name.
    #[inline]
    #[must_use]
    pub fn with_heartbeat_method(mut self, method: impl Into<String>) -> Self {
        self.heartbeat_method = method.into();
        self
    }

    /// Sets the default per-call timeout.
    #[inline]
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the connect timeout.
    #[inline]
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Enables the outbound queue with the given capacity.
    #[inline]
    #[must_use]
    pub fn with_outbound_queue_size(mut self, size: usize) -> Self {
        self.outbound_queue_size = size;
        self
    }

    /// Sets the in-flight request cap.
    #[inline]
    #[must_use]
    pub fn with_max_pending_requests(mut self, max: usize) -> Self {
        self.max_pending_requests = max;
        self
    }
}

// ============================================================================
// Derived Values & Validation
// ============================================================================

impl TransportOptions {
    /// Reconnection policy described by these options.
    #[must_use]
    pub fn backoff(&self) -> Backoff {
        Backoff {
            base: self.reconnect_base_delay,
            max: self.reconnect_max_delay,
            multiplier: self.backoff_multiplier,
            max_attempts: self.max_reconnect_attempts,
        }
    }

    /// Checks the options for values the transport cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] describing the first invalid option.
    pub fn validate(&self) -> Result<()> {
        if self.request_timeout.is_zero() {
            return Err(Error::config("request_timeout must be greater than zero"));
        }
        if self.connect_timeout.is_zero() {
            return Err(Error::config("connect_timeout must be greater than zero"));
        }
        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier < 1.0 {
            return Err(Error::config(format!(
                "backoff_multiplier must be a finite value >= 1.0, got {}",
                self.backoff_multiplier
            )));
        }
        if self.reconnect_base_delay > self.reconnect_max_delay {
            return Err(Error::config(format!(
                "reconnect_base_delay ({:?}) exceeds reconnect_max_delay ({:?})",
                self.reconnect_base_delay, self.reconnect_max_delay
            )));
        }
        if self.heartbeat_method.trim().is_empty() {
            return Err(Error::config("heartbeat_method must not be empty"));
        }
        if self.max_pending_requests == 0 {
            return Err(Error::config("max_pending_requests must be greater than zero"));
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = TransportOptions::new();
        assert_eq!(options.max_reconnect_attempts, 5);
        assert_eq!(options.request_timeout, Duration::from_secs(30));
        assert_eq!(options.heartbeat_method, "ping");
        assert_eq!(options.outbound_queue_size, 0);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_builder_methods() {
        let options = TransportOptions::new()
            .with_max_reconnect_attempts(2)
            .with_reconnect_delay(Duration::from_millis(50), Duration::from_secs(1))
            .with_backoff_multiplier(1.5)
            .with_heartbeat_interval(Duration::ZERO)
            .with_heartbeat_method("server.ping")
            .with_request_timeout(Duration::from_secs(5))
            .with_connect_timeout(Duration::from_secs(2))
            .with_outbound_queue_size(8)
            .with_max_pending_requests(10);

        let backoff = options.backoff();
        assert_eq!(backoff.max_attempts, 2);
        assert_eq!(backoff.base, Duration::from_millis(50));
        assert_eq!(backoff.max, Duration::from_secs(1));
        assert_eq!(options.heartbeat_method, "server.ping");
        assert_eq!(options.outbound_queue_size, 8);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_one_shot() {
        let options = TransportOptions::one_shot();
        assert_eq!(options.max_reconnect_attempts, 0);
        assert!(options.heartbeat_interval.is_zero());
    }

    #[test]
    fn test_rejects_zero_timeout() {
        let options = TransportOptions::new().with_request_timeout(Duration::ZERO);
        let err = options.validate().unwrap_err();
        assert!(err.to_string().contains("request_timeout"));
    }

    #[test]
    fn test_rejects_shrinking_backoff() {
        let options = TransportOptions::new().with_backoff_multiplier(0.5);
        assert!(options.validate().is_err());

        let options = TransportOptions::new().with_backoff_multiplier(f64::NAN);
        assert!(options.validate().is_err());
    }

    #[test]
    fn test_rejects_inverted_delays() {
        let options = TransportOptions::new()
            .with_reconnect_delay(Duration::from_secs(10), Duration::from_secs(1));
        assert!(options.validate().is_err());
    }

    #[test]
    fn test_rejects_empty_probe_method() {
        let options = TransportOptions::new().with_heartbeat_method("  ");
        assert!(options.validate().is_err());
    }
}
