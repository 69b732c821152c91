//! Connection lifecycle state.
//!
//! ```text
//! Disconnected ──connect──► Connecting ──open──► Connected
//!      ▲                        │                   │
//!      │◄──────error────────────┘                   │ unclean close
//!      │                                            ▼
//!      │◄──────give up / disconnect──────── Reconnecting ──open──► Connected
//!      │
//!      └◄──────disconnect / clean close──── Connected
//! ```

use std::fmt;

/// Where the connection currently is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    /// No socket and no attempt in progress.
    #[default]
    Disconnected,
    /// First attempt after `connect()` is in flight.
    Connecting,
    /// Socket open; calls are accepted.
    Connected,
    /// Lost the socket uncleanly; backing off between attempts.
    Reconnecting,
}

impl ConnectionState {
    /// Returns `true` if calls can be sent right now.
    #[inline]
    #[must_use]
    pub const fn is_connected(self) -> bool {
        matches!(self, Self::Connected)
    }

    /// Returns `true` while a connection is being established.
    #[inline]
    #[must_use]
    pub const fn is_pending(self) -> bool {
        matches!(self, Self::Connecting | Self::Reconnecting)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Reconnecting => "reconnecting",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predicates() {
        assert!(ConnectionState::Connected.is_connected());
        assert!(!ConnectionState::Reconnecting.is_connected());
        assert!(ConnectionState::Connecting.is_pending());
        assert!(ConnectionState::Reconnecting.is_pending());
        assert!(!ConnectionState::Disconnected.is_pending());
        assert_eq!(ConnectionState::default(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_display() {
        assert_eq!(ConnectionState::Reconnecting.to_string(), "reconnecting");
    }
}
