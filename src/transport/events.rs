//! Transport lifecycle events.
//!
//! | Kind | Emitted when |
//! |------|--------------|
//! | `Connected` | The socket opened (initially or after reconnecting) |
//! | `Disconnected` | The socket went away, cleanly or not |
//! | `Reconnecting` | A reconnect attempt was scheduled |
//! | `ReconnectFailed` | Reconnection gave up (emitted once per outage) |
//! | `Error` | A connect attempt or socket operation failed |
//! | `ParseError` | An inbound frame could not be classified |

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use url::Url;

// ============================================================================
// Constants
// ============================================================================

/// Longest frame excerpt carried by [`TransportEvent::ParseError`].
const MAX_FRAME_EXCERPT: usize = 256;

// ============================================================================
// EventKind
// ============================================================================

/// Discriminant used to register lifecycle observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Connected,
    Disconnected,
    Reconnecting,
    ReconnectFailed,
    Error,
    ParseError,
}

// ============================================================================
// TransportEvent
// ============================================================================

/// A lifecycle event delivered to observers.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// Socket opened.
    Connected {
        /// Server address.
        url: Url,
    },

    /// Socket closed.
    Disconnected {
        /// Why the connection ended.
        reason: String,
        /// `true` for caller-initiated or normal-closure shutdowns.
        clean: bool,
    },

    /// A reconnect attempt is scheduled.
    Reconnecting {
        /// 1-based attempt number.
        attempt: u32,
        /// Wait before the attempt.
        delay: Duration,
    },

    /// Reconnection gave up.
    ReconnectFailed {
        /// Attempts made.
        attempts: u32,
    },

    /// Connection-level failure.
    Error {
        /// Description of the failure.
        message: String,
    },

    /// Unparsable or unclassifiable inbound frame.
    ParseError {
        /// Why the frame was rejected.
        error: String,
        /// Leading part of the offending frame.
        frame: String,
    },
}

impl TransportEvent {
    /// Returns the event's kind.
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Connected { .. } => EventKind::Connected,
            Self::Disconnected { .. } => EventKind::Disconnected,
            Self::Reconnecting { .. } => EventKind::Reconnecting,
            Self::ReconnectFailed { .. } => EventKind::ReconnectFailed,
            Self::Error { .. } => EventKind::Error,
            Self::ParseError { .. } => EventKind::ParseError,
        }
    }

    /// Builds a parse-error event, truncating the frame.
    pub(crate) fn parse_error(error: impl ToString, frame: &str) -> Self {
        Self::ParseError {
            error: error.to_string(),
            frame: frame.chars().take(MAX_FRAME_EXCERPT).collect(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind() {
        let event = TransportEvent::ReconnectFailed { attempts: 3 };
        assert_eq!(event.kind(), EventKind::ReconnectFailed);

        let event = TransportEvent::Disconnected {
            reason: "bye".into(),
            clean: true,
        };
        assert_eq!(event.kind(), EventKind::Disconnected);
    }

    #[test]
    fn test_parse_error_truncates() {
        let frame = "x".repeat(1000);
        match TransportEvent::parse_error("bad", &frame) {
            TransportEvent::ParseError { frame, error } => {
                assert_eq!(frame.len(), MAX_FRAME_EXCERPT);
                assert_eq!(error, "bad");
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
