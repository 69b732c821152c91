//! WebSocket transport layer.
//!
//! This module owns the connection to the camera service: opening the
//! socket, correlating calls with responses, probing liveness and
//! reconnecting after unclean closes.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐   Command    ┌─────────────────┐   WebSocket   ┌──────────┐
//! │  RpcClient      │─────────────►│  Engine task    │◄─────────────►│  Camera  │
//! │  (any clones)   │◄─────────────│  Correlator     │   JSON-RPC    │  service │
//! └─────────────────┘   oneshot    │  Heartbeat      │               └──────────┘
//!          ▲                       │  Backoff        │
//!          │     watch / observers │  Router         │
//!          └───────────────────────┴─────────────────┘
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `engine` | Event loop that owns all connection state |
//! | `correlator` | Id allocation and pending-request bookkeeping |
//! | `heartbeat` | Liveness probe schedule |
//! | `backoff` | Reconnect delay policy |
//! | `queue` | Calls held while (re)connecting |
//! | `observers` | Notification and lifecycle observer lists |
//! | `socket` | Socket abstraction and WebSocket connector |

// ============================================================================
// Submodules
// ============================================================================

/// Reconnect delay policy.
pub mod backoff;

/// Pending-request bookkeeping.
pub(crate) mod correlator;

/// Connection event loop.
pub(crate) mod engine;

/// Lifecycle events.
pub mod events;

/// Liveness probing.
pub mod heartbeat;

/// Observer registries.
pub(crate) mod observers;

/// Outbound call queue.
pub(crate) mod queue;

/// Socket abstraction.
pub mod socket;

/// Connection state.
pub mod state;

/// In-memory socket pair for tests.
#[cfg(test)]
pub(crate) mod testing;

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use tokio::time::Instant;

// ============================================================================
// Re-exports
// ============================================================================

pub use backoff::Backoff;
pub use engine::TransportStats;
pub use events::{EventKind, TransportEvent};
pub use heartbeat::HeartbeatState;
pub use observers::Handler;
pub use socket::{Connector, FrameSink, FrameStream, Socket, WebSocketConnector};
pub use state::ConnectionState;

// ============================================================================
// Deadlines
// ============================================================================

/// Longest budget honored when computing a deadline. Larger budgets,
/// `Duration::MAX` included, mean "effectively never".
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Returns `now + budget` without overflowing the clock.
#[inline]
pub(crate) fn deadline_after(now: Instant, budget: Duration) -> Instant {
    now + budget.min(FAR_FUTURE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deadline_after_adds_ordinary_budgets() {
        let now = Instant::now();
        assert_eq!(deadline_after(now, Duration::from_secs(5)), now + Duration::from_secs(5));
        assert_eq!(deadline_after(now, Duration::ZERO), now);
    }

    #[test]
    fn test_deadline_after_saturates_huge_budgets() {
        let now = Instant::now();
        assert_eq!(deadline_after(now, Duration::MAX), now + FAR_FUTURE);
        assert!(deadline_after(now, Duration::MAX) > now + Duration::from_secs(86_400 * 365));
    }
}
