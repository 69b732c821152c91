//! Heartbeat monitor.
//!
//! While connected, a fixed-interval tick asks the engine to send a liveness
//! probe through the correlator. The probe is an ordinary request, so its
//! expiry is detected by the correlator's deadline index; the engine then
//! treats the connection as dead.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use tokio::time::Instant;

use crate::identifiers::RequestId;

use super::deadline_after;

// ============================================================================
// HeartbeatState
// ============================================================================

/// Snapshot of liveness bookkeeping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeartbeatState {
    /// When the last probe was sent.
    pub last_ping_sent: Option<Instant>,
    /// When the last probe was answered.
    pub last_pong_received: Option<Instant>,
    /// Probe currently awaiting an answer.
    pub outstanding: Option<RequestId>,
}

// ============================================================================
// Heartbeat
// ============================================================================

/// Tick scheduling and probe tracking.
#[derive(Debug)]
pub(crate) struct Heartbeat {
    interval: Duration,
    next_tick: Option<Instant>,
    state: HeartbeatState,
}

impl Heartbeat {
    /// Creates a stopped monitor. A zero interval disables probing.
    pub(crate) fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_tick: None,
            state: HeartbeatState::default(),
        }
    }

    /// Starts ticking from `now`.
    pub(crate) fn start(&mut self, now: Instant) {
        self.state = HeartbeatState::default();
        self.next_tick = (!self.interval.is_zero()).then(|| deadline_after(now, self.interval));
    }

    /// Stops ticking and forgets any outstanding probe.
    pub(crate) fn stop(&mut self) {
        self.next_tick = None;
        self.state.outstanding = None;
    }

    /// When the next tick is due.
    #[inline]
    pub(crate) fn next_deadline(&self) -> Option<Instant> {
        self.next_tick
    }

    /// Advances the tick if due.
    ///
    /// Returns `true` if a probe should be sent now. A due tick with a probe
    /// still outstanding is skipped; that probe's own deadline decides.
    pub(crate) fn tick(&mut self, now: Instant) -> bool {
        match self.next_tick {
            Some(at) if at <= now => {
                let next = deadline_after(at, self.interval);
                self.next_tick = Some(if next > now {
                    next
                } else {
                    deadline_after(now, self.interval)
                });
                self.state.outstanding.is_none()
            }
            _ => false,
        }
    }

    /// Records that probe `id` was sent.
    pub(crate) fn record_ping(&mut self, id: RequestId, now: Instant) {
        self.state.last_ping_sent = Some(now);
        self.state.outstanding = Some(id);
    }

    /// Records an answer to probe `id`.
    pub(crate) fn record_pong(&mut self, id: RequestId, now: Instant) {
        if self.state.outstanding == Some(id) {
            self.state.outstanding = None;
        }
        self.state.last_pong_received = Some(now);
    }

    /// Current bookkeeping.
    #[inline]
    pub(crate) fn state(&self) -> HeartbeatState {
        self.state
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_never_ticks() {
        let mut heartbeat = Heartbeat::new(Duration::ZERO);
        let now = Instant::now();
        heartbeat.start(now);
        assert!(heartbeat.next_deadline().is_none());
        assert!(!heartbeat.tick(now + Duration::from_secs(3600)));
    }

    #[test]
    fn test_ticks_at_interval() {
        let mut heartbeat = Heartbeat::new(Duration::from_secs(10));
        let start = Instant::now();
        heartbeat.start(start);

        assert!(!heartbeat.tick(start + Duration::from_secs(9)));
        assert!(heartbeat.tick(start + Duration::from_secs(10)));
        assert_eq!(heartbeat.next_deadline(), Some(start + Duration::from_secs(20)));
    }

    #[test]
    fn test_skips_tick_while_probe_outstanding() {
        let mut heartbeat = Heartbeat::new(Duration::from_secs(10));
        let start = Instant::now();
        heartbeat.start(start);

        assert!(heartbeat.tick(start + Duration::from_secs(10)));
        heartbeat.record_ping(RequestId::new(1), start + Duration::from_secs(10));
        assert!(!heartbeat.tick(start + Duration::from_secs(20)));

        heartbeat.record_pong(RequestId::new(1), start + Duration::from_secs(21));
        assert!(heartbeat.state().outstanding.is_none());
        assert!(heartbeat.tick(start + Duration::from_secs(30)));
    }

    #[test]
    fn test_stop_clears_schedule() {
        let mut heartbeat = Heartbeat::new(Duration::from_secs(10));
        let start = Instant::now();
        heartbeat.start(start);
        heartbeat.record_ping(RequestId::new(4), start);

        heartbeat.stop();
        assert!(heartbeat.next_deadline().is_none());
        assert!(heartbeat.state().outstanding.is_none());
        assert_eq!(heartbeat.state().last_ping_sent, Some(start));
    }

    #[test]
    fn test_late_tick_does_not_burst() {
        let mut heartbeat = Heartbeat::new(Duration::from_secs(10));
        let start = Instant::now();
        heartbeat.start(start);

        let late = start + Duration::from_secs(45);
        assert!(heartbeat.tick(late));
        assert_eq!(heartbeat.next_deadline(), Some(late + Duration::from_secs(10)));
    }

    #[test]
    fn test_huge_interval_schedules_without_overflow() {
        let mut heartbeat = Heartbeat::new(Duration::MAX);
        let start = Instant::now();
        heartbeat.start(start);

        let next = heartbeat.next_deadline().expect("scheduled");
        assert!(next > start + Duration::from_secs(86_400 * 365));
        assert!(!heartbeat.tick(start + Duration::from_secs(3600)));
        assert!(heartbeat.tick(next));
        assert!(heartbeat.next_deadline().expect("rescheduled") > next);
    }
}
