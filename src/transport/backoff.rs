//! Reconnection backoff policy.
//!
//! Delays grow geometrically from a base delay and are capped:
//!
//! ```text
//! delay(n) = min(base * multiplier^n, max)
//! ```
//!
//! where `n` is the zero-based index of the attempt being scheduled.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use tokio::time::Instant;

use super::deadline_after;

// ============================================================================
// Backoff
// ============================================================================

/// Exponential backoff with a capped delay and a bounded attempt count.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Backoff {
    /// Delay before the first attempt.
    pub base: Duration,
    /// Upper bound on any single delay.
    pub max: Duration,
    /// Growth factor between attempts.
    pub multiplier: f64,
    /// Attempts allowed before giving up. Zero disables reconnection.
    pub max_attempts: u32,
}

impl Backoff {
    /// Returns the delay before attempt index `attempt`.
    #[must_use]
    pub fn delay(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let secs = self.base.as_secs_f64() * self.multiplier.powi(exponent);

        if !secs.is_finite() || secs >= self.max.as_secs_f64() {
            return self.max;
        }
        Duration::from_secs_f64(secs).min(self.max)
    }

    /// Returns `true` if another attempt is allowed after `attempts_made`.
    #[inline]
    #[must_use]
    pub const fn allows(&self, attempts_made: u32) -> bool {
        attempts_made < self.max_attempts
    }
}

// ============================================================================
// ReconnectState
// ============================================================================

/// Attempt bookkeeping for an ongoing reconnection.
#[derive(Debug, Clone, Default)]
pub(crate) struct ReconnectState {
    /// Attempts started since the last successful connection.
    attempts: u32,
    /// When the next attempt is due.
    next_attempt: Option<Instant>,
}

impl ReconnectState {
    /// Attempts started since the last successful connection.
    #[inline]
    pub(crate) fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Deadline of the scheduled attempt, if any.
    #[inline]
    pub(crate) fn next_deadline(&self) -> Option<Instant> {
        self.next_attempt
    }

    /// Schedules the next attempt.
    ///
    /// Returns the 1-based attempt number and its delay, or `None` once the
    /// policy is exhausted.
    pub(crate) fn schedule(&mut self, policy: &Backoff, now: Instant) -> Option<(u32, Duration)> {
        if !policy.allows(self.attempts) {
            self.next_attempt = None;
            return None;
        }
        let delay = policy.delay(self.attempts);
        self.next_attempt = Some(deadline_after(now, delay));
        Some((self.attempts + 1, delay))
    }

    /// Consumes the scheduled attempt if it is due.
    pub(crate) fn take_due(&mut self, now: Instant) -> bool {
        match self.next_attempt {
            Some(at) if at <= now => {
                self.next_attempt = None;
                self.attempts += 1;
                true
            }
            _ => false,
        }
    }

    /// Clears the counter and any scheduled attempt.
    pub(crate) fn reset(&mut self) {
        self.attempts = 0;
        self.next_attempt = None;
    }
}

// ============================================================================
// Tests
// ============================================================================
