//! Bounded outbound queue.
//!
//! Holds calls accepted while a connection is being (re)established. The
//! queue never grows past its capacity: the call that would overflow it is
//! handed back to be rejected. Queued calls keep their original deadline.

// ============================================================================
// Imports
// ============================================================================

use std::collections::VecDeque;
use std::time::Duration;

use serde_json::Value;
use tokio::time::Instant;

use crate::identifiers::RequestId;

use super::correlator::ReplySender;

// ============================================================================
// QueuedCall
// ============================================================================

/// A call waiting for the connection.
///
/// The id is allocated on admission so wire order matches call order.
#[derive(Debug)]
pub(crate) struct QueuedCall {
    pub id: RequestId,
    pub method: String,
    pub params: Option<Value>,
    pub timeout: Duration,
    pub deadline: Instant,
    pub reply: ReplySender,
}

// ============================================================================
// OutboundQueue
// ============================================================================

#[derive(Debug)]
pub(crate) struct OutboundQueue {
    capacity: usize,
    calls: VecDeque<QueuedCall>,
}

impl OutboundQueue {
    /// Creates a queue. Zero capacity disables queuing.
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            capacity,
            calls: VecDeque::new(),
        }
    }

    #[inline]
    pub(crate) fn is_enabled(&self) -> bool {
        self.capacity > 0
    }

    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.calls.len()
    }

    /// Appends a call, or returns it if the queue is full or disabled.
    pub(crate) fn push(&mut self, call: QueuedCall) -> Result<(), QueuedCall> {
        if self.calls.len() >= self.capacity {
            return Err(call);
        }
        self.calls.push_back(call);
        Ok(())
    }

    /// Earliest deadline among queued calls.
    pub(crate) fn next_deadline(&self) -> Option<Instant> {
        self.calls.iter().map(|call| call.deadline).min()
    }

    /// Removes calls whose deadline is at or before `now`.
    pub(crate) fn expire(&mut self, now: Instant) -> Vec<QueuedCall> {
        let (expired, live): (Vec<_>, Vec<_>) =
            self.calls.drain(..).partition(|call| call.deadline <= now);
        self.calls = live.into();
        expired
    }

    /// Removes every queued call in FIFO order.
    pub(crate) fn drain(&mut self) -> Vec<QueuedCall> {
        self.calls.drain(..).collect()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use tokio::sync::oneshot;

    fn call(method: &str, deadline: Instant) -> QueuedCall {
        let (reply, _rx) = oneshot::channel();
        QueuedCall {
            id: RequestId::new(1),
            method: method.to_string(),
            params: None,
            timeout: Duration::from_secs(1),
            deadline,
            reply,
        }
    }

    #[test]
    fn test_disabled_rejects() {
        let mut queue = OutboundQueue::new(0);
        assert!(!queue.is_enabled());
        assert!(queue.push(call("a", Instant::now())).is_err());
    }

    #[test]
    fn test_overflow_returns_newest() {
        let mut queue = OutboundQueue::new(2);
        let now = Instant::now();
        assert!(queue.push(call("a", now)).is_ok());
        assert!(queue.push(call("b", now)).is_ok());

        let rejected = queue.push(call("c", now)).unwrap_err();
        assert_eq!(rejected.method, "c");
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_drain_preserves_order() {
        let mut queue = OutboundQueue::new(3);
        let now = Instant::now();
        for method in ["a", "b", "c"] {
            assert!(queue.push(call(method, now)).is_ok());
        }
        let methods: Vec<_> = queue.drain().into_iter().map(|c| c.method).collect();
        assert_eq!(methods, ["a", "b", "c"]);
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn test_expire_keeps_live_calls() {
        let mut queue = OutboundQueue::new(3);
        let now = Instant::now();
        assert!(queue.push(call("old", now)).is_ok());
        assert!(queue.push(call("new", now + Duration::from_secs(5))).is_ok());

        assert_eq!(queue.next_deadline(), Some(now));
        let expired = queue.expire(now + Duration::from_secs(1));
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].method, "old");
        assert_eq!(queue.len(), 1);
    }
}
