//! Request/response correlation.
//!
//! The correlator hands out request ids and keeps one [`PendingRequest`] per
//! id until it is settled by a response, expires, or is drained on teardown.
//! Deadlines are kept in an ordered index so the engine can sleep until the
//! earliest one instead of arming a timer per call.

// ============================================================================
// Imports
// ============================================================================

use std::collections::BTreeSet;
use std::time::Duration;

use rustc_hash::FxHashMap;
use serde_json::Value;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::trace;

use crate::error::{Error, Result};
use crate::identifiers::RequestId;

// ============================================================================
// Types
// ============================================================================

/// Channel that settles a caller's future.
pub(crate) type ReplySender = oneshot::Sender<Result<Value>>;

/// Who is waiting for a response.
#[derive(Debug)]
pub(crate) enum Responder {
    /// A caller awaiting `call()`.
    Caller(ReplySender),
    /// The heartbeat monitor's liveness probe.
    Probe,
}

/// One in-flight request.
#[derive(Debug)]
pub(crate) struct PendingRequest {
    /// Method name, kept for timeout diagnostics.
    pub method: String,
    /// Settlement target.
    pub responder: Responder,
    /// Budget the request was registered with.
    pub timeout: Duration,
    /// When the request expires.
    pub deadline: Instant,
}

impl PendingRequest {
    /// Settles a caller's future. Probes are ignored.
    ///
    /// A dropped receiver (caller gave up) is not an error.
    pub(crate) fn settle(self, outcome: Result<Value>) {
        if let Responder::Caller(tx) = self.responder {
            let _ = tx.send(outcome);
        }
    }

    /// Returns `true` if this entry is a heartbeat probe.
    #[inline]
    pub(crate) fn is_probe(&self) -> bool {
        matches!(self.responder, Responder::Probe)
    }
}

// ============================================================================
// Correlator
// ============================================================================

/// Pending-request map plus id allocator.
#[derive(Debug)]
pub(crate) struct Correlator {
    /// Last id handed out.
    last_id: RequestId,
    /// In-flight requests by id.
    pending: FxHashMap<RequestId, PendingRequest>,
    /// Deadline index ordered by expiry.
    deadlines: BTreeSet<(Instant, RequestId)>,
}

impl Default for Correlator {
    fn default() -> Self {
        Self {
            last_id: RequestId::new(0),
            pending: FxHashMap::default(),
            deadlines: BTreeSet::new(),
        }
    }
}

impl Correlator {
    /// Allocates the next request id.
    ///
    /// Ids start at 1 and only ever increase.
    pub(crate) fn allocate_id(&mut self) -> RequestId {
        self.last_id = self.last_id.next();
        self.last_id
    }

    /// Registers a pending request.
    pub(crate) fn register(
        &mut self,
        id: RequestId,
        method: impl Into<String>,
        responder: Responder,
        timeout: Duration,
        deadline: Instant,
    ) {
        let request = PendingRequest {
            method: method.into(),
            responder,
            timeout,
            deadline,
        };
        if let Some(previous) = self.pending.insert(id, request) {
            // Ids are allocated monotonically, so this only fires on misuse.
            self.deadlines.remove(&(previous.deadline, id));
            previous.settle(Err(Error::protocol(format!("request id {id} reused"))));
        }
        self.deadlines.insert((deadline, id));
        trace!(%id, pending = self.pending.len(), "Registered pending request");
    }

    /// Removes and returns the request with `id`.
    pub(crate) fn take(&mut self, id: RequestId) -> Option<PendingRequest> {
        let request = self.pending.remove(&id)?;
        self.deadlines.remove(&(request.deadline, id));
        Some(request)
    }

    /// Earliest deadline among pending requests.
    #[inline]
    pub(crate) fn next_deadline(&self) -> Option<Instant> {
        self.deadlines.first().map(|(deadline, _)| *deadline)
    }

    /// Removes every request whose deadline is at or before `now`.
    pub(crate) fn expire(&mut self, now: Instant) -> Vec<(RequestId, PendingRequest)> {
        let mut expired = Vec::new();
        while let Some(&(deadline, id)) = self.deadlines.first() {
            if deadline > now {
                break;
            }
            self.deadlines.pop_first();
            if let Some(request) = self.pending.remove(&id) {
                expired.push((id, request));
            }
        }
        expired
    }

    /// Removes every pending request.
    pub(crate) fn drain(&mut self) -> Vec<(RequestId, PendingRequest)> {
        self.deadlines.clear();
        self.pending.drain().collect()
    }

    /// Number of requests in flight.
    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.pending.len()
    }

    /// Number of caller requests in flight, excluding probes.
    pub(crate) fn caller_count(&self) -> usize {
        self.pending.values().filter(|r| !r.is_probe()).count()
    }
}

// ============================================================================
// Tests
// ============================================================================
