//! Keyed observer lists.
//!
//! Used for both server notifications (keyed by method name) and transport
//! lifecycle events (keyed by [`EventKind`](super::EventKind)). Handlers are
//! invoked outside the lock, one at a time; a panicking handler is logged and
//! the remaining handlers still run.

// ============================================================================
// Imports
// ============================================================================

use std::any::Any;
use std::borrow::Borrow;
use std::fmt::Debug;
use std::hash::Hash;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tracing::{trace, warn};

use crate::identifiers::SubscriptionId;

// ============================================================================
// Types
// ============================================================================

/// Observer callback.
pub type Handler<T> = Arc<dyn Fn(&T) + Send + Sync>;

type Registry<K, T> = FxHashMap<K, Vec<(SubscriptionId, Handler<T>)>>;

// ============================================================================
// Observers
// ============================================================================

/// Observer lists keyed by `K`, delivering `&T`.
pub(crate) struct Observers<K, T> {
    registry: Mutex<Registry<K, T>>,
}

impl<K, T> Default for Observers<K, T> {
    fn default() -> Self {
        Self {
            registry: Mutex::new(FxHashMap::default()),
        }
    }
}

impl<K, T> Observers<K, T>
where
    K: Eq + Hash + Debug,
{
    /// Adds a handler under `key`.
    pub(crate) fn subscribe(&self, key: K, handler: Handler<T>) -> SubscriptionId {
        let id = SubscriptionId::generate();
        trace!(?key, %id, "Observer registered");
        self.registry.lock().entry(key).or_default().push((id, handler));
        id
    }

    /// Removes the handler registered as `id`.
    ///
    /// Returns `false` if no such handler exists.
    pub(crate) fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut registry = self.registry.lock();
        let mut removed = false;
        registry.retain(|_, handlers| {
            let before = handlers.len();
            handlers.retain(|(handler_id, _)| *handler_id != id);
            removed |= handlers.len() != before;
            !handlers.is_empty()
        });
        removed
    }

    /// Number of handlers registered under `key`.
    #[cfg(test)]
    pub(crate) fn count<Q>(&self, key: &Q) -> usize
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.registry.lock().get(key).map_or(0, Vec::len)
    }

    /// Invokes every handler registered under `key`.
    ///
    /// Returns the number of handlers that completed without panicking.
    pub(crate) fn emit<Q>(&self, key: &Q, payload: &T) -> usize
    where
        K: Borrow<Q>,
        Q: Eq + Hash + Debug + ?Sized,
    {
        let handlers: Vec<(SubscriptionId, Handler<T>)> = match self.registry.lock().get(key) {
            Some(handlers) => handlers.clone(),
            None => return 0,
        };

        let mut delivered = 0;
        for (id, handler) in handlers {
            match catch_unwind(AssertUnwindSafe(|| handler(payload))) {
                Ok(()) => delivered += 1,
                Err(panic) => {
                    warn!(?key, %id, panic = panic_message(panic.as_ref()), "Observer panicked");
                }
            }
        }
        delivered
    }
}

/// Best-effort text of a panic payload.
fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}

// ============================================================================
// Tests
// ============================================================================
