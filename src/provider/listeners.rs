//! Subscriber registry for pushed auth events.
//!
//! Subscriptions release their callback on `unsubscribe` or on drop. Emit
//! snapshots the callback list and re-checks membership before each call, so
//! a callback may unsubscribe itself (or others) without deadlocking and a
//! released callback is not invoked afterwards.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use super::AuthCallback;
use crate::types::{AuthEvent, Session};

#[derive(Default)]
struct ListenerTable {
    next_id: u64,
    callbacks: BTreeMap<u64, AuthCallback>,
}

fn lock(table: &Mutex<ListenerTable>) -> MutexGuard<'_, ListenerTable> {
    table.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Shared set of auth-state callbacks.
#[derive(Clone, Default)]
pub struct AuthListeners {
    table: Arc<Mutex<ListenerTable>>,
}

impl AuthListeners {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback.
    pub fn subscribe(&self, callback: AuthCallback) -> Subscription {
        let mut table = lock(&self.table);
        let id = table.next_id;
        table.next_id += 1;
        table.callbacks.insert(id, callback);
        Subscription { id, table: Arc::downgrade(&self.table) }
    }

    /// Deliver `event` to every live subscriber in registration order.
    ///
    /// Membership is re-checked before each call, but a callback fetched
    /// just before another thread unsubscribes it still runs once.
    /// Subscribers that need a hard cutoff gate their own state.
    pub fn emit(&self, event: AuthEvent, session: Option<&Session>) {
        let ids: Vec<u64> = lock(&self.table).callbacks.keys().copied().collect();
        for id in ids {
            let callback = lock(&self.table).callbacks.get(&id).cloned();
            if let Some(callback) = callback {
                callback(event, session);
            }
        }
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn len(&self) -> usize {
        lock(&self.table).callbacks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Handle to a registered callback.
#[must_use = "dropping a Subscription unsubscribes its callback"]
pub struct Subscription {
    id: u64,
    table: Weak<Mutex<ListenerTable>>,
}

impl Subscription {
    /// Release the callback. Safe to call more than once.
    pub fn unsubscribe(&self) {
        if let Some(table) = self.table.upgrade() {
            lock(&table).callbacks.remove(&self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

#[cfg(test)]
#[path = "listeners_test.rs"]
mod tests;
