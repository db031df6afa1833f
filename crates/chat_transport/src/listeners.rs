//! Typed listener registry with snapshot dispatch
//!
//! Replaces ad-hoc callback arrays: listeners are keyed by id, dispatch
//! iterates over a snapshot, so unsubscribing (or subscribing) from inside
//! a callback cannot corrupt an in-flight dispatch.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;
type Entries<T> = Mutex<HashMap<u64, Callback<T>>>;

/// Handle returned by a listener registration.
///
/// Unsubscribing removes only this listener; other registrations on the
/// same set are unaffected. Outlives the set harmlessly.
pub struct Subscription {
    cancel: Box<dyn FnOnce() + Send>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        (self.cancel)();
    }
}

/// A set of listeners for one event kind.
pub struct ListenerSet<T> {
    entries: Arc<Entries<T>>,
    next_id: AtomicU64,
}

impl<T: 'static> Default for ListenerSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

// 'static because the unsubscribe closure holds a Weak to the entries map.
impl<T: 'static> ListenerSet<T> {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(0),
        }
    }

    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(id, Arc::new(callback));
        }

        let entries: Weak<Entries<T>> = Arc::downgrade(&self.entries);
        Subscription {
            cancel: Box::new(move || {
                if let Some(entries) = entries.upgrade() {
                    if let Ok(mut entries) = entries.lock() {
                        entries.remove(&id);
                    }
                }
            }),
        }
    }

    /// Invoke every listener registered before this call began.
    pub fn emit(&self, value: &T) {
        let snapshot: Vec<Callback<T>> = match self.entries.lock() {
            Ok(entries) => entries.values().cloned().collect(),
            Err(_) => return,
        };
        for callback in snapshot {
            callback(value);
        }
    }

    /// Drop every registration.
    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
