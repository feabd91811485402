//! Per-client limiter state.
//!
//! One coarse mutex guards both the identifier mode and the map, so a mode
//! switch and the state reset happen together, and each admission decision
//! (identify, lookup-or-create, update) is a single critical section.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::security::identity::{ClientInfo, IdentifierMode};

struct StoreInner<T> {
    mode: IdentifierMode,
    entries: HashMap<String, T>,
}

/// Map from client identifier to limiter state `T`.
pub struct ClientStore<T> {
    inner: Mutex<StoreInner<T>>,
}

impl<T> ClientStore<T> {
    pub fn new(mode: IdentifierMode) -> Self {
        Self {
            inner: Mutex::new(StoreInner {
                mode,
                entries: HashMap::new(),
            }),
        }
    }

    // A poisoned lock still holds usable counters.
    fn lock(&self) -> MutexGuard<'_, StoreInner<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn mode(&self) -> IdentifierMode {
        self.lock().mode
    }

    /// Switch identifier mode, discarding all state. Returns the number of
    /// entries dropped.
    pub fn set_mode(&self, mode: IdentifierMode) -> usize {
        let mut inner = self.lock();
        let dropped = inner.entries.len();
        inner.mode = mode;
        inner.entries.clear();
        dropped
    }

    /// Identify `client` and run `update` on its entry, creating it with
    /// `create` if absent. Returns the identifier and `update`'s result.
    pub fn with_client<R>(
        &self,
        client: &ClientInfo,
        create: impl FnOnce() -> T,
        update: impl FnOnce(&mut T) -> R,
    ) -> (String, R) {
        let mut inner = self.lock();
        let key = client.identifier(inner.mode);
        let entry = inner.entries.entry(key.clone()).or_insert_with(create);
        let result = update(entry);
        (key, result)
    }

    /// Keep only entries for which `keep` returns true. Returns the number
    /// removed.
    pub fn retain(&self, mut keep: impl FnMut(&str, &T) -> bool) -> usize {
        let mut inner = self.lock();
        let before = inner.entries.len();
        inner.entries.retain(|key, entry| keep(key, entry));
        before - inner.entries.len()
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Clone> ClientStore<T> {
    /// Snapshot of one entry.
    pub fn get(&self, key: &str) -> Option<T> {
        self.lock().entries.get(key).cloned()
    }
}
