//! The consent store: single owner of the persisted decision.
//!
//! Storage failures never reach callers. An unavailable or broken medium
//! degrades `read` to `None` and `write` to notify-only, so the decision
//! lives for the session but does not survive a reload.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::config::ConsentConfig;
use crate::error::ConsentResult;
use crate::preferences::ConsentPreferences;
use crate::storage::{FileKvStore, MemoryKvStore, SharedKvStore};

type Listener = Arc<dyn Fn(&ConsentPreferences) + Send + Sync>;

/// Whether a `write` reached the storage medium.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Persisted,
    /// Storage refused the record; listeners were still notified.
    SessionOnly,
}

struct StoreInner {
    key: String,
    storage: SharedKvStore,
    listeners: Mutex<Vec<(u64, Listener)>>,
    next_listener_id: AtomicU64,
    last_known: Mutex<Option<ConsentPreferences>>,
}

/// Cheap to clone; clones share listeners and the session snapshot.
#[derive(Clone)]
pub struct ConsentStore {
    inner: Arc<StoreInner>,
}

impl ConsentStore {
    pub fn new(key: impl Into<String>, storage: SharedKvStore) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                key: key.into(),
                storage,
                listeners: Mutex::new(Vec::new()),
                next_listener_id: AtomicU64::new(1),
                last_known: Mutex::new(None),
            }),
        }
    }

    pub fn from_config(config: &ConsentConfig) -> ConsentResult<Self> {
        config.validate()?;
        let storage: SharedKvStore = match &config.storage_dir {
            Some(dir) => Arc::new(FileKvStore::new(dir.clone())),
            None => Arc::new(MemoryKvStore::new()),
        };
        Ok(Self::new(config.storage_key.clone(), storage))
    }

    /// Returns the persisted decision, or `None` when there is none, the
    /// stored value is corrupted, or storage is unavailable.
    pub fn read(&self) -> Option<ConsentPreferences> {
        let raw = match self.inner.storage.get(&self.inner.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(error) => {
                tracing::warn!(key = %self.inner.key, "consent storage read failed: {error}");
                return None;
            }
        };

        match ConsentPreferences::from_json(&raw) {
            Ok(preferences) => {
                *self.inner.last_known.lock() = Some(preferences);
                Some(preferences)
            }
            Err(error) => {
                tracing::warn!(key = %self.inner.key, "discarding corrupted consent record: {error}");
                None
            }
        }
    }

    /// Persist `preferences`, replacing any prior record, then notify every
    /// listener in registration order before returning.
    pub fn write(&self, preferences: ConsentPreferences) -> WriteOutcome {
        let outcome = match self.persist(&preferences) {
            Ok(()) => WriteOutcome::Persisted,
            Err(error) => {
                tracing::warn!(
                    key = %self.inner.key,
                    "consent storage write failed; decision kept for this session only: {error}"
                );
                self.discard_stale_record();
                WriteOutcome::SessionOnly
            }
        };
        *self.inner.last_known.lock() = Some(preferences);
        self.notify(&preferences);
        outcome
    }

    fn persist(&self, preferences: &ConsentPreferences) -> ConsentResult<()> {
        let serialized = preferences.to_json()?;
        self.inner.storage.set(&self.inner.key, &serialized)
    }

    /// A record that could not be replaced must not outlive the session:
    /// after a reload the user is asked again instead of seeing it revived.
    fn discard_stale_record(&self) {
        match self.inner.storage.remove(&self.inner.key) {
            Ok(removed) => {
                tracing::debug!(key = %self.inner.key, removed, "stale consent record discarded");
            }
            Err(error) => {
                tracing::warn!(key = %self.inner.key, "failed to discard stale consent record: {error}");
            }
        }
    }

    fn notify(&self, preferences: &ConsentPreferences) {
        // Snapshot so listeners may (un)subscribe while being notified.
        let listeners: Vec<(u64, Listener)> = self.inner.listeners.lock().clone();
        for (id, listener) in listeners {
            let result = catch_unwind(AssertUnwindSafe(|| listener(preferences)));
            if let Err(panic_info) = result {
                let panic_msg = if let Some(s) = panic_info.downcast_ref::<&str>() {
                    s.to_string()
                } else if let Some(s) = panic_info.downcast_ref::<String>() {
                    s.clone()
                } else {
                    "listener panicked".to_string()
                };
                tracing::warn!(listener = id, "consent listener panicked: {panic_msg}");
            }
        }
    }

    /// Register a listener invoked once per `write` with the full record.
    pub fn on_change<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&ConsentPreferences) + Send + Sync + 'static,
    {
        let id = self.inner.next_listener_id.fetch_add(1, Ordering::Relaxed);
        self.inner.listeners.lock().push((id, Arc::new(listener)));
        Subscription {
            id,
            store: Arc::downgrade(&self.inner),
        }
    }

    pub fn listener_count(&self) -> usize {
        self.inner.listeners.lock().len()
    }

    /// The most recent record this store read or wrote during the session.
    /// Unlike `read`, this survives an unavailable storage medium.
    pub fn last_known(&self) -> Option<ConsentPreferences> {
        *self.inner.last_known.lock()
    }

    /// Withdraw the decision. Listeners are not notified.
    pub fn clear(&self) {
        *self.inner.last_known.lock() = None;
        match self.inner.storage.remove(&self.inner.key) {
            Ok(removed) => {
                tracing::debug!(key = %self.inner.key, removed, "consent record cleared");
            }
            Err(error) => {
                tracing::warn!(key = %self.inner.key, "consent storage clear failed: {error}");
            }
        }
    }

    /// Drop every listener. Outstanding subscriptions become no-ops.
    pub fn shutdown(&self) {
        self.inner.listeners.lock().clear();
    }
}

/// Handle returned by [`ConsentStore::on_change`].
#[must_use = "dropping a Subscription keeps the listener registered; call unsubscribe to remove it"]
pub struct Subscription {
    id: u64,
    store: Weak<StoreInner>,
}

impl Subscription {
    /// Deregister the listener. Returns `false` if it was already gone.
    pub fn unsubscribe(self) -> bool {
        let Some(store) = self.store.upgrade() else {
            return false;
        };
        let mut listeners = store.listeners.lock();
        let before = listeners.len();
        listeners.retain(|(id, _)| *id != self.id);
        listeners.len() != before
    }
}
