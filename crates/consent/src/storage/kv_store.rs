//! Generic key-value store trait and in-memory implementations.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::error::{ConsentError, ConsentResult};

/// Durable string key-value storage, in the spirit of browser local storage.
///
/// Implementations take `&self` so one medium can be shared by several
/// store instances (e.g. to simulate a page reload).
pub trait KvStore: Send + Sync {
    fn get(&self, key: &str) -> ConsentResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> ConsentResult<()>;
    fn remove(&self, key: &str) -> ConsentResult<bool>;
}

// --- Memory Implementation ---

#[derive(Debug, Default)]
pub struct MemoryKvStore {
    data: Mutex<HashMap<String, String>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemoryKvStore {
    fn get(&self, key: &str) -> ConsentResult<Option<String>> {
        Ok(self.data.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> ConsentResult<()> {
        self.data.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> ConsentResult<bool> {
        Ok(self.data.lock().remove(key).is_some())
    }
}

// --- Unavailable Implementation ---

/// Storage that refuses every operation, as when the user has disabled
/// site storage.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableKvStore;

impl UnavailableKvStore {
    fn unavailable(key: &str) -> ConsentError {
        ConsentError::StorageUnavailable(format!("storage disabled (key {key})"))
    }
}

impl KvStore for UnavailableKvStore {
    fn get(&self, key: &str) -> ConsentResult<Option<String>> {
        Err(Self::unavailable(key))
    }

    fn set(&self, key: &str, _value: &str) -> ConsentResult<()> {
        Err(Self::unavailable(key))
    }

    fn remove(&self, key: &str) -> ConsentResult<bool> {
        Err(Self::unavailable(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_missing_returns_none() {
        let kv = MemoryKvStore::new();
        assert!(kv.get("nonexistent").expect("get").is_none());
    }

    #[test]
    fn set_and_get() {
        let kv = MemoryKvStore::new();
        kv.set("theme", "dark").expect("set");
        assert_eq!(kv.get("theme").expect("get").as_deref(), Some("dark"));
    }

    #[test]
    fn set_overwrites() {
        let kv = MemoryKvStore::new();
        kv.set("key", "one").expect("set");
        kv.set("key", "two").expect("set");
        assert_eq!(kv.get("key").expect("get").as_deref(), Some("two"));
    }

    #[test]
    fn remove_existing_key() {
        let kv = MemoryKvStore::new();
        kv.set("key", "1").expect("set");
        assert!(kv.remove("key").expect("remove"));
        assert!(!kv.remove("key").expect("remove"));
        assert!(kv.get("key").expect("get").is_none());
    }

    #[test]
    fn unavailable_store_fails_everything() {
        let kv = UnavailableKvStore;
        assert!(matches!(
            kv.get("k"),
            Err(ConsentError::StorageUnavailable(_))
        ));
        assert!(kv.set("k", "v").is_err());
        assert!(kv.remove("k").is_err());
    }
}
