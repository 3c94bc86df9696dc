//! Key-value storage media the consent store persists through.

pub mod file;
pub mod kv_store;

use std::sync::Arc;

pub use file::FileKvStore;
pub use kv_store::{KvStore, MemoryKvStore, UnavailableKvStore};

pub type SharedKvStore = Arc<dyn KvStore>;
