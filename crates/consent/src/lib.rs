//! Cookie and tracking consent management.
//!
//! This crate provides:
//! - A consent store that persists the user's decision and notifies listeners
//! - A negotiation flow that decides when to prompt and resolves user actions
//! - Pluggable storage media (memory, file, unavailable)
//! - Collaborator gating for scripts that depend on a consent category

pub mod collaborator;
pub mod config;
pub mod error;
pub mod flow;
pub mod preferences;
pub mod storage;
pub mod store;

// Re-export main types
pub use collaborator::{attach, Collaborator};
pub use config::ConsentConfig;
pub use error::{ConsentError, ConsentResult};
pub use flow::{ConsentDecisionState, ConsentFlow, FlowAction};
pub use preferences::{ConsentCategory, ConsentPreferences, ConsentSelection};
pub use storage::{FileKvStore, KvStore, MemoryKvStore, SharedKvStore, UnavailableKvStore};
pub use store::{ConsentStore, Subscription, WriteOutcome};
