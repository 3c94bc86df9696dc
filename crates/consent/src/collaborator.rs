//! Gating for external scripts that depend on a consent category.

use std::sync::Arc;

use crate::preferences::ConsentCategory;
use crate::store::{ConsentStore, Subscription};

/// An analytics, marketing or personalization integration that switches
/// itself on or off according to one consent category.
pub trait Collaborator: Send + Sync {
    fn name(&self) -> &str;
    fn category(&self) -> ConsentCategory;
    fn set_enabled(&self, enabled: bool);
}

/// Apply the current decision to `collaborator` and keep it in sync with
/// every later write. Without a decision only `necessary` collaborators run.
pub fn attach(store: &ConsentStore, collaborator: Arc<dyn Collaborator>) -> Subscription {
    let category = collaborator.category();
    let enabled = match store.read() {
        Some(preferences) => preferences.allows(category),
        None => category.is_locked(),
    };
    tracing::debug!(collaborator = collaborator.name(), %category, enabled, "attaching collaborator");
    collaborator.set_enabled(enabled);

    store.on_change(move |preferences| {
        let enabled = preferences.allows(category);
        tracing::debug!(collaborator = collaborator.name(), %category, enabled, "consent changed");
        collaborator.set_enabled(enabled);
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preferences::{ConsentPreferences, ConsentSelection};
    use crate::storage::MemoryKvStore;
    use parking_lot::Mutex;

    struct RecordingCollaborator {
        category: ConsentCategory,
        history: Mutex<Vec<bool>>,
    }

    impl RecordingCollaborator {
        fn new(category: ConsentCategory) -> Arc<Self> {
            Arc::new(Self {
                category,
                history: Mutex::new(Vec::new()),
            })
        }

        fn history(&self) -> Vec<bool> {
            self.history.lock().clone()
        }
    }

    impl Collaborator for RecordingCollaborator {
        fn name(&self) -> &str {
            "recorder"
        }

        fn category(&self) -> ConsentCategory {
            self.category
        }

        fn set_enabled(&self, enabled: bool) {
            self.history.lock().push(enabled);
        }
    }

    fn store() -> ConsentStore {
        ConsentStore::new("cookie-consent", Arc::new(MemoryKvStore::new()))
    }

    #[test]
    fn undecided_keeps_optional_collaborators_off() {
        let store = store();
        let analytics = RecordingCollaborator::new(ConsentCategory::Analytics);
        let essential = RecordingCollaborator::new(ConsentCategory::Necessary);

        let _a = attach(&store, analytics.clone());
        let _e = attach(&store, essential.clone());

        assert_eq!(analytics.history(), vec![false]);
        assert_eq!(essential.history(), vec![true]);
    }

    #[test]
    fn follows_subsequent_writes() {
        let store = store();
        let marketing = RecordingCollaborator::new(ConsentCategory::Marketing);
        let sub = attach(&store, marketing.clone());

        store.write(ConsentPreferences::accept_all());
        store.write(ConsentPreferences::from_selection(ConsentSelection {
            analytics: true,
            marketing: false,
            functional: true,
        }));
        assert_eq!(marketing.history(), vec![false, true, false]);

        assert!(sub.unsubscribe());
        store.write(ConsentPreferences::accept_all());
        assert_eq!(marketing.history().len(), 3);
    }

    #[test]
    fn existing_decision_applied_on_attach() {
        let store = store();
        store.write(ConsentPreferences::accept_all());
        let functional = RecordingCollaborator::new(ConsentCategory::Functional);
        let _sub = attach(&store, functional.clone());
        assert_eq!(functional.history(), vec![true]);
    }
}
