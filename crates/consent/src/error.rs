use crate::flow::{ConsentDecisionState, FlowAction};
use crate::preferences::ConsentCategory;

#[derive(Debug, thiserror::Error)]
pub enum ConsentError {
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Invalid config: {0}")]
    Config(String),

    #[error("Cannot {action} while {state}")]
    InvalidTransition {
        state: ConsentDecisionState,
        action: FlowAction,
    },

    #[error("{0} consent cannot be changed")]
    LockedCategory(ConsentCategory),

    #[error("A consent decision is already being committed")]
    CommitInProgress,

    #[error("Consent flow has been torn down")]
    TornDown,
}

pub type ConsentResult<T> = std::result::Result<T, ConsentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transition_error_names_state_and_action() {
        let err = ConsentError::InvalidTransition {
            state: ConsentDecisionState::Resolved,
            action: FlowAction::AcceptAll,
        };
        assert_eq!(err.to_string(), "Cannot accept all while resolved");
    }

    #[test]
    fn locked_category_message() {
        let err = ConsentError::LockedCategory(ConsentCategory::Necessary);
        assert_eq!(err.to_string(), "necessary consent cannot be changed");
    }
}
