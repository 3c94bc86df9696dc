//! Negotiation states and the actions that drive them.

use std::fmt;

/// Where the user is in the consent negotiation. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConsentDecisionState {
    /// No stored decision found yet and nothing shown.
    Unknown,
    /// The banner must be shown.
    AwaitingChoice,
    /// The preferences panel is open.
    ReviewingDetail,
    /// A decision has been committed for this session.
    Resolved,
}

impl ConsentDecisionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsentDecisionState::Unknown => "unknown",
            ConsentDecisionState::AwaitingChoice => "awaiting choice",
            ConsentDecisionState::ReviewingDetail => "reviewing detail",
            ConsentDecisionState::Resolved => "resolved",
        }
    }

    pub fn is_prompting(&self) -> bool {
        matches!(
            self,
            ConsentDecisionState::AwaitingChoice | ConsentDecisionState::ReviewingDetail
        )
    }
}

impl fmt::Display for ConsentDecisionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inbound actions from the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlowAction {
    Mount,
    ShowBanner,
    ShowDetail,
    Toggle,
    AcceptAll,
    RejectAll,
    SavePreferences,
}

impl FlowAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlowAction::Mount => "mount",
            FlowAction::ShowBanner => "show banner",
            FlowAction::ShowDetail => "show detail",
            FlowAction::Toggle => "toggle",
            FlowAction::AcceptAll => "accept all",
            FlowAction::RejectAll => "reject all",
            FlowAction::SavePreferences => "save preferences",
        }
    }
}

impl fmt::Display for FlowAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
