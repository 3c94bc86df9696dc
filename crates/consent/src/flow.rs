//! Presentation-agnostic consent negotiation.
//!
//! `ConsentFlow` decides when the user is prompted, turns discrete user
//! actions into a `ConsentPreferences` record and hands it to the
//! [`ConsentStore`]. It reads the store but never touches the storage medium.
//!
//! ```text
//! Unknown --mount, record found--------------------------> Resolved
//! Unknown --mount, no record, after prompt delay----------> AwaitingChoice
//! AwaitingChoice --accept/reject all----------------------> Resolved
//! AwaitingChoice --show detail----------------------------> ReviewingDetail
//! ReviewingDetail --accept/reject all, save---------------> Resolved
//! ReviewingDetail --dismiss-------------------------------> (state it was opened from)
//! Resolved --show detail (seeded with last decision)------> ReviewingDetail
//! ```

mod state;
mod timer;


use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::watch;

use crate::config::ConsentConfig;
use crate::error::{ConsentError, ConsentResult};
use crate::preferences::{ConsentCategory, ConsentPreferences, ConsentSelection};
use crate::store::ConsentStore;

pub use state::{ConsentDecisionState, FlowAction};

use timer::PromptTimer;

struct Machine {
    state: ConsentDecisionState,
    mounted: bool,
    torn_down: bool,
    /// Set while a decision is being written and listeners notified.
    committing: bool,
    /// Toggles in the detail panel; `Some` only while reviewing.
    draft: Option<ConsentSelection>,
    /// Where `dismiss` returns to from the detail panel.
    detail_origin: ConsentDecisionState,
    committed: Option<ConsentPreferences>,
    timer: Option<PromptTimer>,
}

struct FlowShared {
    machine: Mutex<Machine>,
    state_tx: watch::Sender<ConsentDecisionState>,
}

impl FlowShared {
    fn set_state(&self, machine: &mut Machine, next: ConsentDecisionState) {
        if machine.state == next {
            return;
        }
        tracing::debug!(from = %machine.state, to = %next, "consent flow transition");
        machine.state = next;
        self.state_tx.send_replace(next);
    }

    fn prompt_elapsed(&self) {
        let mut machine = self.machine.lock();
        machine.timer = None;
        if machine.torn_down || machine.state != ConsentDecisionState::Unknown {
            return;
        }
        self.set_state(&mut machine, ConsentDecisionState::AwaitingChoice);
    }
}

pub struct ConsentFlow {
    store: ConsentStore,
    prompt_delay: Duration,
    shared: Arc<FlowShared>,
}

impl ConsentFlow {
    pub fn new(store: ConsentStore, prompt_delay: Duration) -> Self {
        let (state_tx, _) = watch::channel(ConsentDecisionState::Unknown);
        Self {
            store,
            prompt_delay,
            shared: Arc::new(FlowShared {
                machine: Mutex::new(Machine {
                    state: ConsentDecisionState::Unknown,
                    mounted: false,
                    torn_down: false,
                    committing: false,
                    draft: None,
                    detail_origin: ConsentDecisionState::AwaitingChoice,
                    committed: None,
                    timer: None,
                }),
                state_tx,
            }),
        }
    }

    pub fn from_config(store: ConsentStore, config: &ConsentConfig) -> Self {
        Self::new(store, config.prompt_delay())
    }

    pub fn store(&self) -> &ConsentStore {
        &self.store
    }

    pub fn state(&self) -> ConsentDecisionState {
        self.shared.machine.lock().state
    }

    /// Current detail-panel toggles, if the panel is open.
    pub fn draft(&self) -> Option<ConsentSelection> {
        self.shared.machine.lock().draft
    }

    /// The decision known to this flow: found at mount or committed since.
    pub fn preferences(&self) -> Option<ConsentPreferences> {
        self.shared.machine.lock().committed
    }

    pub fn subscribe(&self) -> watch::Receiver<ConsentDecisionState> {
        self.shared.state_tx.subscribe()
    }

    /// Look for a stored decision. Without one, the banner is surfaced after
    /// the prompt delay, which is scheduled on the current tokio runtime.
    /// A non-zero delay outside a runtime is a [`ConsentError::Config`] and
    /// leaves the flow unmounted.
    pub fn mount(&self) -> ConsentResult<ConsentDecisionState> {
        let mut machine = self.shared.machine.lock();
        ensure_live(&machine)?;
        if machine.mounted {
            return Err(invalid(machine.state, FlowAction::Mount));
        }

        if let Some(preferences) = self.store.read() {
            machine.mounted = true;
            machine.committed = Some(preferences);
            self.shared
                .set_state(&mut machine, ConsentDecisionState::Resolved);
            return Ok(machine.state);
        }

        if self.prompt_delay.is_zero() {
            machine.mounted = true;
            self.shared
                .set_state(&mut machine, ConsentDecisionState::AwaitingChoice);
            return Ok(machine.state);
        }

        let runtime = Handle::try_current().map_err(|error| {
            ConsentError::Config(format!("consent prompt delay needs a tokio runtime: {error}"))
        })?;
        let shared = Arc::downgrade(&self.shared);
        machine.timer = Some(PromptTimer::spawn(
            &runtime,
            self.prompt_delay,
            move || {
                if let Some(shared) = shared.upgrade() {
                    shared.prompt_elapsed();
                }
            },
        ));
        machine.mounted = true;
        tracing::debug!(delay = ?self.prompt_delay, "consent prompt scheduled");
        Ok(machine.state)
    }

    /// Surface the banner now, skipping whatever remains of the prompt delay.
    pub fn show_banner(&self) -> ConsentResult<ConsentDecisionState> {
        let mut machine = self.shared.machine.lock();
        ensure_live(&machine)?;
        let current = machine.state;
        match current {
            ConsentDecisionState::Unknown if machine.mounted => {
                cancel_timer(&mut machine);
                self.shared
                    .set_state(&mut machine, ConsentDecisionState::AwaitingChoice);
                Ok(machine.state)
            }
            ConsentDecisionState::AwaitingChoice => Ok(machine.state),
            state => Err(invalid(state, FlowAction::ShowBanner)),
        }
    }

    /// Open the preferences panel. Reopening after a decision seeds the
    /// toggles with that decision; otherwise everything starts off.
    pub fn show_detail(&self) -> ConsentResult<ConsentSelection> {
        let mut machine = self.shared.machine.lock();
        ensure_live(&machine)?;
        let current = machine.state;
        let (origin, seed) = match current {
            ConsentDecisionState::Unknown if machine.mounted => {
                cancel_timer(&mut machine);
                (ConsentDecisionState::AwaitingChoice, ConsentSelection::none())
            }
            ConsentDecisionState::AwaitingChoice => {
                (ConsentDecisionState::AwaitingChoice, ConsentSelection::none())
            }
            ConsentDecisionState::Resolved => {
                let last = machine
                    .committed
                    .or_else(|| self.store.last_known())
                    .map(|preferences| preferences.selection())
                    .unwrap_or_default();
                (ConsentDecisionState::Resolved, last)
            }
            ConsentDecisionState::ReviewingDetail => {
                return Ok(machine.draft.unwrap_or_default());
            }
            state => return Err(invalid(state, FlowAction::ShowDetail)),
        };
        machine.detail_origin = origin;
        machine.draft = Some(seed);
        self.shared
            .set_state(&mut machine, ConsentDecisionState::ReviewingDetail);
        Ok(seed)
    }

    pub fn toggle(
        &self,
        category: ConsentCategory,
        enabled: bool,
    ) -> ConsentResult<ConsentSelection> {
        let mut machine = self.shared.machine.lock();
        ensure_live(&machine)?;
        let state = machine.state;
        match machine.draft.as_mut() {
            Some(draft) if state == ConsentDecisionState::ReviewingDetail => {
                draft.set(category, enabled)?;
                Ok(*draft)
            }
            _ => Err(invalid(state, FlowAction::Toggle)),
        }
    }

    pub fn accept_all(&self) -> ConsentResult<ConsentPreferences> {
        self.commit(FlowAction::AcceptAll, |_| ConsentPreferences::accept_all())
    }

    /// Rejects every optional category, discarding any toggles in progress.
    pub fn reject_all(&self) -> ConsentResult<ConsentPreferences> {
        self.commit(FlowAction::RejectAll, |_| ConsentPreferences::reject_all())
    }

    /// Commit `selection` from the detail panel, replacing pending toggles.
    pub fn save_preferences(
        &self,
        selection: ConsentSelection,
    ) -> ConsentResult<ConsentPreferences> {
        self.commit(FlowAction::SavePreferences, move |_| {
            ConsentPreferences::from_selection(selection)
        })
    }

    /// Commit whatever is currently toggled in the detail panel.
    pub fn save_toggled(&self) -> ConsentResult<ConsentPreferences> {
        self.commit(FlowAction::SavePreferences, |machine| {
            ConsentPreferences::from_selection(machine.draft.unwrap_or_default())
        })
    }

    /// Close the detail panel without deciding. Elsewhere a no-op.
    pub fn dismiss(&self) -> ConsentResult<ConsentDecisionState> {
        let mut machine = self.shared.machine.lock();
        ensure_live(&machine)?;
        if machine.state == ConsentDecisionState::ReviewingDetail {
            machine.draft = None;
            let origin = machine.detail_origin;
            self.shared.set_state(&mut machine, origin);
        }
        Ok(machine.state)
    }

    /// Stop the flow. A pending prompt never fires and later actions fail
    /// with [`ConsentError::TornDown`].
    pub fn teardown(&self) {
        let mut machine = self.shared.machine.lock();
        if machine.torn_down {
            return;
        }
        machine.torn_down = true;
        cancel_timer(&mut machine);
        tracing::debug!(state = %machine.state, "consent flow torn down");
    }

    fn commit<F>(&self, action: FlowAction, resolve: F) -> ConsentResult<ConsentPreferences>
    where
        F: FnOnce(&Machine) -> ConsentPreferences,
    {
        let preferences = {
            let mut machine = self.shared.machine.lock();
            ensure_live(&machine)?;
            if machine.committing {
                return Err(ConsentError::CommitInProgress);
            }
            let allowed = match action {
                FlowAction::AcceptAll | FlowAction::RejectAll => machine.state.is_prompting(),
                _ => machine.state == ConsentDecisionState::ReviewingDetail,
            };
            if !allowed {
                return Err(invalid(machine.state, action));
            }
            machine.committing = true;
            resolve(&machine)
        };

        // The lock is released so listeners may query the flow; `committing`
        // keeps a nested decision from racing this one.
        let outcome = self.store.write(preferences);

        let mut machine = self.shared.machine.lock();
        machine.committing = false;
        machine.committed = Some(preferences);
        machine.draft = None;
        self.shared
            .set_state(&mut machine, ConsentDecisionState::Resolved);
        tracing::info!(
            %action,
            analytics = preferences.analytics(),
            marketing = preferences.marketing(),
            functional = preferences.functional(),
            ?outcome,
            "consent decision committed"
        );
        Ok(preferences)
    }
}

impl Drop for ConsentFlow {
    fn drop(&mut self) {
        self.teardown();
    }
}

fn ensure_live(machine: &Machine) -> ConsentResult<()> {
    if machine.torn_down {
        return Err(ConsentError::TornDown);
    }
    Ok(())
}

fn cancel_timer(machine: &mut Machine) {
    if let Some(timer) = machine.timer.take() {
        timer.cancel();
    }
}

fn invalid(state: ConsentDecisionState, action: FlowAction) -> ConsentError {
    ConsentError::InvalidTransition { state, action }
}
