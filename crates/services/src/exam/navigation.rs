//! Leave-page protection for an active attempt.
//!
//! Every way of leaving (in-app link, history traversal, tab close) is
//! funnelled through one [`NavigationMediator`]. While a guard registration is
//! active, each request is held until the learner confirms or declines.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationIntent {
    /// In-app navigation, from a link or programmatic.
    Link { to: String },
    HistoryBack,
    HistoryForward,
    CloseTab,
}

impl NavigationIntent {
    #[must_use]
    pub fn is_history(&self) -> bool {
        matches!(self, Self::HistoryBack | Self::HistoryForward)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    Confirm,
}

/// Whether `intent` may leave the page without asking.
#[must_use]
pub fn evaluate(_intent: &NavigationIntent, active: bool) -> GuardDecision {
    if active {
        GuardDecision::Confirm
    } else {
        GuardDecision::Allow
    }
}

/// A navigation waiting on the learner's answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingNavigation {
    pub intent: NavigationIntent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationOutcome {
    Proceed(NavigationIntent),
    AwaitConfirmation(PendingNavigation),
    /// Tab close: the host shows its own before-unload prompt.
    PromptBeforeUnload,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Confirmed; the guard is already off, so the navigation will not prompt again.
    Proceed(NavigationIntent),
    /// Declined. History traversals carry the location to restore.
    Stay { restore_location: Option<String> },
    NothingPending,
}

#[derive(Debug)]
struct GuardState {
    token: u64,
    location: String,
    active: bool,
    pending: Option<PendingNavigation>,
}

/// Single entry point for navigation requests.
#[derive(Debug, Clone, Default)]
pub struct NavigationMediator {
    guard: Arc<Mutex<Option<GuardState>>>,
    tokens: Arc<AtomicU64>,
}

impl NavigationMediator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, Option<GuardState>> {
        self.guard.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Install the guard for the page at `location`. A newer registration
    /// replaces an older one.
    #[must_use = "dropping the registration removes the guard"]
    pub fn attach(&self, location: impl Into<String>, active: bool) -> GuardRegistration {
        let token = self.tokens.fetch_add(1, Ordering::Relaxed) + 1;
        let location = location.into();
        debug!(%location, active, "navigation guard attached");
        *self.state() = Some(GuardState {
            token,
            location,
            active,
            pending: None,
        });
        GuardRegistration {
            mediator: self.clone(),
            token,
        }
    }

    #[must_use]
    pub fn is_guarding(&self) -> bool {
        self.state().as_ref().is_some_and(|guard| guard.active)
    }

    #[must_use]
    pub fn pending(&self) -> Option<PendingNavigation> {
        self.state().as_ref().and_then(|guard| guard.pending.clone())
    }

    pub fn request(&self, intent: NavigationIntent) -> NavigationOutcome {
        let mut state = self.state();
        let Some(guard) = state.as_mut() else {
            return NavigationOutcome::Proceed(intent);
        };
        match evaluate(&intent, guard.active) {
            GuardDecision::Allow => NavigationOutcome::Proceed(intent),
            GuardDecision::Confirm if intent == NavigationIntent::CloseTab => {
                NavigationOutcome::PromptBeforeUnload
            }
            GuardDecision::Confirm => {
                debug!(?intent, "navigation held for confirmation");
                let pending = PendingNavigation { intent };
                guard.pending = Some(pending.clone());
                NavigationOutcome::AwaitConfirmation(pending)
            }
        }
    }

    /// Answer the pending confirmation.
    pub fn resolve(&self, confirmed: bool) -> Resolution {
        let mut state = self.state();
        let Some(guard) = state.as_mut() else {
            return Resolution::NothingPending;
        };
        let Some(pending) = guard.pending.take() else {
            return Resolution::NothingPending;
        };
        if confirmed {
            info!(intent = ?pending.intent, "leaving active attempt");
            guard.active = false;
            return Resolution::Proceed(pending.intent);
        }
        let restore_location = pending
            .intent
            .is_history()
            .then(|| guard.location.clone());
        Resolution::Stay { restore_location }
    }

    fn set_active(&self, token: u64, active: bool) {
        if let Some(guard) = self.state().as_mut().filter(|guard| guard.token == token) {
            guard.active = active;
            if !active {
                guard.pending = None;
            }
        }
    }

    fn detach(&self, token: u64) {
        let mut state = self.state();
        if state.as_ref().is_some_and(|guard| guard.token == token) {
            debug!("navigation guard detached");
            *state = None;
        }
    }
}

/// Live guard installation. Dropping it removes the interception.
#[derive(Debug)]
pub struct GuardRegistration {
    mediator: NavigationMediator,
    token: u64,
}

impl GuardRegistration {
    pub fn set_active(&self, active: bool) {
        self.mediator.set_active(self.token, active);
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.mediator
            .state()
            .as_ref()
            .is_some_and(|guard| guard.token == self.token && guard.active)
    }
}

impl Drop for GuardRegistration {
    fn drop(&mut self) {
        self.mediator.detach(self.token);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link(to: &str) -> NavigationIntent {
        NavigationIntent::Link { to: to.to_owned() }
    }

    #[test]
    fn decision_depends_only_on_activity() {
        assert_eq!(evaluate(&link("/home"), true), GuardDecision::Confirm);
        assert_eq!(evaluate(&NavigationIntent::CloseTab, false), GuardDecision::Allow);
    }

    #[test]
    fn unguarded_requests_proceed() {
        let mediator = NavigationMediator::new();
        assert_eq!(
            mediator.request(link("/home")),
            NavigationOutcome::Proceed(link("/home"))
        );
        let registration = mediator.attach("/exam/1", false);
        assert!(matches!(
            mediator.request(NavigationIntent::HistoryBack),
            NavigationOutcome::Proceed(_)
        ));
        drop(registration);
    }

    #[test]
    fn declined_back_stays_and_restores_location() {
        let mediator = NavigationMediator::new();
        let registration = mediator.attach("/exam/1/take", true);

        assert!(matches!(
            mediator.request(NavigationIntent::HistoryBack),
            NavigationOutcome::AwaitConfirmation(_)
        ));
        assert_eq!(
            mediator.resolve(false),
            Resolution::Stay {
                restore_location: Some("/exam/1/take".to_owned())
            }
        );
        assert!(registration.is_active());
        assert_eq!(mediator.resolve(false), Resolution::NothingPending);
    }

    #[test]
    fn confirmed_navigation_disables_guard_first() {
        let mediator = NavigationMediator::new();
        let registration = mediator.attach("/exam/1/take", true);

        mediator.request(link("/home"));
        assert_eq!(mediator.resolve(true), Resolution::Proceed(link("/home")));
        assert!(!registration.is_active());
        assert_eq!(
            mediator.request(link("/home")),
            NavigationOutcome::Proceed(link("/home"))
        );
    }

    #[test]
    fn tab_close_uses_native_prompt() {
        let mediator = NavigationMediator::new();
        let _registration = mediator.attach("/exam/1/take", true);
        assert_eq!(
            mediator.request(NavigationIntent::CloseTab),
            NavigationOutcome::PromptBeforeUnload
        );
        assert_eq!(mediator.pending(), None);
    }

    #[test]
    fn dropping_registration_removes_interception() {
        let mediator = NavigationMediator::new();
        let registration = mediator.attach("/exam/1/take", true);
        assert!(mediator.is_guarding());
        drop(registration);
        assert!(!mediator.is_guarding());
        assert!(matches!(
            mediator.request(NavigationIntent::HistoryBack),
            NavigationOutcome::Proceed(_)
        ));
    }

    #[test]
    fn stale_registration_does_not_remove_newer_guard() {
        let mediator = NavigationMediator::new();
        let first = mediator.attach("/exam/1/take", true);
        let second = mediator.attach("/exam/2/take", true);
        drop(first);
        assert!(second.is_active());
        assert!(mediator.is_guarding());
    }
}
