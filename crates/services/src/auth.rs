use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::AuthError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Learner,
    Admin,
}

/// Signed-in user as restored from the persisted session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
    pub role: Role,
    pub token: String,
}

/// Lifecycle of the auth context. Identity is only readable once `Ready`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AuthPhase {
    #[default]
    Uninitialized,
    Hydrating,
    Ready(Option<Identity>),
}

impl AuthPhase {
    fn name(&self) -> &'static str {
        match self {
            AuthPhase::Uninitialized => "uninitialized",
            AuthPhase::Hydrating => "hydrating",
            AuthPhase::Ready(_) => "ready",
        }
    }
}

/// Shared handle on the current identity, passed explicitly to whoever needs it.
#[derive(Debug, Clone, Default)]
pub struct AuthContext {
    phase: Arc<RwLock<AuthPhase>>,
}

impl AuthContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A context that is already ready, for hosts without persisted sessions.
    #[must_use]
    pub fn ready(identity: Option<Identity>) -> Self {
        Self {
            phase: Arc::new(RwLock::new(AuthPhase::Ready(identity))),
        }
    }

    #[must_use]
    pub fn phase(&self) -> AuthPhase {
        self.phase
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(self.phase(), AuthPhase::Ready(_))
    }

    /// # Errors
    ///
    /// Returns `AuthError::InvalidTransition` unless the context is uninitialized.
    pub fn begin_hydration(&self) -> Result<(), AuthError> {
        let mut phase = self.phase.write().unwrap_or_else(PoisonError::into_inner);
        if *phase != AuthPhase::Uninitialized {
            return Err(AuthError::InvalidTransition {
                action: "begin hydration",
                phase: phase.name(),
            });
        }
        *phase = AuthPhase::Hydrating;
        Ok(())
    }

    /// Finish restoring the persisted session; `None` means signed out.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidTransition` unless hydration is in progress.
    pub fn finish_hydration(&self, identity: Option<Identity>) -> Result<(), AuthError> {
        let mut phase = self.phase.write().unwrap_or_else(PoisonError::into_inner);
        if *phase != AuthPhase::Hydrating {
            return Err(AuthError::InvalidTransition {
                action: "finish hydration",
                phase: phase.name(),
            });
        }
        debug!(signed_in = identity.is_some(), "auth hydrated");
        *phase = AuthPhase::Ready(identity);
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `AuthError::NotReady` before hydration completes.
    pub fn sign_in(&self, identity: Identity) -> Result<(), AuthError> {
        self.replace_identity(Some(identity))
    }

    /// # Errors
    ///
    /// Returns `AuthError::NotReady` before hydration completes.
    pub fn sign_out(&self) -> Result<(), AuthError> {
        self.replace_identity(None)
    }

    /// Current identity, `None` when signed out.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::NotReady` before hydration completes.
    pub fn identity(&self) -> Result<Option<Identity>, AuthError> {
        match self.phase() {
            AuthPhase::Ready(identity) => Ok(identity),
            _ => Err(AuthError::NotReady),
        }
    }

    /// # Errors
    ///
    /// Returns `AuthError::NotReady` before hydration completes.
    pub fn bearer_token(&self) -> Result<Option<String>, AuthError> {
        Ok(self.identity()?.map(|identity| identity.token))
    }

    fn replace_identity(&self, identity: Option<Identity>) -> Result<(), AuthError> {
        let mut phase = self.phase.write().unwrap_or_else(PoisonError::into_inner);
        if !matches!(*phase, AuthPhase::Ready(_)) {
            return Err(AuthError::NotReady);
        }
        *phase = AuthPhase::Ready(identity);
        Ok(())
    }
}
