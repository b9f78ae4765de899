//! Route access checks, evaluated before a view is built.

use crate::auth::{AuthContext, AuthPhase, Role};

/// What a route needs from the current user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RouteRequirement {
    pub requires_auth: bool,
    pub required_role: Option<Role>,
}

impl RouteRequirement {
    #[must_use]
    pub fn public() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn authenticated() -> Self {
        Self {
            requires_auth: true,
            required_role: None,
        }
    }

    #[must_use]
    pub fn role(role: Role) -> Self {
        Self {
            requires_auth: true,
            required_role: Some(role),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision {
    Allow,
    /// Auth is still hydrating; render nothing yet.
    Wait,
    RedirectToLogin,
    Forbidden,
}

pub trait RouteGuard: Send + Sync {
    fn check(&self, requirement: &RouteRequirement, auth: &AuthContext) -> RouteDecision;
}

/// Holds every non-public route until the auth context is ready.
pub struct HydrationGuard;

impl RouteGuard for HydrationGuard {
    fn check(&self, requirement: &RouteRequirement, auth: &AuthContext) -> RouteDecision {
        if requirement.requires_auth && !auth.is_ready() {
            RouteDecision::Wait
        } else {
            RouteDecision::Allow
        }
    }
}

pub struct AuthenticatedGuard;

impl RouteGuard for AuthenticatedGuard {
    fn check(&self, requirement: &RouteRequirement, auth: &AuthContext) -> RouteDecision {
        if !requirement.requires_auth {
            return RouteDecision::Allow;
        }
        match auth.phase() {
            AuthPhase::Ready(Some(_)) => RouteDecision::Allow,
            AuthPhase::Ready(None) => RouteDecision::RedirectToLogin,
            _ => RouteDecision::Wait,
        }
    }
}

/// Admins pass every role check.
pub struct RoleGuard;

impl RouteGuard for RoleGuard {
    fn check(&self, requirement: &RouteRequirement, auth: &AuthContext) -> RouteDecision {
        let Some(required) = requirement.required_role else {
            return RouteDecision::Allow;
        };
        match auth.identity() {
            Ok(Some(identity)) if identity.role == required || identity.role == Role::Admin => {
                RouteDecision::Allow
            }
            Ok(Some(_)) => RouteDecision::Forbidden,
            Ok(None) => RouteDecision::RedirectToLogin,
            Err(_) => RouteDecision::Wait,
        }
    }
}

/// Ordered guards; the first decision other than `Allow` wins.
pub struct GuardChain {
    guards: Vec<Box<dyn RouteGuard>>,
}

impl Default for GuardChain {
    fn default() -> Self {
        Self::new()
            .with(HydrationGuard)
            .with(AuthenticatedGuard)
            .with(RoleGuard)
    }
}

impl GuardChain {
    #[must_use]
    pub fn new() -> Self {
        Self { guards: Vec::new() }
    }

    #[must_use]
    pub fn with(mut self, guard: impl RouteGuard + 'static) -> Self {
        self.guards.push(Box::new(guard));
        self
    }

    #[must_use]
    pub fn evaluate(&self, requirement: &RouteRequirement, auth: &AuthContext) -> RouteDecision {
        self.guards
            .iter()
            .map(|guard| guard.check(requirement, auth))
            .find(|decision| *decision != RouteDecision::Allow)
            .unwrap_or(RouteDecision::Allow)
    }
}
