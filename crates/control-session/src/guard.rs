//! Route guard contract
//!
//! Consulted before every in-app navigation. The decision only inspects the
//! already-loaded session state and never performs I/O, so it is safe to call
//! synchronously from a router hook.

use control_auth::{Redirect, SessionState};

/// Access requirements attached to a route.
///
/// The default is a private, non-admin route.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouteMeta {
    /// Reachable without a session (login page, OAuth callback)
    pub public: bool,
    /// Requires membership in an admin group
    pub admin: bool,
}

impl RouteMeta {
    pub const fn public() -> Self {
        Self {
            public: true,
            admin: false,
        }
    }

    pub const fn admin() -> Self {
        Self {
            public: false,
            admin: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    Redirect(Redirect),
}

/// Decide whether navigation to `route` may proceed.
///
/// - private route without a session → login page
/// - admin route without the admin role → dashboard
///
/// The admin role comes from the loaded profile; while it has not loaded
/// yet, admin routes redirect to the dashboard.
pub fn check(state: &SessionState, route: &RouteMeta) -> GuardDecision {
    if !route.public && !state.is_authenticated() {
        return GuardDecision::Redirect(Redirect::Login);
    }
    if route.admin && !state.is_admin() {
        return GuardDecision::Redirect(Redirect::Dashboard);
    }
    GuardDecision::Allow
}
