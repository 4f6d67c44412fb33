//! crates/paypeek_core/src/guard.rs
//!
//! Decides whether a view is reachable for the current session state.

use crate::session::SessionSnapshot;

pub const LANDING_PATH: &str = "/";
pub const DASHBOARD_PATH: &str = "/dashboard";

/// The logical addresses of the application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Landing,
    Dashboard,
    Other(String),
}

impl Route {
    pub fn from_path(path: &str) -> Self {
        match path.trim_end_matches('/') {
            "" => Route::Landing,
            DASHBOARD_PATH => Route::Dashboard,
            _ => Route::Other(path.to_string()),
        }
    }

    pub fn path(&self) -> &str {
        match self {
            Route::Landing => LANDING_PATH,
            Route::Dashboard => DASHBOARD_PATH,
            Route::Other(path) => path,
        }
    }

    pub fn is_protected(&self) -> bool {
        matches!(self, Route::Dashboard)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardState {
    /// The initial session restore has not finished yet.
    Resolving,
    Locked,
    Unlocked,
}

impl From<&SessionSnapshot> for GuardState {
    fn from(snapshot: &SessionSnapshot) -> Self {
        if snapshot.loading {
            GuardState::Resolving
        } else if snapshot.user.is_some() {
            GuardState::Unlocked
        } else {
            GuardState::Locked
        }
    }
}

impl GuardState {
    pub fn as_str(self) -> &'static str {
        match self {
            GuardState::Resolving => "resolving",
            GuardState::Locked => "locked",
            GuardState::Unlocked => "unlocked",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Render,
    /// Show a loading placeholder; decide again once the session is resolved.
    Placeholder,
    Redirect(Route),
    /// Show the sign-in success state, then navigate once the success delay has passed.
    RedirectAfterSuccess(Route),
    NotFound,
}

pub fn decide(session: &SessionSnapshot, route: &Route) -> GuardDecision {
    match (GuardState::from(session), route) {
        (GuardState::Resolving, _) => GuardDecision::Placeholder,

        (GuardState::Locked, Route::Landing) => GuardDecision::Render,
        (GuardState::Locked, Route::Dashboard) => GuardDecision::Redirect(Route::Landing),
        (GuardState::Locked, Route::Other(_)) => GuardDecision::NotFound,

        (GuardState::Unlocked, Route::Landing) if session.just_authenticated => {
            GuardDecision::RedirectAfterSuccess(Route::Dashboard)
        }
        (GuardState::Unlocked, Route::Landing) => GuardDecision::Redirect(Route::Dashboard),
        (GuardState::Unlocked, Route::Dashboard) => GuardDecision::Render,
        (GuardState::Unlocked, Route::Other(_)) => GuardDecision::Redirect(Route::Dashboard),
    }
}
