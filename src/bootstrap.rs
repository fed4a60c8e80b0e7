//! Bootstrap Routing
//!
//! Picks the first screen a visitor sees:
//! - **ToRegister**: no administrator exists yet (first-run onboarding)
//! - **ToDashboard**: platform ready and the session is authenticated
//! - **ToLogin**: everything else, including an unreachable backend
//!
//! The router is one-shot: it leaves `Checking` exactly once and navigates
//! exactly once.

use std::sync::Arc;
use tracing::{debug, info};

use crate::navigator::{Navigator, Route};
use crate::probe::{PlatformStatusProbe, ProbeResult};
use crate::session::SessionStore;

/// Router states; everything except `Checking` is terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapState {
    Checking,
    ToRegister,
    ToDashboard,
    ToLogin,
}

impl BootstrapState {
    pub fn is_terminal(self) -> bool {
        self != BootstrapState::Checking
    }

    /// Screen a terminal state leads to
    pub fn route(self) -> Option<Route> {
        match self {
            BootstrapState::Checking => None,
            BootstrapState::ToRegister => Some(Route::Register),
            BootstrapState::ToDashboard => Some(Route::Dashboard),
            BootstrapState::ToLogin => Some(Route::login()),
        }
    }
}

/// Transition rule. Admin existence is checked before the session so a
/// stale token cannot skip first-run admin creation.
pub fn decide(probe: &ProbeResult, is_authenticated: bool) -> BootstrapState {
    match probe {
        Err(_) => BootstrapState::ToLogin,
        Ok(status) if !status.has_admin => BootstrapState::ToRegister,
        Ok(_) if is_authenticated => BootstrapState::ToDashboard,
        Ok(_) => BootstrapState::ToLogin,
    }
}

/// One-shot entry router
pub struct BootstrapRouter {
    state: BootstrapState,
    probe: PlatformStatusProbe,
    session: Arc<SessionStore>,
    navigator: Arc<dyn Navigator>,
}

impl BootstrapRouter {
    pub fn new(
        probe: PlatformStatusProbe,
        session: Arc<SessionStore>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            state: BootstrapState::Checking,
            probe,
            session,
            navigator,
        }
    }

    pub fn state(&self) -> BootstrapState {
        self.state
    }

    /// Probe, decide, navigate. Later calls return the terminal state as is.
    pub async fn run(&mut self) -> BootstrapState {
        if self.state.is_terminal() {
            debug!("Bootstrap already resolved to {:?}", self.state);
            return self.state;
        }

        let probe = self.probe.fetch_platform_status().await;
        let next = decide(&probe, self.session.is_authenticated());
        self.state = next;

        if let Some(route) = next.route() {
            info!("Bootstrap: {:?} -> {}", next, route.path());
            self.navigator.navigate(route.into());
        }

        next
    }
}

/// Outcome of entering a view that needs a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewAccess {
    Granted,
    /// Sent to the login screen
    Redirected,
}

/// Gate for protected views: unauthenticated visitors go to login, no
/// silent recovery
pub fn guard_protected_view(session: &SessionStore, navigator: &dyn Navigator) -> ViewAccess {
    if session.is_authenticated() {
        ViewAccess::Granted
    } else {
        info!("Protected view without session, redirecting to login");
        navigator.navigate(Route::login().into());
        ViewAccess::Redirected
    }
}
