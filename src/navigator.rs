//! Navigation capability
//!
//! Flows never change screens themselves; they ask a [`Navigator`]. Hosts
//! plug in their own (web shell, TUI, CLI), tests record intent with
//! [`RecordingNavigator`].

use parking_lot::Mutex;
use std::fmt;
use tracing::info;

/// Screens inside the console
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// First-run / sign-up screen
    Register,
    /// Sign-in screen; `just_registered` shows the "account created" notice
    Login { just_registered: bool },
    Dashboard,
}

impl Route {
    pub fn login() -> Self {
        Route::Login {
            just_registered: false,
        }
    }

    /// Path as served by the console frontend
    pub fn path(&self) -> &'static str {
        match self {
            Route::Register => "/auth/register",
            Route::Login {
                just_registered: false,
            } => "/auth/login",
            Route::Login {
                just_registered: true,
            } => "/auth/login?registered=true",
            Route::Dashboard => "/dashboard",
        }
    }
}

/// Where a navigation leads
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    Route(Route),
    /// Leave the console for an absolute URL (e.g. the new tunnel address)
    External(String),
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Destination::Route(route) => f.write_str(route.path()),
            Destination::External(url) => f.write_str(url),
        }
    }
}

impl From<Route> for Destination {
    fn from(route: Route) -> Self {
        Destination::Route(route)
    }
}

/// "Go to X" capability
pub trait Navigator: Send + Sync {
    fn navigate(&self, destination: Destination);
}

/// Navigator that only logs; used by the CLI host
#[derive(Debug, Default)]
pub struct TracingNavigator;

impl Navigator for TracingNavigator {
    fn navigate(&self, destination: Destination) {
        info!(%destination, "Navigate");
    }
}

/// Records every requested destination
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    visits: Mutex<Vec<Destination>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn visits(&self) -> Vec<Destination> {
        self.visits.lock().clone()
    }

    pub fn last(&self) -> Option<Destination> {
        self.visits.lock().last().cloned()
    }

    pub fn count(&self) -> usize {
        self.visits.lock().len()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, destination: Destination) {
        self.visits.lock().push(destination);
    }
}
