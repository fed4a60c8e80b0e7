//! DeployX Console
//!
//! Client-side session and onboarding orchestrator for the DeployX
//! self-hosted deployment platform.
//!
//! # Features
//!
//! - **Session**: persisted bearer token + identity, rehydrated at startup
//! - **Bootstrap Routing**: first-run registration, login or dashboard
//! - **Auth Flows**: login and registration with local validation
//! - **Tunnel Provisioning**: Cloudflare tunnel setup with delayed redirect
//! - **Dashboard**: concurrent status / tunnel / project / audit reads
//!
//! # Architecture
//!
//! ```text
//! Host (CLI / shell) ──► Flows ──► ControlPlane ──► DeployX backend
//!                          │          (reqwest)
//!                          ├── SessionStore (file / memory)
//!                          ├── BootstrapRouter
//!                          ├── LoginFlow / RegistrationFlow
//!                          ├── DashboardController
//!                          │     ├── DashboardAggregator
//!                          │     └── TunnelProvisioningFlow
//!                          └── Navigator (host-supplied)
//! ```

pub mod api;
pub mod auth;
pub mod bootstrap;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod models;
pub mod navigator;
pub mod probe;
pub mod session;
pub mod tunnel;

pub use api::{ControlPlane, HttpControlPlane};
pub use auth::{LoginFlow, LoginForm, RegisterForm, RegistrationFlow};
pub use bootstrap::{guard_protected_view, BootstrapRouter, BootstrapState, ViewAccess};
pub use config::ConsoleConfig;
pub use dashboard::{
    DashboardAggregator, DashboardController, DashboardSummary, DashboardView, ReadOutcome,
    RefreshReport, SharedDashboard,
};
pub use error::{ApiError, ConsoleError};
pub use models::{NewProject, PlatformStatus, Project, TunnelConfig};
pub use navigator::{Destination, Navigator, RecordingNavigator, Route, TracingNavigator};
pub use probe::{PlatformStatusProbe, ProbeResult, Unreachable};
pub use session::{
    FileSessionPersistence, MemorySessionPersistence, Session, SessionPersistence, SessionStore,
};
pub use tunnel::{ScheduledNavigation, TunnelEvent, TunnelProvisioningFlow, TunnelState};
