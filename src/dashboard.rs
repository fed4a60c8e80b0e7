//! Dashboard data aggregation and view controller
//!
//! Four reads feed the dashboard: platform status, tunnel configuration,
//! project list and audit log. They run concurrently and land in
//! independent slots of [`DashboardView`]; tunnel presence and public URL
//! are derived from the slots, never stored, so arrival order cannot change
//! the outcome.

use futures_util::future::BoxFuture;
use futures_util::stream::{FuturesUnordered, StreamExt};
use futures_util::FutureExt;
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::api::{ApiResult, ControlPlane};
use crate::bootstrap::{guard_protected_view, ViewAccess};
use crate::config::ConsoleConfig;
use crate::error::{ConsoleError, Result};
use crate::models::{
    AuditLogEntry, NewProject, PlatformStatus, Project, ServiceInfo, TunnelConfig, TunnelSettings,
};
use crate::navigator::{Navigator, Route};
use crate::session::SessionStore;
use crate::tunnel::TunnelProvisioningFlow;

const CREATE_PROJECT_FAILED: &str = "Failed to create project";
const DELETE_PROJECT_FAILED: &str = "Failed to delete project";

/// Dashboard view shared between the aggregator and the tunnel flow
pub type SharedDashboard = Arc<RwLock<DashboardView>>;

/// Merged dashboard state
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardView {
    status: Option<PlatformStatus>,
    tunnel_settings: Option<TunnelSettings>,
    provisioned_url: Option<String>,
    projects: Vec<Project>,
    audit_logs: Vec<AuditLogEntry>,
}

impl DashboardView {
    pub fn shared() -> SharedDashboard {
        Arc::new(RwLock::new(Self::default()))
    }

    pub fn status(&self) -> Option<&PlatformStatus> {
        self.status.as_ref()
    }

    pub fn services(&self) -> &[ServiceInfo] {
        self.status
            .as_ref()
            .map(|s| s.services.as_slice())
            .unwrap_or(&[])
    }

    pub fn tunnel_settings(&self) -> Option<&TunnelSettings> {
        self.tunnel_settings.as_ref()
    }

    /// Provisioned in this view, configured, or reported by the status read
    pub fn has_tunnel(&self) -> bool {
        self.provisioned_url.is_some()
            || self.tunnel_settings.is_some()
            || self.status.as_ref().is_some_and(|s| s.has_tunnel)
    }

    /// Precedence: provisioned > tunnel configuration > platform status
    pub fn public_url(&self) -> Option<String> {
        self.provisioned_url
            .clone()
            .or_else(|| self.tunnel_settings.as_ref().and_then(|t| t.public_url()))
            .or_else(|| self.status.as_ref().and_then(|s| s.public_url.clone()))
    }

    /// Onboarding banner condition
    pub fn needs_tunnel_setup(&self) -> bool {
        !self.has_tunnel()
    }

    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    pub fn audit_logs(&self) -> &[AuditLogEntry] {
        &self.audit_logs
    }

    /// Tunnel flow reported success; supersedes both remote reads
    pub fn record_provisioned_tunnel(&mut self, public_url: &str) {
        self.provisioned_url = Some(public_url.to_string());
    }

    pub(crate) fn replace_projects(&mut self, projects: Vec<Project>) {
        self.projects = projects;
    }

    pub(crate) fn push_project(&mut self, project: Project) {
        self.projects.push(project);
    }

    pub(crate) fn remove_project(&mut self, id: &str) -> bool {
        let before = self.projects.len();
        self.projects.retain(|p| p.id != id);
        self.projects.len() != before
    }

    /// Drop everything loaded for the previous session
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Merge one completed read. Failures leave the slot as it was; a 404 on
    /// the tunnel configuration means none exists and empties its slot.
    pub fn apply(&mut self, read: DashboardRead) -> ReadOutcome {
        match read {
            DashboardRead::Status(Ok(status)) => {
                self.status = Some(status);
                ReadOutcome::Applied
            }
            DashboardRead::TunnelConfig(Ok(settings)) => {
                self.tunnel_settings = Some(settings);
                ReadOutcome::Applied
            }
            DashboardRead::Projects(Ok(projects)) => {
                self.projects = projects;
                ReadOutcome::Applied
            }
            DashboardRead::AuditLogs(Ok(logs)) => {
                self.audit_logs = logs;
                ReadOutcome::Applied
            }
            DashboardRead::TunnelConfig(Err(e)) if e.is_not_found() => {
                self.tunnel_settings = None;
                ReadOutcome::Absent
            }
            DashboardRead::Status(Err(e))
            | DashboardRead::TunnelConfig(Err(e))
            | DashboardRead::Projects(Err(e))
            | DashboardRead::AuditLogs(Err(e)) => ReadOutcome::Failed(e.to_string()),
        }
    }

    /// Flat snapshot for rendering
    pub fn summary(&self) -> DashboardSummary {
        DashboardSummary {
            platform: self.status.as_ref().and_then(|s| s.platform.clone()),
            version: self.status.as_ref().and_then(|s| s.version.clone()),
            services: self.services().to_vec(),
            has_tunnel: self.has_tunnel(),
            public_url: self.public_url(),
            needs_tunnel_setup: self.needs_tunnel_setup(),
            projects: self.projects.clone(),
            audit_logs: self.audit_logs.clone(),
        }
    }
}

/// Serializable dashboard snapshot
#[derive(Debug, Clone, Serialize)]
pub struct DashboardSummary {
    pub platform: Option<String>,
    pub version: Option<String>,
    pub services: Vec<ServiceInfo>,
    pub has_tunnel: bool,
    pub public_url: Option<String>,
    pub needs_tunnel_setup: bool,
    pub projects: Vec<Project>,
    pub audit_logs: Vec<AuditLogEntry>,
}

/// A completed dashboard read
#[derive(Debug)]
pub enum DashboardRead {
    Status(ApiResult<PlatformStatus>),
    TunnelConfig(ApiResult<TunnelSettings>),
    Projects(ApiResult<Vec<Project>>),
    AuditLogs(ApiResult<Vec<AuditLogEntry>>),
}

impl DashboardRead {
    fn name(&self) -> &'static str {
        match self {
            DashboardRead::Status(_) => "platform_status",
            DashboardRead::TunnelConfig(_) => "tunnel_config",
            DashboardRead::Projects(_) => "projects",
            DashboardRead::AuditLogs(_) => "audit_logs",
        }
    }
}

/// What happened to one read
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// Not part of the refresh
    Skipped,
    Applied,
    /// Optional resource not configured (404)
    Absent,
    Failed(String),
}

/// Per-read outcomes of one refresh
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshReport {
    pub status: ReadOutcome,
    pub tunnel_config: ReadOutcome,
    pub projects: ReadOutcome,
    pub audit_logs: ReadOutcome,
}

impl Default for RefreshReport {
    fn default() -> Self {
        Self {
            status: ReadOutcome::Skipped,
            tunnel_config: ReadOutcome::Skipped,
            projects: ReadOutcome::Skipped,
            audit_logs: ReadOutcome::Skipped,
        }
    }
}

impl RefreshReport {
    fn record(&mut self, name: &str, outcome: ReadOutcome) {
        match name {
            "platform_status" => self.status = outcome,
            "tunnel_config" => self.tunnel_config = outcome,
            "projects" => self.projects = outcome,
            _ => self.audit_logs = outcome,
        }
    }

    /// The optional tunnel configuration, as a console-level error when absent
    pub fn tunnel_absent(&self) -> Option<ConsoleError> {
        (self.tunnel_config == ReadOutcome::Absent)
            .then(|| ConsoleError::OptionalResourceAbsent("tunnel configuration".into()))
    }

    pub fn failures(&self) -> usize {
        [&self.status, &self.tunnel_config, &self.projects, &self.audit_logs]
            .iter()
            .filter(|o| matches!(o, ReadOutcome::Failed(_)))
            .count()
    }
}

/// Fans out the four dashboard reads and merges them into the shared view
pub struct DashboardAggregator {
    api: Arc<dyn ControlPlane>,
    view: SharedDashboard,
    audit_log_limit: u32,
}

impl DashboardAggregator {
    pub fn new(api: Arc<dyn ControlPlane>, view: SharedDashboard) -> Self {
        Self {
            api,
            view,
            audit_log_limit: crate::config::DEFAULT_AUDIT_LOG_LIMIT,
        }
    }

    pub fn with_audit_log_limit(mut self, limit: u32) -> Self {
        self.audit_log_limit = limit;
        self
    }

    pub fn view(&self) -> &SharedDashboard {
        &self.view
    }

    /// Run all reads concurrently, applying each as it completes
    pub async fn refresh(&self, token: &str) -> RefreshReport {
        let api = &self.api;
        let limit = self.audit_log_limit;

        let mut reads: FuturesUnordered<BoxFuture<'_, DashboardRead>> = FuturesUnordered::new();
        reads.push(async move { DashboardRead::Status(api.platform_status().await) }.boxed());
        reads.push(async move { DashboardRead::TunnelConfig(api.tunnel_config(token).await) }.boxed());
        reads.push(async move { DashboardRead::Projects(api.list_projects(token).await) }.boxed());
        reads.push(async move { DashboardRead::AuditLogs(api.audit_logs(token, limit).await) }.boxed());

        let mut report = RefreshReport::default();
        while let Some(read) = reads.next().await {
            let name = read.name();
            let outcome = self.view.write().apply(read);
            match &outcome {
                ReadOutcome::Applied => debug!(read = name, "Dashboard read applied"),
                ReadOutcome::Absent => debug!(read = name, "Not configured"),
                ReadOutcome::Failed(reason) => warn!(read = name, "Dashboard read failed: {}", reason),
                ReadOutcome::Skipped => {}
            }
            report.record(name, outcome);
        }

        report
    }
}

/// Dashboard screen: guard, aggregation, project actions, tunnel panel
pub struct DashboardController {
    api: Arc<dyn ControlPlane>,
    session: Arc<SessionStore>,
    navigator: Arc<dyn Navigator>,
    aggregator: DashboardAggregator,
    tunnel: TunnelProvisioningFlow,
    loaded_token: Option<String>,
    project_error: Option<String>,
}

impl DashboardController {
    pub fn new(
        api: Arc<dyn ControlPlane>,
        session: Arc<SessionStore>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        let view = DashboardView::shared();
        let aggregator = DashboardAggregator::new(Arc::clone(&api), Arc::clone(&view));
        let tunnel = TunnelProvisioningFlow::new(
            Arc::clone(&api),
            Arc::clone(&session),
            Arc::clone(&navigator),
            view,
        );
        Self {
            api,
            session,
            navigator,
            aggregator,
            tunnel,
            loaded_token: None,
            project_error: None,
        }
    }

    /// Apply redirect delay and audit-log limit from configuration
    pub fn configured(mut self, config: &ConsoleConfig) -> Self {
        self = self.with_redirect_delay(config.redirect_delay);
        self.aggregator = self.aggregator.with_audit_log_limit(config.audit_log_limit);
        self
    }

    pub fn with_redirect_delay(mut self, delay: Duration) -> Self {
        self.tunnel = self.tunnel.with_redirect_delay(delay);
        self
    }

    pub fn view(&self) -> SharedDashboard {
        Arc::clone(self.aggregator.view())
    }

    pub fn summary(&self) -> DashboardSummary {
        self.aggregator.view().read().summary()
    }

    pub fn needs_tunnel_setup(&self) -> bool {
        self.aggregator.view().read().needs_tunnel_setup()
    }

    pub fn tunnel(&self) -> &TunnelProvisioningFlow {
        &self.tunnel
    }

    pub fn tunnel_mut(&mut self) -> &mut TunnelProvisioningFlow {
        &mut self.tunnel
    }

    /// Submit the tunnel panel
    pub async fn setup_tunnel(&mut self, config: TunnelConfig) -> Result<String> {
        self.tunnel.submit(config).await
    }

    /// Inline error of the last project action
    pub fn project_error(&self) -> Option<&str> {
        self.project_error.as_deref()
    }

    /// Enter the view: redirect to login without a session, otherwise load
    pub async fn enter(&mut self) -> Result<RefreshReport> {
        if guard_protected_view(&self.session, self.navigator.as_ref()) == ViewAccess::Redirected {
            self.reset_view();
            self.loaded_token = None;
            return Err(ConsoleError::NotAuthenticated);
        }

        let token = self.session.token().ok_or(ConsoleError::NotAuthenticated)?;
        if self.loaded_token.as_ref().is_some_and(|loaded| *loaded != token) {
            debug!("Different session, discarding previous dashboard state");
            self.reset_view();
        }
        let report = self.aggregator.refresh(&token).await;
        info!(failures = report.failures(), "Dashboard loaded");
        self.loaded_token = Some(token);
        Ok(report)
    }

    /// Reload when the session token changed since the last load
    pub async fn sync_session(&mut self) -> Option<Result<RefreshReport>> {
        if self.session.token() == self.loaded_token {
            return None;
        }
        debug!("Session changed, re-entering dashboard");
        Some(self.enter().await)
    }

    fn require_token(&self) -> Result<String> {
        self.session
            .token()
            .filter(|t| !t.is_empty())
            .ok_or(ConsoleError::NotAuthenticated)
    }

    /// Create a project, then re-read the list
    pub async fn create_project(&mut self, form: NewProject) -> Result<Project> {
        self.project_error = None;
        if form.name.trim().is_empty() {
            let err = ConsoleError::validation("name", "Required");
            self.project_error = Some(err.inline_message());
            return Err(err);
        }
        let token = self.require_token()?;

        let created = match self.api.create_project(&token, &form).await {
            Ok(project) => project,
            Err(e) => {
                warn!(name = %form.name, "Project creation failed: {}", e);
                let message = e.detail_or(CREATE_PROJECT_FAILED);
                self.project_error = Some(message.clone());
                return Err(ConsoleError::Request(message));
            }
        };
        info!(id = %created.id, name = %created.name, "Project created");

        match self.api.list_projects(&token).await {
            Ok(projects) => self.aggregator.view().write().replace_projects(projects),
            Err(e) => {
                // Created server-side; show it even though the list could not be re-read
                warn!("Project list reload failed: {}", e);
                self.aggregator.view().write().push_project(created.clone());
            }
        }

        Ok(created)
    }

    pub async fn delete_project(&mut self, id: &str) -> Result<()> {
        self.project_error = None;
        let token = self.require_token()?;

        if let Err(e) = self.api.delete_project(&token, id).await {
            warn!(id, "Project deletion failed: {}", e);
            let message = e.detail_or(DELETE_PROJECT_FAILED);
            self.project_error = Some(message.clone());
            return Err(ConsoleError::Request(message));
        }

        self.aggregator.view().write().remove_project(id);
        info!(id, "Project deleted");
        Ok(())
    }

    /// Clear view data and the tunnel panel left over from another session
    fn reset_view(&mut self) {
        self.tunnel.reset();
        self.aggregator.view().write().reset();
        self.project_error = None;
    }

    /// Sign out: cancel any pending tunnel redirect, clear the session and
    /// view, go to login
    pub fn logout(&mut self) {
        self.reset_view();
        self.session.logout();
        self.loaded_token = None;
        self.navigator.navigate(Route::login().into());
    }

    /// View is going away
    pub fn teardown(&mut self) -> bool {
        self.tunnel.teardown()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use reqwest::StatusCode;

    fn status(has_tunnel: bool, public_url: Option<&str>) -> PlatformStatus {
        PlatformStatus {
            has_admin: true,
            has_tunnel,
            public_url: public_url.map(String::from),
            services: vec![ServiceInfo {
                name: "Backend".into(),
                status: "healthy".into(),
                port: Some(3001),
            }],
            ..Default::default()
        }
    }

    fn settings(domain: Option<&str>) -> TunnelSettings {
        TunnelSettings {
            subdomain: "deployx".into(),
            domain: domain.map(String::from),
            tunnel_id: None,
            tunnel_name: None,
            is_active: true,
        }
    }

    fn project(id: &str) -> Project {
        Project {
            id: id.into(),
            name: format!("app-{id}"),
            description: None,
            repository_url: None,
            status: "created".into(),
            last_deployed_at: None,
            created_at: None,
        }
    }

    #[test]
    fn test_empty_view_needs_tunnel() {
        let view = DashboardView::default();
        assert!(!view.has_tunnel());
        assert!(view.needs_tunnel_setup());
        assert!(view.public_url().is_none());
        assert!(view.services().is_empty());
    }

    #[test]
    fn test_status_only() {
        let mut view = DashboardView::default();
        view.apply(DashboardRead::Status(Ok(status(true, Some("https://old.example.com")))));
        assert!(view.has_tunnel());
        assert_eq!(view.public_url().as_deref(), Some("https://old.example.com"));
        assert_eq!(view.services().len(), 1);
    }

    #[test]
    fn test_tunnel_config_supersedes_status() {
        let mut view = DashboardView::default();
        view.apply(DashboardRead::Status(Ok(status(false, None))));
        view.apply(DashboardRead::TunnelConfig(Ok(settings(Some("example.com")))));
        assert!(view.has_tunnel());
        assert_eq!(view.public_url().as_deref(), Some("https://deployx.example.com"));
    }

    #[test]
    fn test_tunnel_config_without_domain_keeps_status_url() {
        let mut view = DashboardView::default();
        view.apply(DashboardRead::TunnelConfig(Ok(settings(None))));
        view.apply(DashboardRead::Status(Ok(status(false, Some("https://status.example.com")))));
        assert!(view.has_tunnel());
        assert_eq!(view.public_url().as_deref(), Some("https://status.example.com"));
    }

    #[test]
    fn test_not_found_is_absent() {
        let mut view = DashboardView::default();
        let outcome = view.apply(DashboardRead::TunnelConfig(Err(ApiError::NotFound(None))));
        assert_eq!(outcome, ReadOutcome::Absent);
        assert!(view.tunnel_settings().is_none());
    }

    #[test]
    fn test_not_found_clears_previous_tunnel_config() {
        let mut view = DashboardView::default();
        view.apply(DashboardRead::TunnelConfig(Ok(settings(Some("example.com")))));
        assert!(view.has_tunnel());

        view.apply(DashboardRead::Status(Ok(status(false, None))));
        view.apply(DashboardRead::TunnelConfig(Err(ApiError::NotFound(None))));
        assert!(!view.has_tunnel());
        assert!(view.public_url().is_none());
    }

    #[test]
    fn test_transient_tunnel_config_failure_keeps_slot() {
        let mut view = DashboardView::default();
        view.apply(DashboardRead::TunnelConfig(Ok(settings(Some("example.com")))));
        view.apply(DashboardRead::TunnelConfig(Err(ApiError::Unreachable("timeout".into()))));
        assert_eq!(view.public_url().as_deref(), Some("https://deployx.example.com"));
    }

    #[test]
    fn test_reset_drops_provisioned_tunnel() {
        let mut view = DashboardView::default();
        view.record_provisioned_tunnel("https://alice.example.com");
        view.replace_projects(vec![project("1")]);
        view.reset();
        assert_eq!(view, DashboardView::default());
        assert!(view.needs_tunnel_setup());
    }

    #[test]
    fn test_failure_keeps_prior_value() {
        let mut view = DashboardView::default();
        view.apply(DashboardRead::Projects(Ok(vec![project("1")])));
        let outcome = view.apply(DashboardRead::Projects(Err(ApiError::Rejected {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            detail: None,
        })));
        assert!(matches!(outcome, ReadOutcome::Failed(_)));
        assert_eq!(view.projects().len(), 1);
    }

    #[test]
    fn test_provisioned_url_wins() {
        let mut view = DashboardView::default();
        view.apply(DashboardRead::Status(Ok(status(true, Some("https://status.example.com")))));
        view.apply(DashboardRead::TunnelConfig(Ok(settings(Some("example.com")))));
        view.record_provisioned_tunnel("https://new.example.org");
        assert_eq!(view.public_url().as_deref(), Some("https://new.example.org"));
    }

    #[test]
    fn test_remove_project() {
        let mut view = DashboardView::default();
        view.replace_projects(vec![project("1"), project("2")]);
        assert!(view.remove_project("1"));
        assert!(!view.remove_project("1"));
        assert_eq!(view.projects().len(), 1);
        assert_eq!(view.projects()[0].id, "2");
    }

    #[test]
    fn test_report_tunnel_absent() {
        let report = RefreshReport {
            tunnel_config: ReadOutcome::Absent,
            ..RefreshReport::default()
        };
        assert!(matches!(
            report.tunnel_absent(),
            Some(ConsoleError::OptionalResourceAbsent(_))
        ));
        assert_eq!(report.failures(), 0);
    }
}
