//! Scripted in-memory control plane shared by the integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::StatusCode;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

use deployx_console::api::{ApiResult, ControlPlane};
use deployx_console::models::{
    AccessToken, AuditLogEntry, NewProject, PlatformStatus, Project, Registration, ServiceInfo,
    TunnelConfig, TunnelSettings, TunnelSetupResponse, UserProfile,
};
use deployx_console::ApiError;

pub struct Account {
    pub username: String,
    pub password: String,
    pub token: String,
    pub is_superuser: bool,
}

pub struct FakeControlPlane {
    pub status: Mutex<ApiResult<PlatformStatus>>,
    pub accounts: Mutex<Vec<Account>>,
    pub login_failure: Mutex<Option<ApiError>>,
    pub register_result: Mutex<ApiResult<()>>,
    pub tunnel_config: Mutex<ApiResult<TunnelSettings>>,
    pub tunnel_setup: Mutex<ApiResult<TunnelSetupResponse>>,
    pub projects: Mutex<ApiResult<Vec<Project>>>,
    pub create_failure: Mutex<Option<ApiError>>,
    pub delete_failure: Mutex<Option<ApiError>>,
    pub audit_logs: Mutex<ApiResult<Vec<AuditLogEntry>>>,
    pub delays: Mutex<HashMap<&'static str, Duration>>,
    pub tunnel_gate: Mutex<Option<Arc<Notify>>>,
    pub calls: Mutex<Vec<&'static str>>,
    pub tokens_seen: Mutex<Vec<String>>,
    pub last_audit_limit: Mutex<Option<u32>>,
    pub registrations: Mutex<Vec<String>>,
}

impl FakeControlPlane {
    pub fn new() -> Self {
        Self {
            status: Mutex::new(Ok(platform_status(true))),
            accounts: Mutex::new(Vec::new()),
            login_failure: Mutex::new(None),
            register_result: Mutex::new(Ok(())),
            tunnel_config: Mutex::new(Err(ApiError::NotFound(Some(
                "No Cloudflare configuration found".into(),
            )))),
            tunnel_setup: Mutex::new(Err(rejected(StatusCode::BAD_REQUEST, None))),
            projects: Mutex::new(Ok(Vec::new())),
            create_failure: Mutex::new(None),
            delete_failure: Mutex::new(None),
            audit_logs: Mutex::new(Ok(Vec::new())),
            delays: Mutex::new(HashMap::new()),
            tunnel_gate: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
            tokens_seen: Mutex::new(Vec::new()),
            last_audit_limit: Mutex::new(None),
            registrations: Mutex::new(Vec::new()),
        }
    }

    pub fn with_account(self, username: &str, password: &str, token: &str, is_superuser: bool) -> Self {
        self.accounts.lock().push(Account {
            username: username.into(),
            password: password.into(),
            token: token.into(),
            is_superuser,
        });
        self
    }

    pub fn set_status(&self, status: ApiResult<PlatformStatus>) {
        *self.status.lock() = status;
    }

    pub fn set_tunnel_setup(&self, result: ApiResult<TunnelSetupResponse>) {
        *self.tunnel_setup.lock() = result;
    }

    pub fn set_tunnel_config(&self, result: ApiResult<TunnelSettings>) {
        *self.tunnel_config.lock() = result;
    }

    pub fn set_projects(&self, result: ApiResult<Vec<Project>>) {
        *self.projects.lock() = result;
    }

    pub fn set_audit_logs(&self, result: ApiResult<Vec<AuditLogEntry>>) {
        *self.audit_logs.lock() = result;
    }

    pub fn delay(&self, call: &'static str, delay: Duration) {
        self.delays.lock().insert(call, delay);
    }

    /// Hold `setup_tunnel` until the returned handle is notified
    pub fn gate_tunnel_setup(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.tunnel_gate.lock() = Some(gate.clone());
        gate
    }

    pub fn calls_to(&self, call: &str) -> usize {
        self.calls.lock().iter().filter(|c| **c == call).count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().len()
    }

    async fn enter(&self, call: &'static str) {
        self.calls.lock().push(call);
        let delay = self.delays.lock().get(call).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }

    fn authorize(&self, token: &str) -> ApiResult<()> {
        if token.is_empty() {
            return Err(ApiError::MissingToken);
        }
        self.tokens_seen.lock().push(token.to_string());
        Ok(())
    }
}

#[async_trait]
impl ControlPlane for FakeControlPlane {
    async fn platform_status(&self) -> ApiResult<PlatformStatus> {
        self.enter("platform_status").await;
        self.status.lock().clone()
    }

    async fn login(&self, username: &str, password: &str) -> ApiResult<AccessToken> {
        self.enter("login").await;
        if let Some(err) = self.login_failure.lock().clone() {
            return Err(err);
        }
        self.accounts
            .lock()
            .iter()
            .find(|a| a.username == username && a.password == password)
            .map(|a| AccessToken {
                access_token: a.token.clone(),
                token_type: Some("bearer".into()),
            })
            .ok_or_else(|| {
                rejected(StatusCode::UNAUTHORIZED, Some("Incorrect username or password"))
            })
    }

    async fn identity(&self, token: &str) -> ApiResult<UserProfile> {
        self.enter("identity").await;
        self.authorize(token)?;
        self.accounts
            .lock()
            .iter()
            .find(|a| a.token == token)
            .map(|a| UserProfile {
                username: a.username.clone(),
                is_superuser: a.is_superuser,
                email: None,
            })
            .ok_or_else(|| rejected(StatusCode::UNAUTHORIZED, Some("Could not validate credentials")))
    }

    async fn register(&self, registration: &Registration) -> ApiResult<()> {
        self.enter("register").await;
        let result = self.register_result.lock().clone();
        if result.is_ok() {
            self.registrations.lock().push(registration.username.clone());
        }
        result
    }

    async fn tunnel_config(&self, token: &str) -> ApiResult<TunnelSettings> {
        self.enter("tunnel_config").await;
        self.authorize(token)?;
        self.tunnel_config.lock().clone()
    }

    async fn setup_tunnel(&self, token: &str, _config: &TunnelConfig) -> ApiResult<TunnelSetupResponse> {
        self.enter("setup_tunnel").await;
        self.authorize(token)?;
        let gate = self.tunnel_gate.lock().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.tunnel_setup.lock().clone()
    }

    async fn list_projects(&self, token: &str) -> ApiResult<Vec<Project>> {
        self.enter("list_projects").await;
        self.authorize(token)?;
        self.projects.lock().clone()
    }

    async fn create_project(&self, token: &str, new: &NewProject) -> ApiResult<Project> {
        self.enter("create_project").await;
        self.authorize(token)?;
        if let Some(err) = self.create_failure.lock().clone() {
            return Err(err);
        }
        let mut projects = self.projects.lock();
        let list = projects.as_mut().map_err(|e| e.clone())?;
        let created = Project {
            description: new.description.clone(),
            repository_url: new.repository_url.clone(),
            ..project(&(list.len() + 1).to_string(), &new.name)
        };
        list.push(created.clone());
        Ok(created)
    }

    async fn delete_project(&self, token: &str, id: &str) -> ApiResult<()> {
        self.enter("delete_project").await;
        self.authorize(token)?;
        if let Some(err) = self.delete_failure.lock().clone() {
            return Err(err);
        }
        if let Ok(list) = self.projects.lock().as_mut() {
            list.retain(|p| p.id != id);
        }
        Ok(())
    }

    async fn audit_logs(&self, token: &str, limit: u32) -> ApiResult<Vec<AuditLogEntry>> {
        self.enter("audit_logs").await;
        self.authorize(token)?;
        *self.last_audit_limit.lock() = Some(limit);
        self.audit_logs.lock().clone()
    }
}

pub fn rejected(status: StatusCode, detail: Option<&str>) -> ApiError {
    ApiError::Rejected {
        status,
        detail: detail.map(String::from),
    }
}

pub fn platform_status(has_admin: bool) -> PlatformStatus {
    PlatformStatus {
        platform: Some("DeployX".into()),
        version: Some("1.0.0".into()),
        has_admin,
        services: vec![
            ServiceInfo {
                name: "Backend (FastAPI)".into(),
                status: "healthy".into(),
                port: Some(3001),
            },
            ServiceInfo {
                name: "Cloudflare Tunnel".into(),
                status: "not configured".into(),
                port: None,
            },
        ],
        has_tunnel: false,
        public_url: None,
    }
}

pub fn tunnel_success(url: &str) -> TunnelSetupResponse {
    TunnelSetupResponse {
        public_url: url.into(),
        success: Some(true),
        message: Some("Tunnel created".into()),
        tunnel_id: Some("tun-1".into()),
        subdomain: None,
    }
}

pub fn tunnel_settings(subdomain: &str, domain: &str) -> TunnelSettings {
    TunnelSettings {
        subdomain: subdomain.into(),
        domain: Some(domain.into()),
        tunnel_id: Some("tun-1".into()),
        tunnel_name: Some("deployx".into()),
        is_active: true,
    }
}

pub fn project(id: &str, name: &str) -> Project {
    Project {
        id: id.into(),
        name: name.into(),
        description: None,
        repository_url: None,
        status: "created".into(),
        last_deployed_at: None,
        created_at: Some("2024-05-01T10:30:00".into()),
    }
}

pub fn audit_entry(id: &str, action: &str) -> AuditLogEntry {
    AuditLogEntry {
        id: id.into(),
        action: action.into(),
        resource_type: Some("user".into()),
        resource_id: None,
        details: None,
        created_at: "2024-05-01T10:30:00".into(),
    }
}
