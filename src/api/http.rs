//! HTTP transport for the control plane
//!
//! Thin reqwest adapter: builds requests, attaches the bearer token, and maps
//! responses onto [`ApiError`]. Error bodies follow FastAPI's
//! `{"detail": "..."}` convention.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::{require_token, ApiResult, ControlPlane};
use crate::config::ConsoleConfig;
use crate::error::ApiError;
use crate::models::{
    AccessToken, AuditLogEntry, NewProject, PlatformStatus, Project, Registration, TunnelConfig,
    TunnelSettings, TunnelSetupResponse, UserProfile,
};

const PLATFORM_STATUS_PATH: &str = "/api/platform/status";
const LOGIN_PATH: &str = "/api/auth/token";
const IDENTITY_PATH: &str = "/api/auth/me";
const REGISTER_PATH: &str = "/api/auth/register";
const TUNNEL_CONFIG_PATH: &str = "/api/cloudflare/config";
const TUNNEL_SETUP_PATH: &str = "/api/cloudflare/setup";
const PROJECTS_PATH: &str = "/api/projects";
const AUDIT_LOGS_PATH: &str = "/api/audit-logs";

/// FastAPI error body
#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: Option<serde_json::Value>,
}

#[derive(Serialize)]
struct TunnelSetupRequest<'a> {
    api_token: &'a str,
    domain: &'a str,
    subdomain: &'a str,
}

/// Control plane client over HTTP
#[derive(Clone)]
pub struct HttpControlPlane {
    client: Client,
    base_url: String,
}

impl HttpControlPlane {
    /// Create a client for `base_url` (e.g. `http://localhost:8000`)
    pub fn new(base_url: &str, timeout: Duration) -> ApiResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Unreachable(format!("HTTP client setup failed: {e}")))?;

        Ok(Self::with_client(client, base_url))
    }

    /// Wrap an existing reqwest client
    pub fn with_client(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Create from config
    pub fn from_config(config: &ConsoleConfig) -> ApiResult<Self> {
        Self::new(&config.api_url, config.http_timeout)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// `/api/projects/{id}` with the id percent-encoded as a single segment
    fn project_url(&self, id: &str) -> ApiResult<Url> {
        let mut url = Url::parse(&self.url(PROJECTS_PATH))
            .map_err(|e| ApiError::Unreachable(format!("Invalid base URL {}: {e}", self.base_url)))?;
        url.path_segments_mut()
            .map_err(|_| ApiError::Unreachable(format!("Invalid base URL {}", self.base_url)))?
            .push(id);
        Ok(url)
    }

    async fn send(&self, request: RequestBuilder) -> ApiResult<Response> {
        let response = request
            .send()
            .await
            .map_err(|e| ApiError::Unreachable(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let detail = extract_detail(&body);
        debug!(%status, "Control plane rejected request");

        if status == StatusCode::NOT_FOUND {
            Err(ApiError::NotFound(detail))
        } else {
            Err(ApiError::Rejected { status, detail })
        }
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> ApiResult<T> {
        let response = self.send(request).await?;
        let text = response
            .text()
            .await
            .map_err(|e| ApiError::Unreachable(format!("Read error: {e}")))?;

        serde_json::from_str(&text).map_err(|e| ApiError::Decode(e.to_string()))
    }
}

/// Pull a string `detail` out of an error body; anything else is ignored
fn extract_detail(body: &str) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    match parsed.detail? {
        serde_json::Value::String(s) if !s.is_empty() => Some(s),
        _ => None,
    }
}

#[async_trait]
impl ControlPlane for HttpControlPlane {
    async fn platform_status(&self) -> ApiResult<PlatformStatus> {
        self.send_json(self.client.get(self.url(PLATFORM_STATUS_PATH)))
            .await
    }

    async fn login(&self, username: &str, password: &str) -> ApiResult<AccessToken> {
        let form = [("username", username), ("password", password)];
        self.send_json(self.client.post(self.url(LOGIN_PATH)).form(&form))
            .await
    }

    async fn identity(&self, token: &str) -> ApiResult<UserProfile> {
        let token = require_token(token)?;
        self.send_json(self.client.get(self.url(IDENTITY_PATH)).bearer_auth(token))
            .await
    }

    async fn register(&self, registration: &Registration) -> ApiResult<()> {
        self.send(self.client.post(self.url(REGISTER_PATH)).json(registration))
            .await
            .map(|_| ())
    }

    async fn tunnel_config(&self, token: &str) -> ApiResult<TunnelSettings> {
        let token = require_token(token)?;
        self.send_json(self.client.get(self.url(TUNNEL_CONFIG_PATH)).bearer_auth(token))
            .await
    }

    async fn setup_tunnel(&self, token: &str, config: &TunnelConfig) -> ApiResult<TunnelSetupResponse> {
        let token = require_token(token)?;
        let body = TunnelSetupRequest {
            api_token: &config.api_token,
            domain: &config.domain,
            subdomain: &config.subdomain,
        };
        self.send_json(
            self.client
                .post(self.url(TUNNEL_SETUP_PATH))
                .bearer_auth(token)
                .json(&body),
        )
        .await
    }

    async fn list_projects(&self, token: &str) -> ApiResult<Vec<Project>> {
        let token = require_token(token)?;
        self.send_json(self.client.get(self.url(PROJECTS_PATH)).bearer_auth(token))
            .await
    }

    async fn create_project(&self, token: &str, project: &NewProject) -> ApiResult<Project> {
        let token = require_token(token)?;
        self.send_json(
            self.client
                .post(self.url(PROJECTS_PATH))
                .bearer_auth(token)
                .json(project),
        )
        .await
    }

    async fn delete_project(&self, token: &str, id: &str) -> ApiResult<()> {
        let token = require_token(token)?;
        let url = self.project_url(id)?;
        self.send(self.client.delete(url).bearer_auth(token))
            .await
            .map(|_| ())
    }

    async fn audit_logs(&self, token: &str, limit: u32) -> ApiResult<Vec<AuditLogEntry>> {
        let token = require_token(token)?;
        self.send_json(
            self.client
                .get(self.url(AUDIT_LOGS_PATH))
                .query(&[("limit", limit)])
                .bearer_auth(token),
        )
        .await
    }
}
