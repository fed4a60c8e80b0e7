//! Platform data model
//!
//! Wire shapes of the DeployX control plane, decoded with serde. Field names
//! follow the backend's snake_case JSON.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status string the backend reports for a healthy service
pub const HEALTHY: &str = "healthy";

/// One internal service as reported by the platform status endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub name: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

impl ServiceInfo {
    pub fn is_healthy(&self) -> bool {
        self.status == HEALTHY
    }
}

/// Backend readiness snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformStatus {
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    pub has_admin: bool,
    #[serde(default)]
    pub services: Vec<ServiceInfo>,
    #[serde(default)]
    pub has_tunnel: bool,
    #[serde(default)]
    pub public_url: Option<String>,
}

/// Conventional public URL of a provisioned tunnel
pub fn tunnel_public_url(subdomain: &str, domain: &str) -> String {
    format!("https://{subdomain}.{domain}")
}

/// Provisioning input, as entered in the tunnel panel
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TunnelConfig {
    pub api_token: String,
    pub domain: String,
    pub subdomain: String,
}

impl TunnelConfig {
    pub fn new(
        api_token: impl Into<String>,
        domain: impl Into<String>,
        subdomain: impl Into<String>,
    ) -> Self {
        Self {
            api_token: api_token.into(),
            domain: domain.into(),
            subdomain: subdomain.into(),
        }
    }

    /// URL the tunnel is expected to serve once provisioned
    pub fn expected_public_url(&self) -> String {
        tunnel_public_url(self.subdomain.trim(), self.domain.trim())
    }
}

// api_token must never end up in logs
impl std::fmt::Debug for TunnelConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TunnelConfig")
            .field("api_token", &"<redacted>")
            .field("domain", &self.domain)
            .field("subdomain", &self.subdomain)
            .finish()
    }
}

/// Stored tunnel configuration, as returned by the tunnel-config endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TunnelSettings {
    pub subdomain: String,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub tunnel_id: Option<String>,
    #[serde(default)]
    pub tunnel_name: Option<String>,
    #[serde(default)]
    pub is_active: bool,
}

impl TunnelSettings {
    /// Public URL when both subdomain and domain are known
    pub fn public_url(&self) -> Option<String> {
        match self.domain.as_deref() {
            Some(domain) if !domain.is_empty() && !self.subdomain.is_empty() => {
                Some(tunnel_public_url(&self.subdomain, domain))
            }
            _ => None,
        }
    }
}

/// Successful tunnel-setup answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TunnelSetupResponse {
    pub public_url: String,
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub tunnel_id: Option<String>,
    #[serde(default)]
    pub subdomain: Option<String>,
}

/// Login answer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
}

/// Current-user answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub username: String,
    #[serde(default)]
    pub is_superuser: bool,
    #[serde(default)]
    pub email: Option<String>,
}

/// Registration request body
#[derive(Clone, Serialize)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub repository_url: Option<String>,
    pub status: String,
    #[serde(default)]
    pub last_deployed_at: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Project creation request body
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProject {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository_url: Option<String>,
}

impl NewProject {
    /// Build from raw form input; blank optional fields become absent
    pub fn from_form(name: &str, description: &str, repository_url: &str) -> Self {
        fn optional(value: &str) -> Option<String> {
            let trimmed = value.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }

        Self {
            name: name.trim().to_string(),
            description: optional(description),
            repository_url: optional(repository_url),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub id: String,
    pub action: String,
    #[serde(default)]
    pub resource_type: Option<String>,
    #[serde(default)]
    pub resource_id: Option<String>,
    #[serde(default)]
    pub details: Option<serde_json::Value>,
    pub created_at: String,
}

impl AuditLogEntry {
    /// Parse `created_at`; naive timestamps are taken as UTC
    pub fn created_at_utc(&self) -> Option<DateTime<Utc>> {
        if let Ok(ts) = DateTime::parse_from_rfc3339(&self.created_at) {
            return Some(ts.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(&self.created_at, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|naive| naive.and_utc())
    }
}
