//! Control Plane API
//!
//! The collaborator REST surface the console consumes. Flows depend on the
//! [`ControlPlane`] trait only; [`HttpControlPlane`] is the production
//! transport.
//!
//! ```text
//! GET    /api/platform/status   → PlatformStatus        (public)
//! POST   /api/auth/token        → AccessToken           (form login)
//! GET    /api/auth/me           → UserProfile           (bearer)
//! POST   /api/auth/register     → 2xx | error
//! GET    /api/cloudflare/config → TunnelSettings | 404  (bearer)
//! POST   /api/cloudflare/setup  → TunnelSetupResponse   (bearer)
//! GET    /api/projects          → Project[]             (bearer)
//! POST   /api/projects          → Project               (bearer)
//! DELETE /api/projects/{id}     → 2xx                   (bearer)
//! GET    /api/audit-logs        → AuditLogEntry[]       (bearer)
//! ```

pub mod http;

use async_trait::async_trait;

use crate::error::ApiError;
use crate::models::{
    AccessToken, AuditLogEntry, NewProject, PlatformStatus, Project, Registration, TunnelConfig,
    TunnelSettings, TunnelSetupResponse, UserProfile,
};

pub use http::HttpControlPlane;

pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// DeployX control plane operations
///
/// Every method taking `token` is a protected call; implementations must
/// answer [`ApiError::MissingToken`] for an empty token without any I/O.
#[async_trait]
pub trait ControlPlane: Send + Sync {
    async fn platform_status(&self) -> ApiResult<PlatformStatus>;

    async fn login(&self, username: &str, password: &str) -> ApiResult<AccessToken>;

    async fn identity(&self, token: &str) -> ApiResult<UserProfile>;

    async fn register(&self, registration: &Registration) -> ApiResult<()>;

    /// Stored tunnel configuration; [`ApiError::NotFound`] when none exists
    async fn tunnel_config(&self, token: &str) -> ApiResult<TunnelSettings>;

    /// Provision a tunnel. Remote resource creation plus DNS; may take seconds.
    async fn setup_tunnel(&self, token: &str, config: &TunnelConfig) -> ApiResult<TunnelSetupResponse>;

    async fn list_projects(&self, token: &str) -> ApiResult<Vec<Project>>;

    async fn create_project(&self, token: &str, project: &NewProject) -> ApiResult<Project>;

    async fn delete_project(&self, token: &str, id: &str) -> ApiResult<()>;

    async fn audit_logs(&self, token: &str, limit: u32) -> ApiResult<Vec<AuditLogEntry>>;
}

/// Precondition shared by all protected calls
pub(crate) fn require_token(token: &str) -> ApiResult<&str> {
    if token.is_empty() {
        Err(ApiError::MissingToken)
    } else {
        Ok(token)
    }
}
