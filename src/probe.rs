//! Platform status probe
//!
//! One idempotent read of backend readiness. Failures never propagate as
//! errors of the caller's own; they collapse into [`Unreachable`] and the
//! caller picks its fallback. No retries here.

use std::sync::Arc;
use tracing::{debug, warn};

use crate::api::ControlPlane;
use crate::error::ConsoleError;
use crate::models::PlatformStatus;

/// Probe outcome when the backend cannot be read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unreachable {
    pub reason: String,
}

impl std::fmt::Display for Unreachable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "platform unreachable: {}", self.reason)
    }
}

pub type ProbeResult = std::result::Result<PlatformStatus, Unreachable>;

#[derive(Clone)]
pub struct PlatformStatusProbe {
    api: Arc<dyn ControlPlane>,
}

impl PlatformStatusProbe {
    pub fn new(api: Arc<dyn ControlPlane>) -> Self {
        Self { api }
    }

    pub async fn fetch_platform_status(&self) -> ProbeResult {
        match self.api.platform_status().await {
            Ok(status) => {
                debug!(
                    has_admin = status.has_admin,
                    has_tunnel = status.has_tunnel,
                    services = status.services.len(),
                    "Platform status"
                );
                Ok(status)
            }
            Err(e) => {
                warn!("Platform status probe failed: {}", e);
                Err(Unreachable {
                    reason: e.to_string(),
                })
            }
        }
    }
}

impl From<Unreachable> for ConsoleError {
    fn from(err: Unreachable) -> Self {
        ConsoleError::Unreachable(err.reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unreachable_into_console_error() {
        let err: ConsoleError = Unreachable {
            reason: "connection refused".into(),
        }
        .into();
        assert_eq!(err, ConsoleError::Unreachable("connection refused".into()));
        assert_eq!(err.to_string(), "Platform unreachable: connection refused");
    }
}
