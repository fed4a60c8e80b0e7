//! Configuration management

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Duration;

/// Backend address used when nothing is configured
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Delay between the tunnel confirmation and the redirect to the public URL
pub const DEFAULT_REDIRECT_DELAY: Duration = Duration::from_millis(3000);

/// Audit log entries shown on the dashboard
pub const DEFAULT_AUDIT_LOG_LIMIT: u32 = 50;

/// Console configuration
#[derive(Debug, Clone)]
pub struct ConsoleConfig {
    /// DeployX backend base URL
    pub api_url: String,

    /// Session file (persisted token + identity)
    pub session_path: PathBuf,

    /// Post-provisioning redirect delay
    pub redirect_delay: Duration,

    /// Per-request transport timeout. Tunnel provisioning creates remote
    /// resources and DNS records, so keep this generous.
    pub http_timeout: Duration,

    /// Number of audit log entries requested by the dashboard
    pub audit_log_limit: u32,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            session_path: default_session_path(),
            redirect_delay: DEFAULT_REDIRECT_DELAY,
            http_timeout: Duration::from_secs(120),
            audit_log_limit: DEFAULT_AUDIT_LOG_LIMIT,
        }
    }
}

impl ConsoleConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Load configuration from any variable source; malformed numbers are errors
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(url) = var("DEPLOYX_API_URL") {
            if !url.trim().is_empty() {
                config.api_url = url.trim().trim_end_matches('/').to_string();
            }
        }

        if let Some(path) = var("DEPLOYX_SESSION_PATH") {
            config.session_path = PathBuf::from(path);
        }

        if let Some(ms) = var("DEPLOYX_REDIRECT_DELAY_MS") {
            let ms: u64 = ms
                .parse()
                .with_context(|| format!("DEPLOYX_REDIRECT_DELAY_MS must be an integer, got {ms:?}"))?;
            config.redirect_delay = Duration::from_millis(ms);
        }

        if let Some(secs) = var("DEPLOYX_HTTP_TIMEOUT_SECS") {
            let secs: u64 = secs
                .parse()
                .with_context(|| format!("DEPLOYX_HTTP_TIMEOUT_SECS must be an integer, got {secs:?}"))?;
            config.http_timeout = Duration::from_secs(secs);
        }

        if let Some(limit) = var("DEPLOYX_AUDIT_LOG_LIMIT") {
            config.audit_log_limit = limit
                .parse()
                .with_context(|| format!("DEPLOYX_AUDIT_LOG_LIMIT must be an integer, got {limit:?}"))?;
        }

        Ok(config)
    }
}

/// `<data_local_dir>/deployx/session.json`, falling back to the working directory
pub fn default_session_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("deployx")
        .join("session.json")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = ConsoleConfig::default();
        assert_eq!(config.api_url, "http://localhost:8000");
        assert_eq!(config.redirect_delay, Duration::from_millis(3000));
        assert_eq!(config.audit_log_limit, 50);
        assert!(config.session_path.ends_with("deployx/session.json"));
    }

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_overrides() {
        let config = ConsoleConfig::from_vars(vars(&[
            ("DEPLOYX_API_URL", " https://deployx.example.com/ "),
            ("DEPLOYX_REDIRECT_DELAY_MS", "500"),
            ("DEPLOYX_AUDIT_LOG_LIMIT", "10"),
        ]))
        .unwrap();
        assert_eq!(config.api_url, "https://deployx.example.com");
        assert_eq!(config.redirect_delay, Duration::from_millis(500));
        assert_eq!(config.audit_log_limit, 10);
    }

    #[test]
    fn test_malformed_numbers_fail() {
        for key in [
            "DEPLOYX_REDIRECT_DELAY_MS",
            "DEPLOYX_HTTP_TIMEOUT_SECS",
            "DEPLOYX_AUDIT_LOG_LIMIT",
        ] {
            let err = ConsoleConfig::from_vars(vars(&[(key, "fifty")])).unwrap_err();
            assert!(err.to_string().contains(key), "{key}: {err}");
        }
    }
}
