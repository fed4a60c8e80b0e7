//! Error taxonomy
//!
//! Two layers:
//! - [`ApiError`]: what the transport reports about a single collaborator call
//! - [`ConsoleError`]: what the orchestrator surfaces to a screen
//!
//! Every flow converts the first into the second at its boundary; nothing
//! below a flow decides how a failure is presented.

use reqwest::StatusCode;
use thiserror::Error;

/// Errors reported by a [`ControlPlane`](crate::api::ControlPlane) call
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// Connection refused, DNS failure, timeout
    #[error("Control plane unreachable: {0}")]
    Unreachable(String),

    /// Non-2xx answer other than 404
    #[error("Request rejected ({status}){}", .detail.as_deref().map(|d| format!(": {d}")).unwrap_or_default())]
    Rejected {
        status: StatusCode,
        detail: Option<String>,
    },

    /// 404 answer
    #[error("Resource not found{}", .0.as_deref().map(|d| format!(": {d}")).unwrap_or_default())]
    NotFound(Option<String>),

    #[error("Invalid response body: {0}")]
    Decode(String),

    /// Protected call attempted without a bearer token; never hits the network
    #[error("No session token available")]
    MissingToken,
}

impl ApiError {
    /// Provider-supplied detail message, if the backend sent one
    pub fn detail(&self) -> Option<&str> {
        match self {
            ApiError::Rejected { detail, .. } => detail.as_deref(),
            ApiError::NotFound(detail) => detail.as_deref(),
            _ => None,
        }
    }

    /// Detail message, or `fallback` when the provider gave none
    pub fn detail_or(&self, fallback: &str) -> String {
        self.detail().unwrap_or(fallback).to_string()
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound(_))
    }
}

/// Errors surfaced by the orchestrator to the host
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConsoleError {
    /// Platform status probe could not reach the backend
    #[error("Platform unreachable: {0}")]
    Unreachable(String),

    /// Local field constraint failed before any network call
    #[error("{field}: {message}")]
    ValidationFailure { field: &'static str, message: String },

    /// Login or registration rejected
    #[error("{0}")]
    AuthenticationFailure(String),

    /// Tunnel setup rejected
    #[error("{0}")]
    ProvisioningFailure(String),

    /// Optional resource missing (e.g. no tunnel configured yet)
    #[error("Not configured: {0}")]
    OptionalResourceAbsent(String),

    /// Protected operation attempted without a session
    #[error("Not authenticated")]
    NotAuthenticated,

    /// Event not accepted in the current state
    #[error("Operation not allowed while {0}")]
    InvalidState(&'static str),

    /// Any other collaborator failure
    #[error("{0}")]
    Request(String),
}

impl ConsoleError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::ValidationFailure {
            field,
            message: message.into(),
        }
    }

    /// Message suitable for an inline form error
    pub fn inline_message(&self) -> String {
        match self {
            ConsoleError::ValidationFailure { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ConsoleError>;
