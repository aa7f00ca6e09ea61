//! Failure taxonomy for completion calls.

use std::fmt;

use thiserror::Error;

/// Why a completion call produced no text.
///
/// Every variant renders a distinct message suitable for showing to the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// The call did not finish within the configured timeout.
    #[error("The model did not respond within {secs} seconds")]
    Timeout { secs: u64 },

    /// The provider asked us to slow down.
    #[error("Rate limited by the model provider, please try again later ({message})")]
    RateLimited { message: String },

    /// The provider returned a structured error.
    #[error("Model provider error (HTTP {status}): {message}")]
    ServiceError { status: u16, message: String },

    /// The call succeeded but the reply held no generated content.
    #[error("Malformed response: no generated content in the reply ({detail})")]
    MalformedResponse { detail: String },

    /// Anything else: connection, DNS, TLS, or body read failures.
    #[error("Unexpected error calling the model provider: {detail}")]
    Unknown { detail: String },
}

/// Fieldless view of [`GatewayError`] for matching and reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    Timeout,
    RateLimited,
    ServiceError,
    MalformedResponse,
    Unknown,
}

impl GatewayError {
    pub fn kind(&self) -> FailureKind {
        match self {
            GatewayError::Timeout { .. } => FailureKind::Timeout,
            GatewayError::RateLimited { .. } => FailureKind::RateLimited,
            GatewayError::ServiceError { .. } => FailureKind::ServiceError,
            GatewayError::MalformedResponse { .. } => FailureKind::MalformedResponse,
            GatewayError::Unknown { .. } => FailureKind::Unknown,
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureKind::Timeout => "timeout",
            FailureKind::RateLimited => "rate_limited",
            FailureKind::ServiceError => "service_error",
            FailureKind::MalformedResponse => "malformed_response",
            FailureKind::Unknown => "unknown",
        };
        f.write_str(name)
    }
}
