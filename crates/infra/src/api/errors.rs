//! API-specific error types
//!
//! Every failure a caller of the API client can observe, with a coarse
//! category for UI handling.

use std::time::Duration;

use reqwest::StatusCode;
use riskreg_common::auth::RefreshError;
use riskreg_common::storage::StorageError;
use riskreg_domain::RiskRegError;
use thiserror::Error;

/// Categories of API errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorCategory {
    /// The session is gone or credentials were refused; show the login surface
    Authentication,
    /// Rate limiting errors (429)
    RateLimit,
    /// Server errors (5xx)
    Server,
    /// Client errors (4xx except auth) and unexpected response bodies
    Client,
    /// Network/connection errors and timeouts
    Network,
    /// Local configuration or storage problems
    Config,
}

/// API operation errors
#[derive(Debug, Error)]
pub enum ApiError {
    /// Refresh could not produce a new access token; the session was cleared
    #[error(transparent)]
    RefreshFailed(#[from] RefreshError),

    /// The session could not be kept alive; credentials have been cleared
    #[error("Session expired, please log in again")]
    SessionExpired,

    #[error("Request timed out after {0:?}")]
    RequestTimeout(Duration),

    /// Non-2xx response other than the 401s handled by refresh
    #[error("HTTP {status}: {body}")]
    Http { status: StatusCode, body: String },

    /// Login rejected the username or password
    #[error("Incorrect username or password")]
    InvalidCredentials,

    #[error("Network error: {0}")]
    Network(String),

    /// Response body was not the expected JSON
    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    /// Request rejected locally before it was sent
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl ApiError {
    /// Get the error category for this error
    pub fn category(&self) -> ApiErrorCategory {
        match self {
            Self::RefreshFailed(_) | Self::SessionExpired | Self::InvalidCredentials => {
                ApiErrorCategory::Authentication
            }
            Self::Http { status, .. } if *status == StatusCode::TOO_MANY_REQUESTS => {
                ApiErrorCategory::RateLimit
            }
            Self::Http { status, .. } if status.is_server_error() => ApiErrorCategory::Server,
            Self::Http { status, .. }
                if *status == StatusCode::UNAUTHORIZED || *status == StatusCode::FORBIDDEN =>
            {
                ApiErrorCategory::Authentication
            }
            Self::Http { .. } | Self::Decode(_) | Self::InvalidInput(_) => ApiErrorCategory::Client,
            Self::RequestTimeout(_) | Self::Network(_) => ApiErrorCategory::Network,
            Self::Storage(_) | Self::Config(_) => ApiErrorCategory::Config,
        }
    }

    /// Status code of an HTTP error response
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the caller must re-authenticate
    pub fn requires_login(&self) -> bool {
        matches!(self, Self::RefreshFailed(_) | Self::SessionExpired)
    }

    /// Map a transport failure, naming the configured bound on timeouts
    pub(crate) fn from_transport(err: &reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            Self::RequestTimeout(timeout)
        } else if err.is_decode() {
            Self::Decode(err.to_string())
        } else if err.is_builder() {
            Self::Config(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<RiskRegError> for ApiError {
    fn from(err: RiskRegError) -> Self {
        match err {
            RiskRegError::Config(msg) => Self::Config(msg),
            RiskRegError::InvalidInput(msg) => Self::InvalidInput(msg),
            RiskRegError::Storage(msg) => Self::Storage(msg),
            RiskRegError::Network(msg) | RiskRegError::Internal(msg) => Self::Network(msg),
            RiskRegError::Auth(_) => Self::SessionExpired,
        }
    }
}
