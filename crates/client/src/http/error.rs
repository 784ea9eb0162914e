//! API client error types.

use std::sync::Arc;
use std::time::Duration;

use toolbelt_core::ConfigError;

/// Errors from provider API calls.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Credential rejected (401 / 403).
    #[error("authentication failed ({status}): {message}")]
    Auth { status: u16, message: String },

    /// Rate limited by the provider (429).
    #[error("rate limited by provider{}", retry_hint(.retry_after))]
    RateLimited { retry_after: Option<Duration> },

    /// Provider-side failure (5xx).
    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// Any other 4xx, carrying the provider's own message.
    #[error("request rejected ({status}): {message}")]
    Provider { status: u16, message: String },

    /// The requested resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Request timeout.
    #[error("request timed out")]
    Timeout,

    /// Connection or transport failure.
    #[error("network error: {0}")]
    Network(Arc<reqwest::Error>),

    /// Response body did not match the expected shape.
    #[error("could not parse response: {0}")]
    Parse(String),

    /// Rejected before any request was sent.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Cache or session storage failure.
    #[error(transparent)]
    Storage(#[from] toolbelt_core::Error),
}

fn retry_hint(retry_after: &Option<Duration>) -> String {
    retry_after.map(|d| format!(", retry after {}s", d.as_secs())).unwrap_or_default()
}

impl ApiError {
    /// Whether the retry policy may repeat the request: 429 and 5xx only.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ApiError::RateLimited { .. } | ApiError::Server { .. })
    }

    /// Delay requested by the provider, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            ApiError::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }

    /// HTTP status that produced this error, if it came from a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Auth { status, .. } | ApiError::Server { status, .. } | ApiError::Provider { status, .. } => {
                Some(*status)
            }
            ApiError::RateLimited { .. } => Some(429),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() { ApiError::Timeout } else { ApiError::Network(Arc::new(err)) }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Parse(err.to_string())
    }
}
