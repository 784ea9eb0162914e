//! HTTP client wrapper shared by every provider.
//!
//! ### Behaviour
//!
//! - **Base URL**: one fixed base per provider; request paths are appended as
//!   percent-encoded segments.
//! - **Authentication**: an [`Auth`] is attached to every request.
//! - **Bodies**: JSON in, JSON out.
//! - **Status mapping**: 401/403 → [`ApiError::Auth`], 404 → [`ApiError::NotFound`],
//!   429 → [`ApiError::RateLimited`], 5xx → [`ApiError::Server`], other 4xx →
//!   [`ApiError::Provider`] with the provider's own message.
//! - **Retries**: every request runs under the client's [`RetryPolicy`].

pub mod auth;
pub mod error;

pub use auth::Auth;
pub use error::ApiError;

use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::{Method, StatusCode, header};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use toolbelt_core::ToolConfig;
use url::Url;

use crate::retry::{RetryPolicy, Sleeper, TokioSleeper};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const DEFAULT_USER_AGENT: &str = concat!("toolbelt/", env!("CARGO_PKG_VERSION"));

/// Longest provider message carried into an error.
const MAX_ERROR_MESSAGE: usize = 300;

/// API client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Provider base URL, e.g. `https://api.x.ai/v1`.
    pub base_url: String,
    /// Per-request network timeout (default: 30s).
    pub timeout: Duration,
    pub user_agent: String,
    pub auth: Auth,
    pub retry: RetryPolicy,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>, auth: Auth) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            auth,
            retry: RetryPolicy::default(),
        }
    }

    /// Base URL, timeout, retry count and jitter taken from a loaded tool config.
    pub fn from_tool_config(config: &ToolConfig, default_base_url: &str, auth: Auth) -> Self {
        Self {
            timeout: config.timeout(),
            retry: RetryPolicy::default().with_max_retries(config.max_retries).with_jitter(config.retry_jitter),
            ..Self::new(config.base_url_or(default_base_url), auth)
        }
    }
}

/// One request against the provider, relative to the base URL.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    segments: Vec<String>,
    query: Vec<(String, String)>,
    body: Option<Value>,
}

impl ApiRequest {
    fn new(method: Method, path: &str) -> Self {
        let segments = path.split('/').filter(|s| !s.is_empty()).map(str::to_string).collect();
        Self { method, segments, query: Vec::new(), body: None }
    }

    pub fn get(path: &str) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: &str) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn patch(path: &str) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: &str) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Append one path segment verbatim; it is percent-encoded on send.
    pub fn segment(mut self, segment: impl Into<String>) -> Self {
        self.segments.push(segment.into());
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    pub fn query_opt(self, key: impl Into<String>, value: Option<impl ToString>) -> Self {
        match value {
            Some(value) => self.query(key, value),
            None => self,
        }
    }

    /// Attach a JSON body.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Parse` if the body cannot be serialized.
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, ApiError> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    pub fn path(&self) -> String {
        format!("/{}", self.segments.join("/"))
    }

    pub fn query_pairs(&self) -> &[(String, String)] {
        &self.query
    }
}

/// JSON API client with auth and retry.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    config: ClientConfig,
    sleeper: Arc<dyn Sleeper>,
}

impl ApiClient {
    /// Create a client for the configured provider.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::InvalidInput` for an unusable base URL and
    /// `ApiError::Network` if the HTTP client cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| ApiError::InvalidInput(format!("invalid base URL '{}': {e}", config.base_url)))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidInput(format!("invalid base URL '{}'", config.base_url)));
        }

        let http = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()?;

        Ok(Self { http, base_url, config, sleeper: Arc::new(TokioSleeper) })
    }

    /// Replace how the client waits between retries.
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Send a request under the retry policy and decode the JSON response.
    pub async fn send<T: DeserializeOwned>(&self, request: &ApiRequest) -> Result<T, ApiError> {
        let body = self.config.retry.run(self.sleeper.as_ref(), || self.send_once(request)).await?;
        if body.trim().is_empty() {
            return serde_json::from_value(Value::Null).map_err(ApiError::from);
        }
        serde_json::from_str(&body).map_err(ApiError::from)
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send(&ApiRequest::get(path)).await
    }

    fn url_for(&self, request: &ApiRequest) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| ApiError::InvalidInput(format!("invalid base URL '{}'", self.config.base_url)))?;
            segments.pop_if_empty().extend(&request.segments);
        }
        Ok(url)
    }

    async fn send_once(&self, request: &ApiRequest) -> Result<String, ApiError> {
        let start = Instant::now();
        let url = self.url_for(request)?;

        tracing::debug!(method = %request.method, path = %request.path(), "sending request");

        let mut builder = self
            .http
            .request(request.method.clone(), url)
            .header(header::ACCEPT, "application/json");
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        builder = self.config.auth.apply(builder);

        let response = builder.send().await?;
        let status = response.status();
        let retry_after = parse_retry_after(response.headers());
        let text = response.text().await?;

        tracing::debug!(
            status = status.as_u16(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            bytes = text.len(),
            "response received"
        );

        if status.is_success() {
            return Ok(text);
        }
        Err(error_for_status(status, retry_after, &text))
    }
}

fn parse_retry_after(headers: &header::HeaderMap) -> Option<Duration> {
    headers
        .get(header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// Map a non-success status to the error the retry policy and callers expect.
pub(crate) fn error_for_status(status: StatusCode, retry_after: Option<Duration>, body: &str) -> ApiError {
    let code = status.as_u16();
    let message = provider_message(body)
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown error").to_string());

    match code {
        401 | 403 => ApiError::Auth { status: code, message },
        404 => ApiError::NotFound(message),
        429 => ApiError::RateLimited { retry_after },
        500..=599 => ApiError::Server { status: code, message },
        _ => ApiError::Provider { status: code, message },
    }
}

/// Pull a human-readable message out of a provider error body.
///
/// Recognises `{"error": {"message": ..}}`, `{"error": ".."}` and
/// `{"message": ..}`; anything else falls back to the raw text.
fn provider_message(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }

    let message = match serde_json::from_str::<Value>(body) {
        Ok(json) => {
            let error = json.get("error");
            error
                .and_then(|e| e.get("message"))
                .or_else(|| error.filter(|e| e.is_string()))
                .or_else(|| json.get("message"))
                .or_else(|| error.and_then(|e| e.get("type")))
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| body.to_string())
        }
        Err(_) => body.to_string(),
    };

    Some(truncate(&message, MAX_ERROR_MESSAGE))
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max).collect();
    out.push_str("...");
    out
}
