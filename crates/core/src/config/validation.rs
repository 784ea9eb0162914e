//! Configuration validation rules.
//!
//! This module provides validation logic for `ToolConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::ToolConfig;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("failed to save configuration: {0}")]
    SaveFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("no credential configured: {env_var} is not set\n\n{hint}")]
    MissingCredential { env_var: String, hint: String },
}

impl ToolConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `max_retries` exceeds 10
    /// - `retry_jitter` is outside 0.0 to 1.0
    /// - `cache_ttl_secs` is 0 or exceeds one day
    /// - `base_url` is set but is not an http(s) URL
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_ms < 100 {
            return Err(ConfigError::Invalid { field: "timeout_ms".into(), reason: "must be at least 100ms".into() });
        }
        if self.timeout_ms > 300_000 {
            return Err(ConfigError::Invalid {
                field: "timeout_ms".into(),
                reason: "must not exceed 5 minutes (300000ms)".into(),
            });
        }

        if self.max_retries > 10 {
            return Err(ConfigError::Invalid { field: "max_retries".into(), reason: "must not exceed 10".into() });
        }
        if !(0.0..=1.0).contains(&self.retry_jitter) {
            return Err(ConfigError::Invalid {
                field: "retry_jitter".into(),
                reason: "must be between 0.0 and 1.0".into(),
            });
        }

        if self.cache_ttl_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "cache_ttl_secs".into(),
                reason: "must be greater than 0".into(),
            });
        }
        if self.cache_ttl_secs > 86_400 {
            return Err(ConfigError::Invalid {
                field: "cache_ttl_secs".into(),
                reason: "must not exceed one day (86400s)".into(),
            });
        }

        if let Some(base_url) = &self.base_url
            && !(base_url.starts_with("https://") || base_url.starts_with("http://"))
        {
            return Err(ConfigError::Invalid {
                field: "base_url".into(),
                reason: format!("'{base_url}' is not an http(s) URL"),
            });
        }

        if let Some(base_url) = &self.base_url
            && base_url.starts_with("http://")
        {
            tracing::warn!(base_url = %base_url, "base_url uses plain http; credentials are sent unencrypted");
        }

        Ok(())
    }
}
