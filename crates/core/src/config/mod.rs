//! Per-tool configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. The tool's credential environment variable (e.g. `OPENWEATHERMAP_API_KEY`)
//! 2. Prefixed environment variables (e.g. `WEATHER_CLI_TIMEOUT_MS`)
//! 3. `config.json` in the tool directory
//! 4. Built-in defaults

use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Json, Serialized},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

mod context;
mod validation;

pub use context::{ToolContext, ToolSpec};
pub use validation::ConfigError;

use crate::output::{Panel, Render, Style};

/// Configuration shared by every tool, plus free-form tool-specific keys.
///
/// Loading precedence (highest wins):
/// 1. Credential environment variable named by the [`ToolSpec`]
/// 2. Environment variables with the tool's prefix
/// 3. `config.json` in the tool directory
/// 4. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolConfig {
    /// API key, token or PAT for the provider.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Override for the provider base URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Per-request network timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Retries after the first attempt on 429 / 5xx.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Fraction of each backoff delay randomly added or removed, 0.0 to 1.0.
    #[serde(default)]
    pub retry_jitter: f64,

    /// Freshness window for cached responses, in seconds.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Tool-specific settings such as `default_model`.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_max_retries() -> u32 {
    3
}

fn default_cache_ttl_secs() -> u64 {
    300
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: None,
            timeout_ms: default_timeout_ms(),
            max_retries: default_max_retries(),
            retry_jitter: 0.0,
            cache_ttl_secs: default_cache_ttl_secs(),
            extra: BTreeMap::new(),
        }
    }
}

/// Where the effective API key came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiKeySource {
    Environment,
    ConfigFile,
    None,
}

/// What `config --show` reports. Secrets are masked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSummary {
    pub api_key_configured: bool,
    pub api_key_source: ApiKeySource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key_preview: Option<String>,
    pub config_path: String,
    pub timeout_ms: u64,
    pub max_retries: u32,
    pub retry_jitter: f64,
    pub cache_ttl_secs: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub settings: BTreeMap<String, Value>,
}

impl ToolConfig {
    /// Network timeout as Duration for use with reqwest.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Cache freshness window.
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Base URL override, falling back to the tool's provider default.
    pub fn base_url_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.base_url.as_deref().unwrap_or(default)
    }

    /// Look up a tool-specific string setting.
    pub fn setting(&self, key: &str) -> Option<&str> {
        self.extra.get(key).and_then(Value::as_str)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - `config.json` cannot be parsed
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load(ctx: &ToolContext) -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        figment = figment.merge(Json::file(ctx.config_path()));

        figment = figment.merge(
            Env::prefixed(ctx.spec().env_prefix)
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let mut config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        // Read verbatim: figment would coerce an all-digit key into a number.
        if let Some(key) = credential_from_env(ctx.spec()) {
            config.api_key = Some(key);
        }

        config.validate()?;

        tracing::debug!(tool = ctx.spec().name, path = %ctx.config_path().display(), "configuration loaded");

        Ok(config)
    }

    /// The API key, or a `MissingCredential` error carrying setup instructions.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingCredential` if no non-empty key is configured.
    pub fn require_api_key(&self, spec: &ToolSpec) -> Result<&str, ConfigError> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| ConfigError::MissingCredential {
                env_var: spec.credential_env.into(),
                hint: spec.setup_hint.into(),
            })
    }

    /// Persist a single key into `config.json`, keeping the other keys.
    ///
    /// Values that parse as JSON numbers or booleans are stored as such, so
    /// `timeout_ms 5000` round-trips as an integer. The file is written with
    /// user-only permissions because it may hold the credential.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::SaveFailed` on I/O or JSON errors and
    /// `ConfigError::Invalid` for an empty key.
    pub fn save_value(ctx: &ToolContext, key: &str, value: &str) -> Result<(), ConfigError> {
        if key.trim().is_empty() {
            return Err(ConfigError::Invalid { field: "key".into(), reason: "must not be empty".into() });
        }

        let path = ctx.config_path();
        let mut doc = read_document(&path)?;
        doc.insert(key.to_string(), parse_setting(value));

        // Reject the write when the merged document would no longer load.
        let candidate: ToolConfig = serde_json::from_value(Value::Object(doc.clone()))
            .map_err(|e| ConfigError::Invalid { field: key.into(), reason: e.to_string() })?;
        candidate.validate()?;

        ctx.ensure_dir().map_err(|e| ConfigError::SaveFailed(e.to_string()))?;
        write_document(&path, &doc)?;

        tracing::debug!(key, path = %path.display(), "configuration value saved");
        Ok(())
    }

    /// Persist the API key into `config.json`.
    ///
    /// # Errors
    ///
    /// See [`ToolConfig::save_value`].
    pub fn save_api_key(ctx: &ToolContext, api_key: &str) -> Result<(), ConfigError> {
        if api_key.trim().is_empty() {
            return Err(ConfigError::Invalid { field: "api_key".into(), reason: "must not be empty".into() });
        }
        let path = ctx.config_path();
        let mut doc = read_document(&path)?;
        doc.insert("api_key".into(), Value::String(api_key.trim().to_string()));

        ctx.ensure_dir().map_err(|e| ConfigError::SaveFailed(e.to_string()))?;
        write_document(&path, &doc)
    }

    /// Describe the effective configuration with the secret masked.
    pub fn summary(&self, ctx: &ToolContext) -> ConfigSummary {
        let api_key_source = if credential_from_env(ctx.spec()).is_some() {
            ApiKeySource::Environment
        } else if self.api_key.is_some() {
            ApiKeySource::ConfigFile
        } else {
            ApiKeySource::None
        };

        ConfigSummary {
            api_key_configured: self.require_api_key(ctx.spec()).is_ok(),
            api_key_source,
            api_key_preview: self.api_key.as_deref().map(mask_secret),
            config_path: ctx.config_path().display().to_string(),
            timeout_ms: self.timeout_ms,
            max_retries: self.max_retries,
            retry_jitter: self.retry_jitter,
            cache_ttl_secs: self.cache_ttl_secs,
            base_url: self.base_url.clone(),
            settings: self.extra.clone(),
        }
    }
}

/// Mask all but the last four characters of a secret.
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 4 {
        return "***".to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("***{tail}")
}

fn credential_from_env(spec: &ToolSpec) -> Option<String> {
    std::env::var(spec.credential_env)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_setting(value: &str) -> Value {
    match serde_json::from_str::<Value>(value) {
        Ok(v @ (Value::Number(_) | Value::Bool(_))) => v,
        _ => Value::String(value.to_string()),
    }
}

fn read_document(path: &Path) -> Result<serde_json::Map<String, Value>, ConfigError> {
    if !path.exists() {
        return Ok(serde_json::Map::new());
    }
    let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::LoadFailed(e.to_string()))?;
    match serde_json::from_str::<Value>(&raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(ConfigError::LoadFailed(format!("{} is not a JSON object", path.display()))),
        Err(e) => Err(ConfigError::LoadFailed(format!("{}: {e}", path.display()))),
    }
}

/// Write the document, creating the file as owner read/write only so the
/// credential is never readable by others, even briefly.
fn write_document(path: &Path, doc: &serde_json::Map<String, Value>) -> Result<(), ConfigError> {
    let json = serde_json::to_string_pretty(doc).map_err(|e| ConfigError::SaveFailed(e.to_string()))?;
    let mut file = open_private(path).map_err(|e| ConfigError::SaveFailed(e.to_string()))?;
    file.write_all(json.as_bytes()).map_err(|e| ConfigError::SaveFailed(e.to_string()))?;
    restrict_permissions(path)
}

#[cfg(unix)]
fn open_private(path: &Path) -> std::io::Result<File> {
    use std::os::unix::fs::OpenOptionsExt;
    OpenOptions::new().write(true).create(true).truncate(true).mode(0o600).open(path)
}

#[cfg(not(unix))]
fn open_private(path: &Path) -> std::io::Result<File> {
    OpenOptions::new().write(true).create(true).truncate(true).open(path)
}

/// `mode` only applies on creation; tighten files left by older versions.
#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<(), ConfigError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .map_err(|e| ConfigError::SaveFailed(e.to_string()))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<(), ConfigError> {
    Ok(())
}

impl Render for ConfigSummary {
    fn render(&self, style: &Style) -> String {
        let source = match self.api_key_source {
            ApiKeySource::Environment => "environment",
            ApiKeySource::ConfigFile => "config file",
            ApiKeySource::None => "not configured",
        };
        let mut panel = Panel::new("Configuration")
            .field("API key", if self.api_key_configured { style.good("configured") } else { style.bad("missing") })
            .field("Source", source);
        if let Some(preview) = &self.api_key_preview {
            panel = panel.field("Key", preview);
        }
        panel = panel
            .field("Config file", &self.config_path)
            .field("Timeout", format!("{} ms", self.timeout_ms))
            .field("Max retries", self.max_retries.to_string())
            .field("Retry jitter", self.retry_jitter.to_string())
            .field("Cache TTL", format!("{} s", self.cache_ttl_secs));
        if let Some(base_url) = &self.base_url {
            panel = panel.field("Base URL", base_url);
        }
        for (key, value) in &self.settings {
            let shown = value.as_str().map(str::to_string).unwrap_or_else(|| value.to_string());
            panel = panel.field(key, shown);
        }
        panel.render(style)
    }
}
