//! Per-tool identity and on-disk location.
//!
//! Every tool keeps its config file, cache database and session files under
//! one directory. The directory is carried explicitly in a [`ToolContext`]
//! so tests can point a tool at a temporary directory instead of `$HOME`.

use std::path::{Path, PathBuf};

use super::ConfigError;

/// Static description of a tool: its name, environment and provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolSpec {
    /// Binary name, also used for the `~/.<name>` directory.
    pub name: &'static str,
    /// Prefix for settings read from the environment (e.g. `WEATHER_CLI_`).
    pub env_prefix: &'static str,
    /// Environment variable holding the credential.
    pub credential_env: &'static str,
    /// Setup instructions printed when the credential is missing.
    pub setup_hint: &'static str,
    /// Provider base URL used when the config does not override it.
    pub default_base_url: &'static str,
}

/// Explicit replacement for ambient global state: which tool is running and
/// where its files live.
#[derive(Debug, Clone)]
pub struct ToolContext {
    spec: ToolSpec,
    dir: PathBuf,
}

impl ToolContext {
    /// Context rooted at an arbitrary directory.
    pub fn new(spec: ToolSpec, dir: impl Into<PathBuf>) -> Self {
        Self { spec, dir: dir.into() }
    }

    /// Context rooted at `~/.<tool name>`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::LoadFailed` when no home directory can be determined.
    pub fn from_home(spec: ToolSpec) -> Result<Self, ConfigError> {
        let home = dirs::home_dir()
            .ok_or_else(|| ConfigError::LoadFailed("could not determine home directory".into()))?;
        Ok(Self::new(spec, home.join(format!(".{}", spec.name))))
    }

    pub fn spec(&self) -> &ToolSpec {
        &self.spec
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the tool directory if it does not exist yet.
    pub fn ensure_dir(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.dir)
    }

    pub fn config_path(&self) -> PathBuf {
        self.dir.join("config.json")
    }

    pub fn cache_path(&self) -> PathBuf {
        self.dir.join("cache.db")
    }

    pub fn sessions_dir(&self) -> PathBuf {
        self.dir.join("sessions")
    }
}
