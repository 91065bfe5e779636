//! Configuration loading, validation, and management for docfill.
//!
//! Loads configuration from `~/.docfill/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use docfill_core::placeholder::DuplicateNamePolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable overriding `service.base_url`.
pub const ENV_SERVICE_URL: &str = "DOCFILL_SERVICE_URL";
/// Environment variable overriding `service.timeout_secs`.
pub const ENV_TIMEOUT_SECS: &str = "DOCFILL_TIMEOUT_SECS";

/// The root configuration structure.
///
/// Maps directly to `~/.docfill/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Remote extraction/agent service
    #[serde(default)]
    pub service: ServiceConfig,

    /// Upload behaviour
    #[serde(default)]
    pub upload: UploadConfig,

    /// Per-document session settings
    #[serde(default)]
    pub session: SessionConfig,

    /// Export naming and location
    #[serde(default)]
    pub export: ExportConfig,

    /// Where the credential is kept
    #[serde(default)]
    pub credentials: CredentialsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://127.0.0.1:8000/api".into()
}
fn default_timeout_secs() -> u64 {
    120
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Retry a failed upload once
    #[serde(default = "default_true")]
    pub retry_enabled: bool,

    /// Wait before the retry, in seconds
    #[serde(default = "default_retry_backoff_secs")]
    pub retry_backoff_secs: u64,
}

fn default_true() -> bool {
    true
}
fn default_retry_backoff_secs() -> u64 {
    20
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            retry_enabled: true,
            retry_backoff_secs: default_retry_backoff_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Chat messages kept per document; oldest are evicted first
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    /// How repeated service names are bound
    #[serde(default)]
    pub duplicate_names: DuplicateNamePolicy,
}

fn default_history_limit() -> usize {
    50
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            history_limit: default_history_limit(),
            duplicate_names: DuplicateNamePolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Inserted before the original file's extension
    #[serde(default = "default_filename_suffix")]
    pub filename_suffix: String,

    /// Directory exports are written to; the current directory when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
}

fn default_filename_suffix() -> String {
    "_filled".into()
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            filename_suffix: default_filename_suffix(),
            output_dir: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CredentialsConfig {
    /// Credential file; `~/.docfill/credentials.json` when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl AppConfig {
    /// Load configuration from the default path (~/.docfill/config.toml).
    ///
    /// Then applies environment overrides:
    /// - `DOCFILL_SERVICE_URL`
    /// - `DOCFILL_TIMEOUT_SECS`
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::load_from(&Self::config_path())?;
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply overrides read through `lookup`, then re-validate.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_SERVICE_URL) {
            self.service.base_url = url;
        }

        if let Some(raw) = lookup(ENV_TIMEOUT_SECS) {
            self.service.timeout_secs = raw.trim().parse().map_err(|_| {
                ConfigError::ValidationError(format!(
                    "{ENV_TIMEOUT_SECS} must be a whole number of seconds, got {raw:?}"
                ))
            })?;
        }

        self.validate()
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".docfill")
    }

    /// Get the configuration file path.
    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// The credential file, configured or default.
    pub fn credentials_path(&self) -> PathBuf {
        self.credentials
            .path
            .clone()
            .unwrap_or_else(|| Self::config_dir().join("credentials.json"))
    }

    /// Where an export named `filename` is written.
    pub fn export_path(&self, filename: &str) -> PathBuf {
        match &self.export.output_dir {
            Some(dir) => dir.join(filename),
            None => PathBuf::from(filename),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.service.timeout_secs)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_secs(self.upload.retry_backoff_secs)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service.base_url.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "service.base_url must not be empty".into(),
            ));
        }

        if self.service.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "service.timeout_secs must be > 0".into(),
            ));
        }

        if self.session.history_limit == 0 {
            return Err(ConfigError::ValidationError(
                "session.history_limit must be > 0".into(),
            ));
        }

        if self
            .export
            .filename_suffix
            .contains(['/', '\\', std::path::MAIN_SEPARATOR])
        {
            return Err(ConfigError::ValidationError(
                "export.filename_suffix must not contain a path separator".into(),
            ));
        }

        Ok(())
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
