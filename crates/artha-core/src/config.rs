//! Configuration management for artha.
//!
//! Loads configuration from ${ARTHA_HOME}/config.toml with sensible defaults.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Returns the default config template with comments.
///
/// This is embedded from default_config.toml at compile time.
/// To update, edit default_config.toml directly.
fn default_config_template() -> &'static str {
    include_str!("../default_config.toml")
}

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Backend origin every request is issued against.
    pub base_url: String,

    /// Transport timeout in seconds applied to each request.
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: ApiConfig::DEFAULT_BASE_URL.to_string(),
            timeout_secs: ApiConfig::DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl ApiConfig {
    pub const DEFAULT_BASE_URL: &str = "https://shreyartha.com";
    const DEFAULT_TIMEOUT_SECS: u64 = 30;

    /// Environment variable overriding the configured base URL.
    pub const BASE_URL_ENV: &str = "ARTHA_BASE_URL";

    /// Loads configuration from the default config path.
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_path())
    }

    /// Loads configuration from a specific path.
    /// Returns defaults if file doesn't exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config from {}", path.display()))
        } else {
            Ok(ApiConfig::default())
        }
    }

    /// Resolves the base URL with precedence: env > config > default.
    /// Trailing slashes are stripped so paths concatenate cleanly.
    ///
    /// # Errors
    /// Returns an error for a malformed URL.
    pub fn resolved_base_url(&self) -> Result<String> {
        if let Ok(env_url) = std::env::var(Self::BASE_URL_ENV) {
            let trimmed = env_url.trim();
            if !trimmed.is_empty() {
                validate_url(trimmed)?;
                return Ok(trimmed.trim_end_matches('/').to_string());
            }
        }

        let trimmed = self.base_url.trim();
        if !trimmed.is_empty() {
            validate_url(trimmed)?;
            return Ok(trimmed.trim_end_matches('/').to_string());
        }

        Ok(Self::DEFAULT_BASE_URL.to_string())
    }

    /// Transport timeout for each request.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Creates a fresh config file from the embedded template.
    ///
    /// # Errors
    /// Fails if the file already exists.
    pub fn init(path: &Path) -> Result<()> {
        if path.exists() {
            anyhow::bail!("Config file already exists at {}", path.display());
        }

        Self::write_config(path, default_config_template())
    }

    /// Atomically writes config content to the given path.
    fn write_config(path: &Path, content: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let tmp_path = path.with_extension("toml.tmp");
        fs::write(&tmp_path, content)
            .with_context(|| format!("Failed to write config to {}", tmp_path.display()))?;
        fs::rename(&tmp_path, path).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                tmp_path.display(),
                path.display()
            )
        })?;
        Ok(())
    }
}

/// Validates that a URL is well-formed.
fn validate_url(url: &str) -> Result<()> {
    url::Url::parse(url).with_context(|| format!("Invalid base URL: {url}"))?;
    Ok(())
}

pub mod paths {
    //! Path resolution for artha configuration and credential files.
    //!
    //! ARTHA_HOME resolution order:
    //! 1. ARTHA_HOME environment variable (if set)
    //! 2. ~/.config/artha (default)

    use std::path::PathBuf;

    /// Returns the artha home directory.
    ///
    /// Checks ARTHA_HOME env var first, falls back to ~/.config/artha
    pub fn artha_home() -> PathBuf {
        if let Ok(home) = std::env::var("ARTHA_HOME") {
            return PathBuf::from(home);
        }

        dirs::home_dir()
            .map(|h| h.join(".config").join("artha"))
            .expect("Could not determine home directory")
    }

    /// Returns the path to the config.toml file.
    pub fn config_path() -> PathBuf {
        artha_home().join("config.toml")
    }
}
