//! Configuration handling for bp-cli
//!
//! Configuration is stored in `.bp/config.toml` (site) and
//! `~/.config/bp-cli/config.toml` (global).

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cli::OutputFormat;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}

/// `[site]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteSection {
    /// Public URL of the site, used to build permalinks
    pub url: String,

    /// Whether the site is a network with several sites
    pub multisite: bool,

    /// Address for the seeded administrator account
    pub admin_email: String,
}

impl Default for SiteSection {
    fn default() -> Self {
        Self {
            url: "http://example.com".to_string(),
            multisite: false,
            admin_email: "admin@example.com".to_string(),
        }
    }
}

/// Which service implementation to talk to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// SQLite database inside `.bp/`
    #[default]
    Local,
    /// Remote site API over HTTP
    Remote,
}

/// `[backend]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub kind: BackendKind,

    /// Database file, relative to `.bp/`
    pub database: String,

    /// Base URL of the remote API (remote backend only)
    pub api_url: Option<String>,

    /// Request timeout in seconds (remote backend only)
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            kind: BackendKind::Local,
            database: "site.db".to_string(),
            api_url: None,
            timeout_secs: 30,
        }
    }
}

impl BackendConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Returns the API URL, failing if the remote backend has none
    pub fn require_api_url(&self) -> Result<&str, ConfigError> {
        self.api_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| {
                ConfigError::Invalid("backend.api_url is required for the remote backend".to_string())
            })
    }
}

/// Site-level configuration (`.bp/config.toml`)
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SiteConfig {
    pub site: SiteSection,
    pub backend: BackendConfig,
}

/// Global user configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GlobalConfig {
    /// Output format used when `--format` is not given
    pub default_format: Option<OutputFormat>,

    /// Editor command for `email create --edit`
    pub editor: Option<String>,
}

/// Combined configuration (global + site)
#[derive(Debug, Clone)]
pub struct Config {
    pub site: SiteSection,
    pub backend: BackendConfig,
    pub global: GlobalConfig,
}

impl Config {
    /// Loads the site configuration rooted at `root` alongside an
    /// already loaded global configuration
    pub fn for_site(root: &Path, global: GlobalConfig) -> Result<Self> {
        let SiteConfig { site, backend } = Self::load_site_config(root)?;

        Ok(Self {
            site,
            backend,
            global,
        })
    }

    /// Returns the global config directory
    pub fn global_config_dir() -> Option<PathBuf> {
        ProjectDirs::from("org", "bp-cli", "bp-cli").map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Loads global configuration
    pub fn load_global() -> Result<GlobalConfig> {
        let config_dir = match Self::global_config_dir() {
            Some(dir) => dir,
            None => return Ok(GlobalConfig::default()),
        };

        let config_path = config_dir.join("config.toml");
        if !config_path.exists() {
            return Ok(GlobalConfig::default());
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read global config: {}", config_path.display()))?;

        toml::from_str(&content)
            .map_err(|e| ConfigError::Parse(e.to_string()))
            .context("Failed to parse global config")
    }

    /// Loads site configuration from a specific root
    fn load_site_config(root: &Path) -> Result<SiteConfig> {
        let config_path = root.join(".bp").join("config.toml");

        if !config_path.exists() {
            return Ok(SiteConfig::default());
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read site config: {}", config_path.display()))?;

        toml::from_str(&content)
            .map_err(|e| ConfigError::Parse(e.to_string()))
            .context("Failed to parse site config")
    }

    /// Finds the site root by looking for a `.bp/` directory upwards from `start`
    pub fn find_site_root(start: &Path) -> Option<PathBuf> {
        let mut current = start.to_path_buf();

        loop {
            if current.join(".bp").is_dir() {
                return Some(current);
            }

            if !current.pop() {
                return None;
            }
        }
    }

    /// Writes site configuration to `.bp/config.toml` under `root`
    pub fn save_site(root: &Path, site: &SiteConfig) -> Result<()> {
        let config_path = root.join(".bp").join("config.toml");

        let content = toml::to_string_pretty(site).context("Failed to serialize site config")?;

        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write site config: {}", config_path.display()))
    }
}
