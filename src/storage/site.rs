//! Site management
//!
//! Handles site initialization and opens the configured service.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use thiserror::Error;

use super::config::{BackendKind, Config, GlobalConfig, SiteConfig};
use crate::service::{LocalService, LocalSettings, RemoteService, RemoteSettings, SiteService};

#[derive(Debug, Error)]
pub enum SiteError {
    #[error("Not in a bp site. Run 'bp init' first or pass --path.")]
    NotInSite,

    #[error("No bp site at {0}. Run 'bp init' there first.")]
    NoSiteAt(PathBuf),
}

/// A site directory managed by bp
pub struct Site {
    root: PathBuf,
    config: Config,
}

impl Site {
    /// Opens an existing site at the given path
    pub fn open(root: impl Into<PathBuf>, global: GlobalConfig) -> Result<Self> {
        let root = root.into();

        if !root.join(".bp").is_dir() {
            return Err(SiteError::NoSiteAt(root).into());
        }

        let config = Config::for_site(&root, global)?;

        Ok(Self { root, config })
    }

    /// Opens the site at `path`, or the one containing the current directory
    pub fn locate(path: Option<&Path>, global: GlobalConfig) -> Result<Self> {
        match path {
            Some(path) => Self::open(path, global),
            None => {
                let cwd = std::env::current_dir().context("Failed to read current directory")?;
                let root = Config::find_site_root(&cwd).ok_or(SiteError::NotInSite)?;
                Self::open(root, global)
            }
        }
    }

    /// Initializes a site at the given path.
    ///
    /// An existing configuration is kept; `url` and `multisite` only apply
    /// to a new one.
    pub fn init(
        root: impl Into<PathBuf>,
        url: Option<&str>,
        multisite: bool,
        global: GlobalConfig,
    ) -> Result<Self> {
        let root = root.into();
        let bp_dir = root.join(".bp");

        fs::create_dir_all(&bp_dir)
            .with_context(|| format!("Failed to create .bp directory: {}", bp_dir.display()))?;

        let config_path = bp_dir.join("config.toml");
        if !config_path.exists() {
            let mut config = SiteConfig::default();
            if let Some(url) = url {
                config.site.url = url.trim_end_matches('/').to_string();
            }
            config.site.multisite = multisite;
            Config::save_site(&root, &config)?;
        }

        let gitignore_path = bp_dir.join(".gitignore");
        if !gitignore_path.exists() {
            let gitignore = r#"# Local site database
*.db
*.db-wal
*.db-shm
"#;
            fs::write(&gitignore_path, gitignore).with_context(|| {
                format!("Failed to write .gitignore: {}", gitignore_path.display())
            })?;
        }

        let site = Self::open(root, global)?;

        if site.config.backend.kind == BackendKind::Local {
            let mut local = site.local_service()?;
            local
                .install(&site.config.site.admin_email)
                .context("Failed to install site data")?;
        }

        Ok(site)
    }

    /// Returns the site root path
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the .bp directory path
    pub fn bp_dir(&self) -> PathBuf {
        self.root.join(".bp")
    }

    /// Returns the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the local database path
    pub fn database_path(&self) -> PathBuf {
        self.bp_dir().join(&self.config.backend.database)
    }

    fn local_service(&self) -> Result<LocalService> {
        let path = self.database_path();
        let settings = LocalSettings {
            site_url: self.config.site.url.clone(),
            multisite: self.config.site.multisite,
        };
        LocalService::open(&path, settings)
            .with_context(|| format!("Failed to open site database: {}", path.display()))
    }

    /// Opens the service the configuration points at
    pub fn service(&self) -> Result<Box<dyn SiteService>> {
        let backend = &self.config.backend;
        match backend.kind {
            BackendKind::Local => Ok(Box::new(self.local_service()?)),
            BackendKind::Remote => {
                let settings = RemoteSettings {
                    api_url: backend.require_api_url()?.to_string(),
                    multisite: self.config.site.multisite,
                    timeout: backend.timeout(),
                };
                let service = RemoteService::new(settings)
                    .context("Failed to create site API client")?;
                Ok(Box::new(service))
            }
        }
    }
}
