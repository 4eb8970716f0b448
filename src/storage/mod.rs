//! # Site Directory and Configuration
//!
//! A site managed by `bp` is a directory containing `.bp/`:
//!
//! ```text
//! .bp/
//! ├── config.toml   # Site URL, multisite flag, backend selection
//! ├── site.db       # Local backend database (SQLite)
//! └── .gitignore    # Ignores the database files
//! ```
//!
//! ## Key Types
//!
//! - [`Site`] - Entry point: finds `.bp/`, loads config, opens the service
//! - [`Config`] - Site and global configuration

mod config;
mod site;

pub use config::{BackendConfig, BackendKind, Config, ConfigError, GlobalConfig, SiteConfig, SiteSection};
pub use site::{Site, SiteError};
