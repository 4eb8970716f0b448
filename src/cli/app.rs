//! Main CLI application structure

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use super::email::{self, EmailCommands};
use super::group::{self, GroupCommands};
use super::output::{Output, OutputFormat};
use super::xprofile::{self, XprofileCommands};
use crate::storage::{Config, Site};

#[derive(Parser)]
#[command(name = "bp")]
#[command(author, version, about = "Manage community groups, profile fields and emails")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format [default: table]
    #[arg(long, global = true)]
    pub format: Option<OutputFormat>,

    /// Enable verbose output for debugging
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Site directory (defaults to the nearest one containing .bp/)
    #[arg(long, global = true, env = "BP_PATH")]
    pub path: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new site
    Init {
        /// Path to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Public URL of the site
        #[arg(long)]
        url: Option<String>,

        /// Make the site a multisite network
        #[arg(long)]
        multisite: bool,
    },

    /// Manage groups
    #[command(subcommand)]
    Group(GroupCommands),

    /// Manage XProfile field groups, fields and data
    #[command(subcommand)]
    Xprofile(XprofileCommands),

    /// Manage emails
    #[command(subcommand)]
    Email(EmailCommands),
}

/// Executes a parsed command line
pub fn run(cli: Cli) -> Result<()> {
    let global = Config::load_global()?;
    let format = cli
        .format
        .or(global.default_format)
        .unwrap_or_default();
    let output = Output::new(format, cli.verbose);

    output.verbose("bp starting");

    if let Commands::Init { path, url, multisite } = &cli.command {
        output.verbose_ctx("init", &format!("Initializing site at: {}", path.display()));
        let site = Site::init(path, url.as_deref(), *multisite, global)?;
        output.verbose_ctx("init", &format!("Site directory: {}", site.bp_dir().display()));
        output.success(&format!("Initialized site at {}", path.display()));
        return Ok(());
    }

    let site = Site::locate(cli.path.as_deref(), global)?;
    output.verbose_ctx(
        "site",
        &format!("Using site at {} ({:?} backend)", site.root().display(), site.config().backend.kind),
    );
    let mut service = site.service()?;

    match cli.command {
        Commands::Init { .. } => {}
        Commands::Group(cmd) => group::run(cmd, service.as_mut(), &output)?,
        Commands::Xprofile(cmd) => xprofile::run(cmd, service.as_mut(), &output)?,
        Commands::Email(cmd) => {
            let editor = site.config().global.editor.clone();
            email::run(cmd, service.as_mut(), &output, editor.as_deref())?
        }
    }

    output.verbose("Command completed successfully");
    Ok(())
}
