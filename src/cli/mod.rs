//! # Command-Line Interface
//!
//! User-facing commands and output formatting.
//!
//! ## Command Groups
//!
//! | Group | Purpose | Examples |
//! |-------|---------|----------|
//! | Core | Site setup | `init` |
//! | Group | Community groups | `group create`, `group list`, `group delete` |
//! | XProfile | Profile fields and user data | `xprofile create_field`, `xprofile set_data` |
//! | Email | Email templates | `email create`, `email get-post`, `email reinstall` |
//!
//! ## Output Formats
//!
//! Read commands support `--format`:
//! - `table` (default) - Human-readable table
//! - `json`, `csv`, `yaml` - Machine-parseable output
//!
//! `--fields=a,b` picks and orders columns; `--field=name` on `get`
//! commands prints one raw value.
//!
//! ## Verbose Mode
//!
//! Use `--verbose` (or `-v`) for debug output on stderr:
//! ```bash
//! bp --verbose group list
//! ```
//!
//! ## Entry Point
//!
//! Parse a [`Cli`] and hand it to [`run()`].

mod app;
mod email;
mod group;
mod output;
mod prompt;
mod xprofile;

pub use app::{run, Cli, Commands};
pub use output::{Output, OutputError, OutputFormat};

use anyhow::{anyhow, Result};
use clap::Args;

use crate::service::ServiceResult;

/// Projection options of `get` commands
#[derive(Args, Debug, Default)]
pub struct GetArgs {
    /// Limit the output to specific fields
    #[arg(long, value_delimiter = ',')]
    pub fields: Option<Vec<String>>,

    /// Print the value of a single field
    #[arg(long, conflicts_with = "fields")]
    pub field: Option<String>,
}

/// Projection options of `list` commands
#[derive(Args, Debug, Default)]
pub struct ListArgs {
    /// Limit the output to specific fields
    #[arg(long, value_delimiter = ',')]
    pub fields: Option<Vec<String>>,
}

/// Parses an id argument that has to be numeric
pub(crate) fn parse_numeric_id(input: &str, message: &str) -> Result<u64> {
    input.trim().parse().map_err(|_| anyhow!("{}", message))
}

/// Replaces a service's not-found message with the command's own
pub(crate) trait ServiceResultExt<T> {
    fn not_found_as(self, message: impl Into<String>) -> Result<T>;
}

impl<T> ServiceResultExt<T> for ServiceResult<T> {
    fn not_found_as(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            if e.is_not_found() {
                let message: String = message.into();
                anyhow!(message)
            } else {
                e.into()
            }
        })
    }
}
