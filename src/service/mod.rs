//! # Site Service Boundary
//!
//! Every command talks to the site through [`SiteService`]. The trait is
//! the only place domain operations happen; commands validate input,
//! call one or two service methods, and format what comes back.
//!
//! ## Outcomes
//!
//! Service calls return [`ServiceResult`]. The error side separates
//! the cases a caller has to tell apart:
//!
//! | Variant | Meaning |
//! |---------|---------|
//! | `Validation` | input was rejected before anything changed |
//! | `NotFound` | input was well-formed but referenced nothing |
//! | `Conflict` | the record already exists (no upsert) |
//! | `Failed` | the site refused or failed for its own reasons |
//!
//! ## Backends
//!
//! - [`LocalService`] - SQLite database inside the site directory
//! - [`RemoteService`] - JSON over HTTP to a remote site API

mod context;
mod local;
mod remote;
#[cfg(test)]
pub(crate) mod testing;

pub use context::{SiteContext, SiteSwitch};
pub use local::{LocalService, LocalSettings};
pub use remote::{RemoteService, RemoteSettings};

use thiserror::Error;

use crate::domain::{
    DataValue, EmailPost, Field, FieldGroup, Group, GroupChanges, GroupQuery, Lookup, NewEmail,
    NewField, NewFieldGroup, NewGroup, User,
};

/// Identifier of a site within a network
pub type SiteId = u64;

/// The main site of a network; the only site of a single-site install
pub const PRIMARY_SITE: SiteId = 1;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Failed(String),

    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Site API request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid site data: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ServiceError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ServiceError::NotFound(_))
    }
}

pub type ServiceResult<T> = std::result::Result<T, ServiceError>;

/// Operations a site exposes to the command line
pub trait SiteService {
    /// Whether the site is a network of sites
    fn is_multisite(&self) -> bool;

    /// Resolves a user by numeric id or login
    fn find_user(&self, user: &Lookup) -> ServiceResult<User>;

    // Groups

    fn create_group(&mut self, group: &NewGroup) -> ServiceResult<u64>;

    /// Resolves a group by numeric id or slug
    fn find_group(&self, group: &Lookup) -> ServiceResult<Group>;

    fn update_group(&mut self, id: u64, changes: &GroupChanges) -> ServiceResult<()>;

    fn delete_group(&mut self, id: u64) -> ServiceResult<()>;

    fn list_groups(&self, query: &GroupQuery) -> ServiceResult<Vec<Group>>;

    // Extended profile

    fn create_field_group(&mut self, group: &NewFieldGroup) -> ServiceResult<u64>;

    fn get_field_group(&self, id: u64) -> ServiceResult<FieldGroup>;

    /// Deletes a field group together with its fields and their data
    fn delete_field_group(&mut self, id: u64) -> ServiceResult<()>;

    /// Field groups with their fields, optionally restricted to one group
    fn list_field_groups(&self, group_id: Option<u64>)
        -> ServiceResult<Vec<(FieldGroup, Vec<Field>)>>;

    fn create_field(&mut self, field: &NewField) -> ServiceResult<u64>;

    fn get_field(&self, id: u64) -> ServiceResult<Field>;

    /// Looks a field up by its name
    fn find_field_by_name(&self, name: &str) -> ServiceResult<Option<Field>>;

    fn delete_field(&mut self, id: u64, delete_data: bool) -> ServiceResult<()>;

    fn set_field_data(&mut self, field_id: u64, user_id: u64, value: &DataValue)
        -> ServiceResult<()>;

    fn get_field_data(&self, field_id: u64, user_id: u64) -> ServiceResult<Option<DataValue>>;

    fn delete_field_data(&mut self, field_id: u64, user_id: u64) -> ServiceResult<()>;

    /// Resolves a field by numeric id or name
    fn resolve_field(&self, field: &Lookup) -> ServiceResult<Field> {
        match field {
            Lookup::Id(id) => self.get_field(*id),
            Lookup::Name(name) => self
                .find_field_by_name(name)?
                .ok_or_else(|| ServiceError::NotFound("Field not found.".to_string())),
        }
    }

    // Emails, scoped to a site

    /// Whether a type term already exists for `email_type`
    fn email_type_exists(&self, site: SiteId, email_type: &str) -> ServiceResult<bool>;

    /// Inserts the email content post, returning its id
    fn insert_email_post(&mut self, site: SiteId, email: &NewEmail) -> ServiceResult<u64>;

    /// Creates the type term and binds it to a post, returning the term id
    fn bind_email_type(&mut self, site: SiteId, email_type: &str, post_id: u64)
        -> ServiceResult<u64>;

    fn describe_email_type(&mut self, site: SiteId, term_id: u64, description: &str)
        -> ServiceResult<()>;

    fn delete_email_post(&mut self, site: SiteId, post_id: u64) -> ServiceResult<()>;

    fn get_email_post(&self, site: SiteId, email_type: &str) -> ServiceResult<EmailPost>;

    fn list_email_posts(&self, site: SiteId) -> ServiceResult<Vec<EmailPost>>;

    /// Replaces all emails of a site with the defaults; returns the site's message
    fn reinstall_emails(&mut self, site: SiteId) -> ServiceResult<String>;
}
