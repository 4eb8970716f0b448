//! bp - command-line administration for community sites
//!
//! Manages groups, extended profile (XProfile) field groups, fields and
//! per-user values, and the site's email templates. Commands talk to a
//! [`service::SiteService`]: a local SQLite-backed site or a remote site
//! over HTTP.

pub mod domain;
pub mod storage;
pub mod service;
pub mod cli;

pub use domain::{EmailPost, Field, FieldGroup, FieldType, Group, GroupStatus, Lookup};
