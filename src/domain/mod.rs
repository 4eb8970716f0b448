//! Domain models for bp-cli
//!
//! Plain data types for the records a site exposes, without any I/O.
//! Every record that can be printed implements [`Record`], which gives
//! the formatter an explicit, ordered list of columns.

mod email;
mod group;
mod lookup;
mod record;
mod user;
mod xprofile;

pub use email::{default_emails, EmailPost, EmailTemplate, NewEmail, EMAIL_POST_TYPE};
pub use group::{
    sanitize_slug, Group, GroupChanges, GroupOrderBy, GroupQuery, GroupStatus, NewGroup,
    SortOrder,
};
pub use lookup::Lookup;
pub use record::{display_value, Record};
pub use user::User;
pub use xprofile::{
    DataValue, Field, FieldGroup, FieldRow, FieldType, NewField, NewFieldGroup,
};
