//! Community group domain model
//!
//! Groups are created with a name and get a URL-safe slug derived from
//! that name unless one is given explicitly.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::record::Record;

/// Visibility of a group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum GroupStatus {
    #[default]
    Public,
    Private,
    Hidden,
}

impl GroupStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupStatus::Public => "public",
            GroupStatus::Private => "private",
            GroupStatus::Hidden => "hidden",
        }
    }
}

impl std::fmt::Display for GroupStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for GroupStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "public" => Ok(GroupStatus::Public),
            "private" => Ok(GroupStatus::Private),
            "hidden" => Ok(GroupStatus::Hidden),
            _ => Err(format!(
                "Unknown group status: {} (expected public, private or hidden)",
                s
            )),
        }
    }
}

/// A community group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub id: u64,
    pub creator_id: u64,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: GroupStatus,
    #[serde(default)]
    pub enable_forum: bool,
    pub date_created: String,
    /// Permalink, computed by the site from its URL and the slug
    #[serde(default)]
    pub url: String,
}

impl Group {
    /// Builds the permalink for a slug under a site URL
    pub fn permalink(site_url: &str, slug: &str) -> String {
        format!("{}/groups/{}/", site_url.trim_end_matches('/'), slug)
    }
}

impl Record for Group {
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "creator_id",
        "name",
        "slug",
        "description",
        "status",
        "enable_forum",
        "date_created",
        "url",
    ];

    fn value(&self, column: &str) -> Option<Value> {
        let value = match column {
            "id" => json!(self.id),
            "creator_id" => json!(self.creator_id),
            "name" => json!(self.name),
            "slug" => json!(self.slug),
            "description" => json!(self.description),
            "status" => json!(self.status.as_str()),
            "enable_forum" => json!(self.enable_forum),
            "date_created" => json!(self.date_created),
            "url" => json!(self.url),
            _ => return None,
        };
        Some(value)
    }
}

/// Input for creating a group
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewGroup {
    pub name: String,
    pub slug: Option<String>,
    pub description: String,
    pub creator_id: u64,
    pub status: GroupStatus,
    pub enable_forum: bool,
}

impl NewGroup {
    /// The slug to store: the explicit one (sanitized) or one derived from the name
    pub fn effective_slug(&self) -> String {
        match self.slug.as_deref() {
            Some(slug) if !slug.trim().is_empty() => sanitize_slug(slug),
            _ => sanitize_slug(&self.name),
        }
    }
}

/// Partial update of a group; `None` leaves the field unchanged
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GroupChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<GroupStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_forum: Option<bool>,
}

impl GroupChanges {
    /// Returns true if no field would change
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.slug.is_none()
            && self.description.is_none()
            && self.status.is_none()
            && self.enable_forum.is_none()
    }
}

/// Sort key for group listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupOrderBy {
    #[default]
    Id,
    Name,
    DateCreated,
}

impl GroupOrderBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupOrderBy::Id => "id",
            GroupOrderBy::Name => "name",
            GroupOrderBy::DateCreated => "date_created",
        }
    }
}

impl std::str::FromStr for GroupOrderBy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "id" => Ok(GroupOrderBy::Id),
            "name" => Ok(GroupOrderBy::Name),
            "date_created" => Ok(GroupOrderBy::DateCreated),
            _ => Err(format!("Unknown order field: {}", s)),
        }
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

impl std::str::FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            _ => Err(format!("Unknown sort order: {} (expected asc or desc)", s)),
        }
    }
}

/// Filters for listing groups
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GroupQuery {
    /// Only groups created by this user
    pub creator_id: Option<u64>,
    pub status: Option<GroupStatus>,
    pub show_hidden: bool,
    pub orderby: GroupOrderBy,
    pub order: SortOrder,
    pub per_page: Option<usize>,
}

impl GroupQuery {
    /// Whether a group passes the status/visibility filters
    pub fn admits(&self, group: &Group) -> bool {
        if let Some(creator) = self.creator_id {
            if group.creator_id != creator {
                return false;
            }
        }
        match self.status {
            Some(status) => group.status == status,
            None => self.show_hidden || group.status != GroupStatus::Hidden,
        }
    }
}

/// Turns a title into a URL-safe slug.
///
/// Lowercases, replaces every run of non-alphanumeric characters with a
/// single `-`, and trims dashes from both ends. An input with no usable
/// characters yields `"group"`.
pub fn sanitize_slug(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_dash = false;

    for c in input.chars() {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(c.to_lowercase());
        } else {
            pending_dash = true;
        }
    }

    if slug.is_empty() {
        "group".to_string()
    } else {
        slug
    }
}
