//! SQLite-backed site
//!
//! The database sits in `.bp/site.db` and holds everything the commands
//! touch: users, groups, profile field groups/fields/data, and the
//! email posts with their type terms. Email rows are scoped by site id.

use std::path::Path;

use chrono::Utc;
use rusqlite::types::Type;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row, Transaction};

use super::{ServiceError, ServiceResult, SiteId, SiteService};
use crate::domain::{
    default_emails, DataValue, EmailPost, Field, FieldGroup, FieldType, Group, GroupChanges,
    GroupQuery, GroupStatus, Lookup, NewEmail, NewField, NewFieldGroup, NewGroup, User,
    EMAIL_POST_TYPE,
};

/// Taxonomy that binds email type slugs to email posts
const EMAIL_TYPE_TAXONOMY: &str = "bp-email-type";

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Site-level settings the database does not store itself
#[derive(Debug, Clone)]
pub struct LocalSettings {
    pub site_url: String,
    pub multisite: bool,
}

impl Default for LocalSettings {
    fn default() -> Self {
        Self {
            site_url: "http://example.com".to_string(),
            multisite: false,
        }
    }
}

/// A site stored in a local SQLite database
pub struct LocalService {
    conn: Connection,
    settings: LocalSettings,
}

impl LocalService {
    /// Schema version - bump when the schema changes
    const SCHEMA_VERSION: i32 = 1;

    /// Opens (or creates) the database at `path`
    pub fn open(path: &Path, settings: LocalSettings) -> ServiceResult<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        Self::with_connection(conn, settings)
    }

    /// Opens a throwaway in-memory site
    pub fn in_memory(settings: LocalSettings) -> ServiceResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Self::with_connection(conn, settings)
    }

    fn with_connection(conn: Connection, settings: LocalSettings) -> ServiceResult<Self> {
        let service = Self { conn, settings };
        service.ensure_schema()?;
        Ok(service)
    }

    fn ensure_schema(&self) -> ServiceResult<()> {
        let version: i32 = self
            .conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))?;

        if version == Self::SCHEMA_VERSION {
            return Ok(());
        }

        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_login TEXT NOT NULL UNIQUE,
                display_name TEXT NOT NULL,
                user_email TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS bp_groups (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                creator_id INTEGER NOT NULL,
                name TEXT NOT NULL,
                slug TEXT NOT NULL UNIQUE,
                description TEXT NOT NULL DEFAULT '',
                status TEXT NOT NULL,
                enable_forum INTEGER NOT NULL DEFAULT 0,
                date_created TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS bp_xprofile_groups (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                group_order INTEGER NOT NULL DEFAULT 0,
                can_delete INTEGER NOT NULL DEFAULT 1
            );

            CREATE TABLE IF NOT EXISTS bp_xprofile_fields (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                group_id INTEGER NOT NULL,
                type TEXT NOT NULL,
                name TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                is_required INTEGER NOT NULL DEFAULT 0,
                field_order INTEGER NOT NULL DEFAULT 0,
                can_delete INTEGER NOT NULL DEFAULT 1
            );

            CREATE TABLE IF NOT EXISTS bp_xprofile_data (
                field_id INTEGER NOT NULL,
                user_id INTEGER NOT NULL,
                value TEXT NOT NULL,
                last_updated TEXT NOT NULL,
                PRIMARY KEY (field_id, user_id)
            );

            CREATE TABLE IF NOT EXISTS posts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                site_id INTEGER NOT NULL,
                post_type TEXT NOT NULL,
                title TEXT NOT NULL,
                content TEXT NOT NULL,
                excerpt TEXT NOT NULL DEFAULT '',
                status TEXT NOT NULL,
                date_created TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS terms (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                site_id INTEGER NOT NULL,
                taxonomy TEXT NOT NULL,
                slug TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                UNIQUE (site_id, taxonomy, slug)
            );

            CREATE TABLE IF NOT EXISTS term_relationships (
                term_id INTEGER NOT NULL,
                post_id INTEGER NOT NULL,
                PRIMARY KEY (term_id, post_id)
            );

            CREATE INDEX IF NOT EXISTS idx_fields_group ON bp_xprofile_fields(group_id);
            CREATE INDEX IF NOT EXISTS idx_posts_site ON posts(site_id, post_type);
            ",
        )?;

        self.conn.execute(
            &format!("PRAGMA user_version = {}", Self::SCHEMA_VERSION),
            [],
        )?;

        Ok(())
    }

    /// Seeds a fresh site: the administrator account and the default emails.
    ///
    /// Safe to call on an installed site; existing data is left alone.
    pub fn install(&mut self, admin_email: &str) -> ServiceResult<()> {
        let users: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
        if users == 0 {
            self.conn.execute(
                "INSERT INTO users (id, user_login, display_name, user_email) VALUES (1, 'admin', 'admin', ?1)",
                params![admin_email],
            )?;
        }

        let site = super::PRIMARY_SITE;
        if self.list_email_posts(site)?.is_empty() {
            let tx = self.conn.transaction()?;
            insert_default_emails(&tx, site)?;
            tx.commit()?;
        }

        Ok(())
    }

    /// Adds a user; used to seed sites and tests
    pub fn add_user(&mut self, login: &str, display_name: &str, email: &str) -> ServiceResult<u64> {
        self.conn
            .execute(
                "INSERT INTO users (user_login, display_name, user_email) VALUES (?1, ?2, ?3)",
                params![login, display_name, email],
            )
            .map_err(|e| conflict_or(e, format!("User {} already exists.", login)))?;
        Ok(self.conn.last_insert_rowid() as u64)
    }

    fn group_by_id(&self, id: u64) -> ServiceResult<Option<Group>> {
        let site_url = self.settings.site_url.clone();
        Ok(self
            .conn
            .query_row(
                "SELECT id, creator_id, name, slug, description, status, enable_forum, date_created
                 FROM bp_groups WHERE id = ?1",
                params![id as i64],
                |row| group_from_row(row, &site_url),
            )
            .optional()?)
    }

    fn group_by_slug(&self, slug: &str) -> ServiceResult<Option<Group>> {
        let site_url = self.settings.site_url.clone();
        Ok(self
            .conn
            .query_row(
                "SELECT id, creator_id, name, slug, description, status, enable_forum, date_created
                 FROM bp_groups WHERE slug = ?1",
                params![slug],
                |row| group_from_row(row, &site_url),
            )
            .optional()?)
    }

    /// Appends `-2`, `-3`, ... until the slug is free (ignoring `exclude`)
    fn unique_slug(&self, base: &str, exclude: Option<u64>) -> ServiceResult<String> {
        let mut candidate = base.to_string();
        let mut suffix = 2;
        loop {
            match self.group_by_slug(&candidate)? {
                Some(group) if Some(group.id) != exclude => {
                    candidate = format!("{}-{}", base, suffix);
                    suffix += 1;
                }
                _ => return Ok(candidate),
            }
        }
    }

    fn user_exists(&self, id: u64) -> ServiceResult<bool> {
        Ok(self
            .conn
            .query_row("SELECT 1 FROM users WHERE id = ?1", params![id as i64], |_| Ok(()))
            .optional()?
            .is_some())
    }

    fn field_group_by_id(&self, id: u64) -> ServiceResult<Option<FieldGroup>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, name, description, group_order, can_delete
                 FROM bp_xprofile_groups WHERE id = ?1",
                params![id as i64],
                field_group_from_row,
            )
            .optional()?)
    }

    fn field_by_id(&self, id: u64) -> ServiceResult<Option<Field>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, group_id, type, name, description, is_required, field_order, can_delete
                 FROM bp_xprofile_fields WHERE id = ?1",
                params![id as i64],
                field_from_row,
            )
            .optional()?)
    }

    fn fields_in_group(&self, group_id: u64) -> ServiceResult<Vec<Field>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, group_id, type, name, description, is_required, field_order, can_delete
             FROM bp_xprofile_fields WHERE group_id = ?1 ORDER BY field_order, id",
        )?;
        let fields = stmt
            .query_map(params![group_id as i64], field_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(fields)
    }

    fn email_term_id(&self, site: SiteId, email_type: &str) -> ServiceResult<Option<u64>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id FROM terms WHERE site_id = ?1 AND taxonomy = ?2 AND slug = ?3",
                params![site as i64, EMAIL_TYPE_TAXONOMY, email_type],
                |row| row.get::<_, i64>(0),
            )
            .optional()?
            .map(|id| id as u64))
    }

    fn email_posts(&self, site: SiteId, email_type: Option<&str>) -> ServiceResult<Vec<EmailPost>> {
        let mut stmt = self.conn.prepare(
            "SELECT p.id, t.slug, p.title, p.content, p.excerpt, t.description, p.status, p.date_created
             FROM posts p
             JOIN term_relationships r ON r.post_id = p.id
             JOIN terms t ON t.id = r.term_id
             WHERE p.site_id = ?1 AND p.post_type = ?2 AND t.taxonomy = ?3
               AND (?4 IS NULL OR t.slug = ?4)
             ORDER BY p.id",
        )?;
        let posts = stmt
            .query_map(
                params![site as i64, EMAIL_POST_TYPE, EMAIL_TYPE_TAXONOMY, email_type],
                email_from_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(posts)
    }
}

impl SiteService for LocalService {
    fn is_multisite(&self) -> bool {
        self.settings.multisite
    }

    fn find_user(&self, user: &Lookup) -> ServiceResult<User> {
        let sql = "SELECT id, user_login, display_name, user_email FROM users WHERE ";
        let found = match user {
            Lookup::Id(id) => self
                .conn
                .query_row(&format!("{}id = ?1", sql), params![*id as i64], user_from_row)
                .optional()?,
            Lookup::Name(login) => self
                .conn
                .query_row(&format!("{}user_login = ?1", sql), params![login], user_from_row)
                .optional()?,
        };
        found.ok_or_else(|| ServiceError::NotFound(format!("User not found: {}", user)))
    }

    fn create_group(&mut self, group: &NewGroup) -> ServiceResult<u64> {
        if group.name.trim().is_empty() {
            return Err(ServiceError::Validation("Group name is required.".to_string()));
        }
        if !self.user_exists(group.creator_id)? {
            return Err(ServiceError::NotFound(format!(
                "User not found: {}",
                group.creator_id
            )));
        }

        let slug = self.unique_slug(&group.effective_slug(), None)?;
        self.conn.execute(
            "INSERT INTO bp_groups (creator_id, name, slug, description, status, enable_forum, date_created)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                group.creator_id as i64,
                group.name.trim(),
                slug,
                group.description,
                group.status.as_str(),
                group.enable_forum,
                now()
            ],
        )?;
        Ok(self.conn.last_insert_rowid() as u64)
    }

    fn find_group(&self, group: &Lookup) -> ServiceResult<Group> {
        let found = match group {
            Lookup::Id(id) => self.group_by_id(*id)?,
            Lookup::Name(slug) => self.group_by_slug(slug)?,
        };
        found.ok_or_else(|| ServiceError::NotFound(format!("Group not found: {}", group)))
    }

    fn update_group(&mut self, id: u64, changes: &GroupChanges) -> ServiceResult<()> {
        let mut group = self
            .group_by_id(id)?
            .ok_or_else(|| ServiceError::NotFound(format!("Group not found: {}", id)))?;

        if changes.is_empty() {
            return Ok(());
        }

        if let Some(name) = &changes.name {
            if name.trim().is_empty() {
                return Err(ServiceError::Validation("Group name cannot be empty.".to_string()));
            }
            group.name = name.trim().to_string();
        }
        if let Some(slug) = &changes.slug {
            group.slug = self.unique_slug(&crate::domain::sanitize_slug(slug), Some(id))?;
        }
        if let Some(description) = &changes.description {
            group.description = description.clone();
        }
        if let Some(status) = changes.status {
            group.status = status;
        }
        if let Some(enable_forum) = changes.enable_forum {
            group.enable_forum = enable_forum;
        }

        self.conn.execute(
            "UPDATE bp_groups SET name = ?1, slug = ?2, description = ?3, status = ?4, enable_forum = ?5
             WHERE id = ?6",
            params![
                group.name,
                group.slug,
                group.description,
                group.status.as_str(),
                group.enable_forum,
                id as i64
            ],
        )?;
        Ok(())
    }

    fn delete_group(&mut self, id: u64) -> ServiceResult<()> {
        let deleted = self
            .conn
            .execute("DELETE FROM bp_groups WHERE id = ?1", params![id as i64])?;
        if deleted == 0 {
            return Err(ServiceError::NotFound(format!("Group not found: {}", id)));
        }
        Ok(())
    }

    fn list_groups(&self, query: &GroupQuery) -> ServiceResult<Vec<Group>> {
        // orderby/order come from closed enums, never from raw input
        let sql = format!(
            "SELECT id, creator_id, name, slug, description, status, enable_forum, date_created
             FROM bp_groups ORDER BY {} {}, id {}",
            query.orderby.as_str(),
            query.order.as_str(),
            query.order.as_str()
        );
        let site_url = self.settings.site_url.clone();
        let mut stmt = self.conn.prepare(&sql)?;
        let groups = stmt
            .query_map([], |row| group_from_row(row, &site_url))?
            .collect::<Result<Vec<_>, _>>()?;

        let admitted = groups.into_iter().filter(|g| query.admits(g));
        Ok(match query.per_page {
            Some(limit) => admitted.take(limit).collect(),
            None => admitted.collect(),
        })
    }

    fn create_field_group(&mut self, group: &NewFieldGroup) -> ServiceResult<u64> {
        if group.name.trim().is_empty() {
            return Err(ServiceError::Validation("Field group name is required.".to_string()));
        }
        self.conn.execute(
            "INSERT INTO bp_xprofile_groups (name, description, group_order, can_delete)
             VALUES (?1, ?2, (SELECT COALESCE(MAX(group_order), -1) + 1 FROM bp_xprofile_groups), ?3)",
            params![group.name.trim(), group.description, group.can_delete],
        )?;
        Ok(self.conn.last_insert_rowid() as u64)
    }

    fn get_field_group(&self, id: u64) -> ServiceResult<FieldGroup> {
        self.field_group_by_id(id)?
            .ok_or_else(|| ServiceError::NotFound(format!("Field group not found: {}", id)))
    }

    fn delete_field_group(&mut self, id: u64) -> ServiceResult<()> {
        let group = self.get_field_group(id)?;
        if !group.can_delete {
            return Err(ServiceError::Failed(format!(
                "Field group {} cannot be deleted.",
                id
            )));
        }

        let tx = self.conn.transaction()?;
        tx.execute(
            "DELETE FROM bp_xprofile_data
             WHERE field_id IN (SELECT id FROM bp_xprofile_fields WHERE group_id = ?1)",
            params![id as i64],
        )?;
        tx.execute(
            "DELETE FROM bp_xprofile_fields WHERE group_id = ?1",
            params![id as i64],
        )?;
        tx.execute(
            "DELETE FROM bp_xprofile_groups WHERE id = ?1",
            params![id as i64],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn list_field_groups(
        &self,
        group_id: Option<u64>,
    ) -> ServiceResult<Vec<(FieldGroup, Vec<Field>)>> {
        let groups = match group_id {
            Some(id) => vec![self.get_field_group(id)?],
            None => {
                let mut stmt = self.conn.prepare(
                    "SELECT id, name, description, group_order, can_delete
                     FROM bp_xprofile_groups ORDER BY group_order, id",
                )?;
                let groups = stmt
                    .query_map([], field_group_from_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                groups
            }
        };

        groups
            .into_iter()
            .map(|group| {
                let fields = self.fields_in_group(group.id)?;
                Ok((group, fields))
            })
            .collect()
    }

    fn create_field(&mut self, field: &NewField) -> ServiceResult<u64> {
        if field.name.trim().is_empty() {
            return Err(ServiceError::Validation("Field name is required.".to_string()));
        }
        if self.field_group_by_id(field.group_id)?.is_none() {
            return Err(ServiceError::NotFound(format!(
                "Field group not found: {}",
                field.group_id
            )));
        }
        if self.find_field_by_name(field.name.trim())?.is_some() {
            return Err(ServiceError::Conflict(format!(
                "A field named \"{}\" already exists.",
                field.name.trim()
            )));
        }

        self.conn.execute(
            "INSERT INTO bp_xprofile_fields (group_id, type, name, description, is_required, field_order, can_delete)
             VALUES (?1, ?2, ?3, ?4, ?5,
                     (SELECT COALESCE(MAX(field_order), -1) + 1 FROM bp_xprofile_fields WHERE group_id = ?1),
                     ?6)",
            params![
                field.group_id as i64,
                field.field_type.as_str(),
                field.name.trim(),
                field.description,
                field.is_required,
                field.can_delete
            ],
        )?;
        Ok(self.conn.last_insert_rowid() as u64)
    }

    fn get_field(&self, id: u64) -> ServiceResult<Field> {
        self.field_by_id(id)?
            .ok_or_else(|| ServiceError::NotFound(format!("Field not found: {}", id)))
    }

    fn find_field_by_name(&self, name: &str) -> ServiceResult<Option<Field>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, group_id, type, name, description, is_required, field_order, can_delete
                 FROM bp_xprofile_fields WHERE name = ?1 ORDER BY id LIMIT 1",
                params![name],
                field_from_row,
            )
            .optional()?)
    }

    fn delete_field(&mut self, id: u64, delete_data: bool) -> ServiceResult<()> {
        let field = self.get_field(id)?;
        if !field.can_delete {
            return Err(ServiceError::Failed(format!("Field {} cannot be deleted.", id)));
        }

        let tx = self.conn.transaction()?;
        tx.execute(
            "DELETE FROM bp_xprofile_fields WHERE id = ?1",
            params![id as i64],
        )?;
        if delete_data {
            tx.execute(
                "DELETE FROM bp_xprofile_data WHERE field_id = ?1",
                params![id as i64],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    fn set_field_data(
        &mut self,
        field_id: u64,
        user_id: u64,
        value: &DataValue,
    ) -> ServiceResult<()> {
        self.get_field(field_id)?;
        if !self.user_exists(user_id)? {
            return Err(ServiceError::NotFound(format!("User not found: {}", user_id)));
        }

        let stored = serde_json::to_string(value)?;
        self.conn.execute(
            "INSERT OR REPLACE INTO bp_xprofile_data (field_id, user_id, value, last_updated)
             VALUES (?1, ?2, ?3, ?4)",
            params![field_id as i64, user_id as i64, stored, now()],
        )?;
        Ok(())
    }

    fn get_field_data(&self, field_id: u64, user_id: u64) -> ServiceResult<Option<DataValue>> {
        let stored: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM bp_xprofile_data WHERE field_id = ?1 AND user_id = ?2",
                params![field_id as i64, user_id as i64],
                |row| row.get(0),
            )
            .optional()?;

        match stored {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    fn delete_field_data(&mut self, field_id: u64, user_id: u64) -> ServiceResult<()> {
        let deleted = self.conn.execute(
            "DELETE FROM bp_xprofile_data WHERE field_id = ?1 AND user_id = ?2",
            params![field_id as i64, user_id as i64],
        )?;
        if deleted == 0 {
            return Err(ServiceError::NotFound("No XProfile data found.".to_string()));
        }
        Ok(())
    }

    fn email_type_exists(&self, site: SiteId, email_type: &str) -> ServiceResult<bool> {
        Ok(self.email_term_id(site, email_type)?.is_some())
    }

    fn insert_email_post(&mut self, site: SiteId, email: &NewEmail) -> ServiceResult<u64> {
        self.conn.execute(
            "INSERT INTO posts (site_id, post_type, title, content, excerpt, status, date_created)
             VALUES (?1, ?2, ?3, ?4, ?5, 'publish', ?6)",
            params![
                site as i64,
                EMAIL_POST_TYPE,
                email.subject,
                email.content,
                email.plain_text_content.as_deref().unwrap_or(""),
                now()
            ],
        )?;
        Ok(self.conn.last_insert_rowid() as u64)
    }

    fn bind_email_type(
        &mut self,
        site: SiteId,
        email_type: &str,
        post_id: u64,
    ) -> ServiceResult<u64> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO terms (site_id, taxonomy, slug) VALUES (?1, ?2, ?3)",
            params![site as i64, EMAIL_TYPE_TAXONOMY, email_type],
        )
        .map_err(|e| conflict_or(e, format!("Email type \"{}\" already exists.", email_type)))?;
        let term_id = tx.last_insert_rowid();
        tx.execute(
            "INSERT INTO term_relationships (term_id, post_id) VALUES (?1, ?2)",
            params![term_id, post_id as i64],
        )?;
        tx.commit()?;
        Ok(term_id as u64)
    }

    fn describe_email_type(
        &mut self,
        site: SiteId,
        term_id: u64,
        description: &str,
    ) -> ServiceResult<()> {
        let updated = self.conn.execute(
            "UPDATE terms SET description = ?1 WHERE id = ?2 AND site_id = ?3",
            params![description, term_id as i64, site as i64],
        )?;
        if updated == 0 {
            return Err(ServiceError::NotFound(format!("Email type term not found: {}", term_id)));
        }
        Ok(())
    }

    fn delete_email_post(&mut self, site: SiteId, post_id: u64) -> ServiceResult<()> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "DELETE FROM terms WHERE id IN (SELECT term_id FROM term_relationships WHERE post_id = ?1)
               AND site_id = ?2",
            params![post_id as i64, site as i64],
        )?;
        tx.execute(
            "DELETE FROM term_relationships WHERE post_id = ?1",
            params![post_id as i64],
        )?;
        tx.execute(
            "DELETE FROM posts WHERE id = ?1 AND site_id = ?2",
            params![post_id as i64, site as i64],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn get_email_post(&self, site: SiteId, email_type: &str) -> ServiceResult<EmailPost> {
        self.email_posts(site, Some(email_type))?
            .into_iter()
            .next()
            .ok_or_else(|| ServiceError::NotFound(format!("No email found for type \"{}\".", email_type)))
    }

    fn list_email_posts(&self, site: SiteId) -> ServiceResult<Vec<EmailPost>> {
        self.email_posts(site, None)
    }

    fn reinstall_emails(&mut self, site: SiteId) -> ServiceResult<String> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "DELETE FROM term_relationships
             WHERE post_id IN (SELECT id FROM posts WHERE site_id = ?1 AND post_type = ?2)",
            params![site as i64, EMAIL_POST_TYPE],
        )?;
        tx.execute(
            "DELETE FROM posts WHERE site_id = ?1 AND post_type = ?2",
            params![site as i64, EMAIL_POST_TYPE],
        )?;
        tx.execute(
            "DELETE FROM terms WHERE site_id = ?1 AND taxonomy = ?2",
            params![site as i64, EMAIL_TYPE_TAXONOMY],
        )?;
        insert_default_emails(&tx, site)?;
        tx.commit()?;
        Ok("Emails have been successfully reinstalled.".to_string())
    }
}

fn now() -> String {
    Utc::now().format(DATE_FORMAT).to_string()
}

/// Writes the default email set for `site` on an open transaction
fn insert_default_emails(tx: &Transaction<'_>, site: SiteId) -> ServiceResult<()> {
    let now = now();
    for template in default_emails() {
        tx.execute(
            "INSERT INTO posts (site_id, post_type, title, content, excerpt, status, date_created)
             VALUES (?1, ?2, ?3, ?4, ?5, 'publish', ?6)",
            params![
                site as i64,
                EMAIL_POST_TYPE,
                template.subject,
                template.content,
                template.plain_text_content,
                now
            ],
        )?;
        let post_id = tx.last_insert_rowid();
        tx.execute(
            "INSERT INTO terms (site_id, taxonomy, slug, description) VALUES (?1, ?2, ?3, ?4)",
            params![site as i64, EMAIL_TYPE_TAXONOMY, template.email_type, template.description],
        )?;
        let term_id = tx.last_insert_rowid();
        tx.execute(
            "INSERT INTO term_relationships (term_id, post_id) VALUES (?1, ?2)",
            params![term_id, post_id],
        )?;
    }
    Ok(())
}

/// Maps unique-constraint violations to `Conflict`
fn conflict_or(error: rusqlite::Error, message: String) -> ServiceError {
    match &error {
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation => {
            ServiceError::Conflict(message)
        }
        _ => ServiceError::Sqlite(error),
    }
}

fn parse_column<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: std::str::FromStr<Err = String>,
{
    let raw: String = row.get(idx)?;
    raw.parse()
        .map_err(|e: String| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, e.into()))
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get::<_, i64>(0)? as u64,
        user_login: row.get(1)?,
        display_name: row.get(2)?,
        user_email: row.get(3)?,
    })
}

fn group_from_row(row: &Row<'_>, site_url: &str) -> rusqlite::Result<Group> {
    let slug: String = row.get(3)?;
    let status: GroupStatus = parse_column(row, 5)?;
    Ok(Group {
        id: row.get::<_, i64>(0)? as u64,
        creator_id: row.get::<_, i64>(1)? as u64,
        name: row.get(2)?,
        url: Group::permalink(site_url, &slug),
        slug,
        description: row.get(4)?,
        status,
        enable_forum: row.get(6)?,
        date_created: row.get(7)?,
    })
}

fn field_group_from_row(row: &Row<'_>) -> rusqlite::Result<FieldGroup> {
    Ok(FieldGroup {
        id: row.get::<_, i64>(0)? as u64,
        name: row.get(1)?,
        description: row.get(2)?,
        group_order: row.get(3)?,
        can_delete: row.get(4)?,
    })
}

fn field_from_row(row: &Row<'_>) -> rusqlite::Result<Field> {
    let field_type: FieldType = parse_column(row, 2)?;
    Ok(Field {
        id: row.get::<_, i64>(0)? as u64,
        group_id: row.get::<_, i64>(1)? as u64,
        field_type,
        name: row.get(3)?,
        description: row.get(4)?,
        is_required: row.get(5)?,
        field_order: row.get(6)?,
        can_delete: row.get(7)?,
    })
}

fn email_from_row(row: &Row<'_>) -> rusqlite::Result<EmailPost> {
    Ok(EmailPost {
        id: row.get::<_, i64>(0)? as u64,
        email_type: row.get(1)?,
        subject: row.get(2)?,
        content: row.get(3)?,
        plain_text_content: row.get(4)?,
        type_description: row.get(5)?,
        status: row.get(6)?,
        date_created: row.get(7)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn service() -> LocalService {
        let mut service = LocalService::in_memory(LocalSettings::default()).unwrap();
        service.install("admin@example.com").unwrap();
        service
    }

    fn new_group(name: &str, slug: Option<&str>) -> NewGroup {
        NewGroup {
            name: name.to_string(),
            slug: slug.map(str::to_string),
            description: String::new(),
            creator_id: 1,
            status: GroupStatus::Public,
            enable_forum: false,
        }
    }

    fn new_field(group_id: u64, name: &str, field_type: FieldType) -> NewField {
        NewField {
            group_id,
            field_type,
            name: name.to_string(),
            description: String::new(),
            is_required: false,
            can_delete: true,
        }
    }

    fn new_field_group(name: &str) -> NewFieldGroup {
        NewFieldGroup {
            name: name.to_string(),
            description: String::new(),
            can_delete: true,
        }
    }

    #[test]
    fn install_seeds_admin_and_emails() {
        let service = service();
        let admin = service.find_user(&Lookup::Name("admin".into())).unwrap();
        assert_eq!(admin.id, 1);
        assert_eq!(
            service.list_email_posts(1).unwrap().len(),
            default_emails().len()
        );
    }

    #[test]
    fn install_is_idempotent() {
        let mut service = service();
        service.install("admin@example.com").unwrap();
        assert_eq!(
            service.list_email_posts(1).unwrap().len(),
            default_emails().len()
        );
    }

    #[test]
    fn open_on_disk_persists() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("site.db");
        {
            let mut service = LocalService::open(&path, LocalSettings::default()).unwrap();
            service.install("admin@example.com").unwrap();
            service.create_group(&new_group("Persisted", None)).unwrap();
        }
        let service = LocalService::open(&path, LocalSettings::default()).unwrap();
        let group = service.find_group(&Lookup::Name("persisted".into())).unwrap();
        assert_eq!(group.name, "Persisted");
    }

    #[test]
    fn create_then_get_group() {
        let mut service = service();
        let id = service.create_group(&new_group("Totally Cool Group", None)).unwrap();

        let group = service.find_group(&Lookup::Id(id)).unwrap();
        assert_eq!(group.name, "Totally Cool Group");
        assert_eq!(group.slug, "totally-cool-group");
        assert_eq!(group.url, "http://example.com/groups/totally-cool-group/");
    }

    #[test]
    fn create_group_requires_name() {
        let mut service = service();
        let err = service.create_group(&new_group("  ", None)).unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[test]
    fn duplicate_slugs_are_suffixed() {
        let mut service = service();
        let a = service.create_group(&new_group("Same", None)).unwrap();
        let b = service.create_group(&new_group("Same", None)).unwrap();
        assert_eq!(service.find_group(&Lookup::Id(a)).unwrap().slug, "same");
        assert_eq!(service.find_group(&Lookup::Id(b)).unwrap().slug, "same-2");
    }

    #[test]
    fn update_group_and_noop_update() {
        let mut service = service();
        let id = service.create_group(&new_group("Group", None)).unwrap();

        service.update_group(id, &GroupChanges::default()).unwrap();

        let changes = GroupChanges {
            description: Some("foo".into()),
            ..Default::default()
        };
        service.update_group(id, &changes).unwrap();
        assert_eq!(service.find_group(&Lookup::Id(id)).unwrap().description, "foo");
    }

    #[test]
    fn update_missing_group_is_not_found() {
        let mut service = service();
        let err = service.update_group(99, &GroupChanges::default()).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn delete_group_then_get_fails() {
        let mut service = service();
        let id = service.create_group(&new_group("Doomed", None)).unwrap();
        service.delete_group(id).unwrap();
        assert!(service.find_group(&Lookup::Id(id)).unwrap_err().is_not_found());
        assert!(service.delete_group(id).unwrap_err().is_not_found());
    }

    #[test]
    fn list_groups_filters_and_orders() {
        let mut service = service();
        let other = service.add_user("jane", "Jane", "jane@example.com").unwrap();
        service.create_group(&new_group("Bravo", None)).unwrap();
        service.create_group(&new_group("Alpha", None)).unwrap();
        let mut hidden = new_group("Hidden", None);
        hidden.status = GroupStatus::Hidden;
        service.create_group(&hidden).unwrap();
        let mut janes = new_group("Jane's", None);
        janes.creator_id = other;
        service.create_group(&janes).unwrap();

        let all = service.list_groups(&GroupQuery::default()).unwrap();
        let names: Vec<_> = all.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["Bravo", "Alpha", "Jane's"]);

        let by_name = service
            .list_groups(&GroupQuery {
                orderby: crate::domain::GroupOrderBy::Name,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(by_name[0].name, "Alpha");

        let mine = service
            .list_groups(&GroupQuery {
                creator_id: Some(other),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(mine.len(), 1);

        let limited = service
            .list_groups(&GroupQuery {
                per_page: Some(1),
                show_hidden: true,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[test]
    fn list_groups_empty() {
        let service = service();
        assert!(service.list_groups(&GroupQuery::default()).unwrap().is_empty());
    }

    #[test]
    fn field_group_lifecycle() {
        let mut service = service();
        let id = service.create_field_group(&new_field_group("Profile")).unwrap();
        let group = service.get_field_group(id).unwrap();
        assert_eq!(group.name, "Profile");
        assert!(group.can_delete);

        let field = service
            .create_field(&new_field(id, "Bio", FieldType::Textarea))
            .unwrap();
        service
            .set_field_data(field, 1, &DataValue::Single("hello".into()))
            .unwrap();

        service.delete_field_group(id).unwrap();
        assert!(service.get_field_group(id).unwrap_err().is_not_found());
        assert!(service.get_field(field).unwrap_err().is_not_found());
        assert_eq!(service.get_field_data(field, 1).unwrap(), None);
    }

    #[test]
    fn protected_field_group_is_not_deleted() {
        let mut service = service();
        let mut group = new_field_group("Base");
        group.can_delete = false;
        let id = service.create_field_group(&group).unwrap();
        assert!(matches!(
            service.delete_field_group(id).unwrap_err(),
            ServiceError::Failed(_)
        ));
        assert!(service.get_field_group(id).is_ok());
    }

    #[test]
    fn create_field_requires_existing_group() {
        let mut service = service();
        let err = service
            .create_field(&new_field(42, "Orphan", FieldType::Textbox))
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn duplicate_field_name_conflicts() {
        let mut service = service();
        let group = service.create_field_group(&new_field_group("G")).unwrap();
        service
            .create_field(&new_field(group, "Name", FieldType::Textbox))
            .unwrap();
        let err = service
            .create_field(&new_field(group, "Name", FieldType::Textbox))
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    #[test]
    fn list_field_groups_nests_fields() {
        let mut service = service();
        let a = service.create_field_group(&new_field_group("A")).unwrap();
        let b = service.create_field_group(&new_field_group("B")).unwrap();
        service.create_field(&new_field(b, "B1", FieldType::Textbox)).unwrap();
        service.create_field(&new_field(a, "A1", FieldType::Textbox)).unwrap();

        let groups = service.list_field_groups(None).unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].0.id, a);
        assert_eq!(groups[0].1[0].name, "A1");

        let only_b = service.list_field_groups(Some(b)).unwrap();
        assert_eq!(only_b.len(), 1);
        assert_eq!(only_b[0].1[0].name, "B1");
    }

    #[test]
    fn resolve_field_by_name_or_id() {
        let mut service = service();
        let group = service.create_field_group(&new_field_group("G")).unwrap();
        let id = service
            .create_field(&new_field(group, "Hobbies", FieldType::Checkbox))
            .unwrap();

        assert_eq!(service.resolve_field(&Lookup::Id(id)).unwrap().name, "Hobbies");
        assert_eq!(
            service.resolve_field(&Lookup::Name("Hobbies".into())).unwrap().id,
            id
        );
        assert!(service
            .resolve_field(&Lookup::Name("Nope".into()))
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn delete_field_keeps_data_unless_asked() {
        let mut service = service();
        let group = service.create_field_group(&new_field_group("G")).unwrap();
        let keep = service.create_field(&new_field(group, "Keep", FieldType::Textbox)).unwrap();
        let drop = service.create_field(&new_field(group, "Drop", FieldType::Textbox)).unwrap();
        service.set_field_data(keep, 1, &DataValue::Single("k".into())).unwrap();
        service.set_field_data(drop, 1, &DataValue::Single("d".into())).unwrap();

        service.delete_field(keep, false).unwrap();
        service.delete_field(drop, true).unwrap();

        assert!(service.get_field_data(keep, 1).unwrap().is_some());
        assert!(service.get_field_data(drop, 1).unwrap().is_none());
    }

    #[test]
    fn field_data_round_trip() {
        let mut service = service();
        let group = service.create_field_group(&new_field_group("G")).unwrap();
        let field = service
            .create_field(&new_field(group, "Colors", FieldType::Checkbox))
            .unwrap();
        let value = DataValue::Multi(vec!["a".into(), "b".into(), "c".into()]);

        service.set_field_data(field, 1, &value).unwrap();
        assert_eq!(service.get_field_data(field, 1).unwrap(), Some(value));

        service.delete_field_data(field, 1).unwrap();
        assert!(service.delete_field_data(field, 1).unwrap_err().is_not_found());
    }

    #[test]
    fn set_data_for_unknown_user_fails() {
        let mut service = service();
        let group = service.create_field_group(&new_field_group("G")).unwrap();
        let field = service.create_field(&new_field(group, "F", FieldType::Textbox)).unwrap();
        let err = service
            .set_field_data(field, 77, &DataValue::Single("x".into()))
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn email_create_and_duplicate_binding() {
        let mut service = service();
        let email = NewEmail {
            email_type: "custom-hello".into(),
            subject: "Hello".into(),
            content: "Body".into(),
            plain_text_content: None,
        };
        assert!(!service.email_type_exists(1, "custom-hello").unwrap());

        let post = service.insert_email_post(1, &email).unwrap();
        let term = service.bind_email_type(1, "custom-hello", post).unwrap();
        service.describe_email_type(1, term, "Says hello").unwrap();

        assert!(service.email_type_exists(1, "custom-hello").unwrap());
        let stored = service.get_email_post(1, "custom-hello").unwrap();
        assert_eq!(stored.id, post);
        assert_eq!(stored.subject, "Hello");
        assert_eq!(stored.type_description, "Says hello");

        let second = service.insert_email_post(1, &email).unwrap();
        let err = service.bind_email_type(1, "custom-hello", second).unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    #[test]
    fn emails_are_scoped_by_site() {
        let mut service = service();
        let email = NewEmail {
            email_type: "site-two".into(),
            subject: "S".into(),
            content: "C".into(),
            plain_text_content: Some("plain".into()),
        };
        let post = service.insert_email_post(2, &email).unwrap();
        service.bind_email_type(2, "site-two", post).unwrap();

        assert!(service.email_type_exists(2, "site-two").unwrap());
        assert!(!service.email_type_exists(1, "site-two").unwrap());
        assert!(service.get_email_post(1, "site-two").unwrap_err().is_not_found());
        assert_eq!(
            service.get_email_post(2, "site-two").unwrap().plain_text_content,
            "plain"
        );
    }

    #[test]
    fn delete_email_post_removes_binding() {
        let mut service = service();
        let email = NewEmail {
            email_type: "temp".into(),
            subject: "S".into(),
            content: "C".into(),
            plain_text_content: None,
        };
        let post = service.insert_email_post(1, &email).unwrap();
        service.bind_email_type(1, "temp", post).unwrap();
        service.delete_email_post(1, post).unwrap();
        assert!(!service.email_type_exists(1, "temp").unwrap());
    }

    #[test]
    fn reinstall_restores_defaults() {
        let mut service = service();
        let email = NewEmail {
            email_type: "custom".into(),
            subject: "S".into(),
            content: "C".into(),
            plain_text_content: None,
        };
        let post = service.insert_email_post(1, &email).unwrap();
        service.bind_email_type(1, "custom", post).unwrap();

        let message = service.reinstall_emails(1).unwrap();
        assert_eq!(message, "Emails have been successfully reinstalled.");
        assert!(!service.email_type_exists(1, "custom").unwrap());
        assert_eq!(
            service.list_email_posts(1).unwrap().len(),
            default_emails().len()
        );
    }

    #[test]
    fn failed_reinstall_keeps_existing_emails() {
        let mut service = service();
        let before = service.list_email_posts(1).unwrap();

        service
            .conn
            .execute_batch(
                "CREATE TRIGGER reject_terms BEFORE INSERT ON terms
                 BEGIN SELECT RAISE(ABORT, 'terms are read-only'); END;",
            )
            .unwrap();

        assert!(service.reinstall_emails(1).is_err());
        assert_eq!(service.list_email_posts(1).unwrap(), before);
    }
}
