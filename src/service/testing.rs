//! Test double: a local site where one chosen operation fails

use super::{LocalService, LocalSettings, ServiceError, ServiceResult, SiteId, SiteService};
use crate::domain::{
    DataValue, EmailPost, Field, FieldGroup, Group, GroupChanges, GroupQuery, Lookup, NewEmail,
    NewField, NewFieldGroup, NewGroup, User,
};

/// Delegates to an installed in-memory [`LocalService`], except that the
/// operation named `failing` returns `ServiceError::Failed`
pub struct FailingService {
    pub inner: LocalService,
    failing: &'static str,
}

impl FailingService {
    pub fn new(failing: &'static str) -> Self {
        let mut inner = LocalService::in_memory(LocalSettings::default()).unwrap();
        inner.install("admin@example.com").unwrap();
        Self { inner, failing }
    }

    fn trip(&self, operation: &str) -> ServiceResult<()> {
        if operation == self.failing {
            return Err(ServiceError::Failed("database is locked".to_string()));
        }
        Ok(())
    }
}

impl SiteService for FailingService {
    fn is_multisite(&self) -> bool {
        self.inner.is_multisite()
    }

    fn find_user(&self, user: &Lookup) -> ServiceResult<User> {
        self.trip("find_user")?;
        self.inner.find_user(user)
    }

    fn create_group(&mut self, group: &NewGroup) -> ServiceResult<u64> {
        self.trip("create_group")?;
        self.inner.create_group(group)
    }

    fn find_group(&self, group: &Lookup) -> ServiceResult<Group> {
        self.trip("find_group")?;
        self.inner.find_group(group)
    }

    fn update_group(&mut self, id: u64, changes: &GroupChanges) -> ServiceResult<()> {
        self.trip("update_group")?;
        self.inner.update_group(id, changes)
    }

    fn delete_group(&mut self, id: u64) -> ServiceResult<()> {
        self.trip("delete_group")?;
        self.inner.delete_group(id)
    }

    fn list_groups(&self, query: &GroupQuery) -> ServiceResult<Vec<Group>> {
        self.trip("list_groups")?;
        self.inner.list_groups(query)
    }

    fn create_field_group(&mut self, group: &NewFieldGroup) -> ServiceResult<u64> {
        self.trip("create_field_group")?;
        self.inner.create_field_group(group)
    }

    fn get_field_group(&self, id: u64) -> ServiceResult<FieldGroup> {
        self.trip("get_field_group")?;
        self.inner.get_field_group(id)
    }

    fn delete_field_group(&mut self, id: u64) -> ServiceResult<()> {
        self.trip("delete_field_group")?;
        self.inner.delete_field_group(id)
    }

    fn list_field_groups(
        &self,
        group_id: Option<u64>,
    ) -> ServiceResult<Vec<(FieldGroup, Vec<Field>)>> {
        self.trip("list_field_groups")?;
        self.inner.list_field_groups(group_id)
    }

    fn create_field(&mut self, field: &NewField) -> ServiceResult<u64> {
        self.trip("create_field")?;
        self.inner.create_field(field)
    }

    fn get_field(&self, id: u64) -> ServiceResult<Field> {
        self.trip("get_field")?;
        self.inner.get_field(id)
    }

    fn find_field_by_name(&self, name: &str) -> ServiceResult<Option<Field>> {
        self.trip("find_field_by_name")?;
        self.inner.find_field_by_name(name)
    }

    fn delete_field(&mut self, id: u64, delete_data: bool) -> ServiceResult<()> {
        self.trip("delete_field")?;
        self.inner.delete_field(id, delete_data)
    }

    fn set_field_data(
        &mut self,
        field_id: u64,
        user_id: u64,
        value: &DataValue,
    ) -> ServiceResult<()> {
        self.trip("set_field_data")?;
        self.inner.set_field_data(field_id, user_id, value)
    }

    fn get_field_data(&self, field_id: u64, user_id: u64) -> ServiceResult<Option<DataValue>> {
        self.trip("get_field_data")?;
        self.inner.get_field_data(field_id, user_id)
    }

    fn delete_field_data(&mut self, field_id: u64, user_id: u64) -> ServiceResult<()> {
        self.trip("delete_field_data")?;
        self.inner.delete_field_data(field_id, user_id)
    }

    fn email_type_exists(&self, site: SiteId, email_type: &str) -> ServiceResult<bool> {
        self.trip("email_type_exists")?;
        self.inner.email_type_exists(site, email_type)
    }

    fn insert_email_post(&mut self, site: SiteId, email: &NewEmail) -> ServiceResult<u64> {
        self.trip("insert_email_post")?;
        self.inner.insert_email_post(site, email)
    }

    fn bind_email_type(
        &mut self,
        site: SiteId,
        email_type: &str,
        post_id: u64,
    ) -> ServiceResult<u64> {
        self.trip("bind_email_type")?;
        self.inner.bind_email_type(site, email_type, post_id)
    }

    fn describe_email_type(
        &mut self,
        site: SiteId,
        term_id: u64,
        description: &str,
    ) -> ServiceResult<()> {
        self.trip("describe_email_type")?;
        self.inner.describe_email_type(site, term_id, description)
    }

    fn delete_email_post(&mut self, site: SiteId, post_id: u64) -> ServiceResult<()> {
        self.trip("delete_email_post")?;
        self.inner.delete_email_post(site, post_id)
    }

    fn get_email_post(&self, site: SiteId, email_type: &str) -> ServiceResult<EmailPost> {
        self.trip("get_email_post")?;
        self.inner.get_email_post(site, email_type)
    }

    fn list_email_posts(&self, site: SiteId) -> ServiceResult<Vec<EmailPost>> {
        self.trip("list_email_posts")?;
        self.inner.list_email_posts(site)
    }

    fn reinstall_emails(&mut self, site: SiteId) -> ServiceResult<String> {
        self.trip("reinstall_emails")?;
        self.inner.reinstall_emails(site)
    }
}
