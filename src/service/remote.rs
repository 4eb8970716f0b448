//! Remote site over HTTP
//!
//! Talks JSON to a site API rooted at `api_url`. Status codes map onto
//! [`ServiceError`] variants so commands never see raw HTTP.

use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::{ServiceError, ServiceResult, SiteId, SiteService};
use crate::domain::{
    DataValue, EmailPost, Field, FieldGroup, Group, GroupChanges, GroupQuery, Lookup, NewEmail,
    NewField, NewFieldGroup, NewGroup, User,
};

/// Connection settings for a remote site
#[derive(Debug, Clone)]
pub struct RemoteSettings {
    pub api_url: String,
    pub multisite: bool,
    pub timeout: Duration,
}

/// A site reached through its HTTP API
pub struct RemoteService {
    client: Client,
    base: Url,
    multisite: bool,
}

#[derive(Deserialize)]
struct Created {
    id: u64,
}

#[derive(Deserialize)]
struct Message {
    message: String,
}

#[derive(Deserialize)]
struct FieldGroupWithFields {
    #[serde(flatten)]
    group: FieldGroup,
    #[serde(default)]
    fields: Vec<Field>,
}

#[derive(Serialize)]
struct DataBody<'a> {
    value: &'a DataValue,
}

#[derive(Deserialize)]
struct DataResponse {
    value: Option<DataValue>,
}

#[derive(Serialize)]
struct TypeBinding<'a> {
    #[serde(rename = "type")]
    email_type: &'a str,
    post_id: u64,
}

#[derive(Serialize)]
struct TypeDescription<'a> {
    description: &'a str,
}

impl RemoteService {
    const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

    pub fn new(settings: RemoteSettings) -> ServiceResult<Self> {
        let client = Client::builder()
            .connect_timeout(Self::CONNECT_TIMEOUT)
            .timeout(settings.timeout)
            .user_agent(concat!("bp-cli/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let base = Url::parse(&settings.api_url)
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| {
                ServiceError::Validation(format!("Invalid site API URL: {}", settings.api_url))
            })?;

        Ok(Self {
            client,
            base,
            multisite: settings.multisite,
        })
    }

    /// The endpoint under the API root; each segment is percent-encoded
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn data_url(&self, field_id: u64, user_id: u64) -> Url {
        self.url(&["xprofile", "fields", &field_id.to_string(), "data", &user_id.to_string()])
    }

    fn site_url(&self, site: SiteId, segments: &[&str]) -> Url {
        let site = site.to_string();
        let mut path = vec!["sites", site.as_str()];
        path.extend_from_slice(segments);
        self.url(&path)
    }

    fn fetch<T: DeserializeOwned>(&self, request: RequestBuilder) -> ServiceResult<T> {
        let response = check(request.send()?)?;
        Ok(response.json()?)
    }

    fn fetch_optional<T: DeserializeOwned>(&self, request: RequestBuilder) -> ServiceResult<Option<T>> {
        match self.fetch(request) {
            Ok(value) => Ok(Some(value)),
            Err(ServiceError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn execute(&self, request: RequestBuilder) -> ServiceResult<()> {
        check(request.send()?)?;
        Ok(())
    }
}

/// Turns error statuses into service errors, using the body's message when present
fn check(response: Response) -> ServiceResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response
        .json::<Message>()
        .map(|m| m.message)
        .unwrap_or_else(|_| format!("Site API returned {}", status));

    Err(error_for_status(status, message))
}

fn error_for_status(status: StatusCode, message: String) -> ServiceError {
    match status {
        StatusCode::NOT_FOUND => ServiceError::NotFound(message),
        StatusCode::CONFLICT => ServiceError::Conflict(message),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            ServiceError::Validation(message)
        }
        _ => ServiceError::Failed(message),
    }
}

fn lookup_segment(lookup: &Lookup) -> String {
    match lookup {
        Lookup::Id(id) => id.to_string(),
        Lookup::Name(name) => format!("name:{}", name),
    }
}

impl SiteService for RemoteService {
    fn is_multisite(&self) -> bool {
        self.multisite
    }

    fn find_user(&self, user: &Lookup) -> ServiceResult<User> {
        self.fetch(
            self.client
                .get(self.url(&["users", &lookup_segment(user)])),
        )
    }

    fn create_group(&mut self, group: &NewGroup) -> ServiceResult<u64> {
        let created: Created = self.fetch(self.client.post(self.url(&["groups"])).json(group))?;
        Ok(created.id)
    }

    fn find_group(&self, group: &Lookup) -> ServiceResult<Group> {
        self.fetch(
            self.client
                .get(self.url(&["groups", &lookup_segment(group)])),
        )
    }

    fn update_group(&mut self, id: u64, changes: &GroupChanges) -> ServiceResult<()> {
        self.execute(
            self.client
                .patch(self.url(&["groups", &id.to_string()]))
                .json(changes),
        )
    }

    fn delete_group(&mut self, id: u64) -> ServiceResult<()> {
        self.execute(self.client.delete(self.url(&["groups", &id.to_string()])))
    }

    fn list_groups(&self, query: &GroupQuery) -> ServiceResult<Vec<Group>> {
        let mut params: Vec<(&str, String)> = vec![
            ("orderby", query.orderby.as_str().to_string()),
            ("order", query.order.as_str().to_string()),
            ("show_hidden", query.show_hidden.to_string()),
        ];
        if let Some(creator) = query.creator_id {
            params.push(("creator_id", creator.to_string()));
        }
        if let Some(status) = query.status {
            params.push(("status", status.as_str().to_string()));
        }
        if let Some(per_page) = query.per_page {
            params.push(("per_page", per_page.to_string()));
        }
        self.fetch(self.client.get(self.url(&["groups"])).query(&params))
    }

    fn create_field_group(&mut self, group: &NewFieldGroup) -> ServiceResult<u64> {
        let created: Created =
            self.fetch(self.client.post(self.url(&["xprofile", "groups"])).json(group))?;
        Ok(created.id)
    }

    fn get_field_group(&self, id: u64) -> ServiceResult<FieldGroup> {
        self.fetch(self.client.get(self.url(&["xprofile", "groups", &id.to_string()])))
    }

    fn delete_field_group(&mut self, id: u64) -> ServiceResult<()> {
        self.execute(
            self.client
                .delete(self.url(&["xprofile", "groups", &id.to_string()])),
        )
    }

    fn list_field_groups(
        &self,
        group_id: Option<u64>,
    ) -> ServiceResult<Vec<(FieldGroup, Vec<Field>)>> {
        let mut params = vec![("fetch_fields", "true".to_string())];
        if let Some(id) = group_id {
            params.push(("group_id", id.to_string()));
        }
        let groups: Vec<FieldGroupWithFields> =
            self.fetch(self.client.get(self.url(&["xprofile", "groups"])).query(&params))?;
        Ok(groups.into_iter().map(|g| (g.group, g.fields)).collect())
    }

    fn create_field(&mut self, field: &NewField) -> ServiceResult<u64> {
        let created: Created =
            self.fetch(self.client.post(self.url(&["xprofile", "fields"])).json(field))?;
        Ok(created.id)
    }

    fn get_field(&self, id: u64) -> ServiceResult<Field> {
        self.fetch(self.client.get(self.url(&["xprofile", "fields", &id.to_string()])))
    }

    fn find_field_by_name(&self, name: &str) -> ServiceResult<Option<Field>> {
        let fields: Vec<Field> = self.fetch(
            self.client
                .get(self.url(&["xprofile", "fields"]))
                .query(&[("name", name)]),
        )?;
        Ok(fields.into_iter().min_by_key(|f| f.id))
    }

    fn delete_field(&mut self, id: u64, delete_data: bool) -> ServiceResult<()> {
        self.execute(
            self.client
                .delete(self.url(&["xprofile", "fields", &id.to_string()]))
                .query(&[("delete_data", delete_data)]),
        )
    }

    fn set_field_data(
        &mut self,
        field_id: u64,
        user_id: u64,
        value: &DataValue,
    ) -> ServiceResult<()> {
        self.execute(
            self.client
                .put(self.data_url(field_id, user_id))
                .json(&DataBody { value }),
        )
    }

    fn get_field_data(&self, field_id: u64, user_id: u64) -> ServiceResult<Option<DataValue>> {
        let data: Option<DataResponse> = self.fetch_optional(
            self.client
                .get(self.data_url(field_id, user_id)),
        )?;
        Ok(data.and_then(|d| d.value))
    }

    fn delete_field_data(&mut self, field_id: u64, user_id: u64) -> ServiceResult<()> {
        self.execute(
            self.client
                .delete(self.data_url(field_id, user_id)),
        )
    }

    fn email_type_exists(&self, site: SiteId, email_type: &str) -> ServiceResult<bool> {
        let response = self
            .client
            .head(self.site_url(site, &["email-types", email_type]))
            .send()?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(false),
            _ => check(response).map(|_| true),
        }
    }

    fn insert_email_post(&mut self, site: SiteId, email: &NewEmail) -> ServiceResult<u64> {
        let created: Created =
            self.fetch(self.client.post(self.site_url(site, &["emails"])).json(email))?;
        Ok(created.id)
    }

    fn bind_email_type(
        &mut self,
        site: SiteId,
        email_type: &str,
        post_id: u64,
    ) -> ServiceResult<u64> {
        let created: Created = self.fetch(
            self.client
                .post(self.site_url(site, &["email-types"]))
                .json(&TypeBinding { email_type, post_id }),
        )?;
        Ok(created.id)
    }

    fn describe_email_type(
        &mut self,
        site: SiteId,
        term_id: u64,
        description: &str,
    ) -> ServiceResult<()> {
        self.execute(
            self.client
                .patch(self.site_url(site, &["email-types", &term_id.to_string()]))
                .json(&TypeDescription { description }),
        )
    }

    fn delete_email_post(&mut self, site: SiteId, post_id: u64) -> ServiceResult<()> {
        self.execute(
            self.client
                .delete(self.site_url(site, &["emails", &post_id.to_string()])),
        )
    }

    fn get_email_post(&self, site: SiteId, email_type: &str) -> ServiceResult<EmailPost> {
        self.fetch(
            self.client
                .get(self.site_url(site, &["emails", "type", email_type])),
        )
    }

    fn list_email_posts(&self, site: SiteId) -> ServiceResult<Vec<EmailPost>> {
        self.fetch(self.client.get(self.site_url(site, &["emails"])))
    }

    fn reinstall_emails(&mut self, site: SiteId) -> ServiceResult<String> {
        let message: Message =
            self.fetch(self.client.post(self.site_url(site, &["emails", "reinstall"])))?;
        Ok(message.message)
    }
}
