//! Mailchimp API client for audience schema, batch jobs, and member export

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use mailsync_core::{AudienceSchemaApi, BatchApi, MemberExportApi};
use mailsync_domain::constants::REMOTE_PAGE_SIZE;
use mailsync_domain::{
    AppConfig, BatchJob, BatchOperation, CategoryRef, ExportTable, InterestRef, ListRef,
    MailsyncError, NewMergeField, RemoteField, Result,
};
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};

use super::errors::MailchimpError;
use super::types::{
    parse_export, BatchRequest, CategoriesPage, CategoryResource, InterestResource, InterestsPage,
    ListResource, ListsPage, MergeFieldsPage, NewCategory, NewInterest,
};
use crate::http::HttpClient;

/// Projection requested when reading merge fields
const MERGE_FIELD_PROJECTION: &str =
    "merge_fields.merge_id,merge_fields.name,merge_fields.tag,merge_fields.type";

/// Basic-auth user name; the API only checks the password (the key)
const BASIC_AUTH_USER: &str = "anystring";

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Per-attempt transport timeout for the member export download
const DEFAULT_EXPORT_TIMEOUT: Duration = Duration::from_secs(300);

/// Mailchimp marketing and export API client
pub struct MailchimpClient {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    export_url: String,
    request_timeout: Duration,
    export_timeout: Duration,
}

impl MailchimpClient {
    /// Create a client against explicit endpoints
    ///
    /// # Arguments
    /// * `api_key` - Mailchimp API key
    /// * `api_url` - Marketing API root, e.g. `https://us6.api.mailchimp.com/3.0`
    /// * `export_url` - Export API root, e.g. `https://us6.api.mailchimp.com/export/1.0`
    /// * `http_client` - Retrying transport
    pub fn new(
        api_key: impl Into<String>,
        api_url: impl Into<String>,
        export_url: impl Into<String>,
        http_client: HttpClient,
    ) -> Self {
        Self {
            http_client,
            api_key: api_key.into(),
            api_url: api_url.into().trim_end_matches('/').to_string(),
            export_url: export_url.into().trim_end_matches('/').to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            export_timeout: DEFAULT_EXPORT_TIMEOUT,
        }
    }

    /// Build from application configuration, deriving endpoints from the
    /// key's data center unless overridden.
    ///
    /// `request_timeout_secs` bounds each transport attempt; the per-call
    /// deadline spans every attempt of the retry schedule.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.request_timeout_secs);
        let http_client = HttpClient::builder()
            .timeout(timeout)
            .user_agent(concat!("mailsync/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let call_deadline = http_client.retry_policy().budget(timeout);

        Ok(Self::new(
            config.api_key.clone(),
            config.resolved_api_base_url()?,
            config.resolved_export_base_url()?,
            http_client,
        )
        .with_request_timeout(call_deadline)
        .with_export_timeout(DEFAULT_EXPORT_TIMEOUT.max(timeout)))
    }

    /// Upper bound on one marketing API call, retries included
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Per-attempt timeout for the member export download
    pub fn with_export_timeout(mut self, timeout: Duration) -> Self {
        self.export_timeout = timeout;
        self
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    fn api(&self, method: Method, path: &str) -> RequestBuilder {
        self.http_client
            .request(method, format!("{}/{}", self.api_url, path))
            .basic_auth(BASIC_AUTH_USER, Some(&self.api_key))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        let builder = self.api(Method::GET, path).query(query);
        self.bounded(path, self.fetch_json(builder)).await
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let builder = self.api(Method::POST, path).json(body);
        self.bounded(path, self.fetch_json(builder)).await
    }

    /// Apply the per-call deadline. Expiry is a transient network failure;
    /// `Timeout` stays reserved for bounded waits such as batch polling.
    async fn bounded<T>(&self, what: &str, call: impl Future<Output = Result<T>>) -> Result<T> {
        tokio::time::timeout(self.request_timeout, call).await.map_err(|_| {
            MailsyncError::Network(format!(
                "Mailchimp call '{what}' exceeded {:?}",
                self.request_timeout
            ))
        })?
    }

    async fn fetch_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        let response = self.checked(builder).await?;
        let body = response.text().await.map_err(|err| {
            MailsyncError::Network(format!("failed to read Mailchimp response: {err}"))
        })?;
        serde_json::from_str(&body).map_err(|err| {
            MailchimpError::InvalidBody(format!("failed to parse response: {err}")).into()
        })
    }

    /// Send and turn non-success statuses into domain errors.
    async fn checked(&self, builder: RequestBuilder) -> Result<Response> {
        let response = self.http_client.send(builder).await?;
        let status = response.status();
        debug!(status = status.as_u16(), "Received Mailchimp response");

        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(MailchimpError::from_response(status.as_u16(), &body).into())
    }
}

#[async_trait]
impl AudienceSchemaApi for MailchimpClient {
    async fn list_lists(&self) -> Result<Vec<ListRef>> {
        let count = REMOTE_PAGE_SIZE.to_string();
        let page: ListsPage = self.get_json("lists", &[("count", count.as_str())]).await?;
        Ok(page.lists.into_iter().map(ListRef::from).collect())
    }

    async fn create_list(&self, settings: &serde_json::Value) -> Result<ListRef> {
        let list: ListResource = self.post_json("lists", settings).await?;
        info!(list_id = %list.id, name = %list.name, "Created Mailchimp list");
        Ok(list.into())
    }

    async fn list_interest_categories(&self, list_id: &str) -> Result<Vec<CategoryRef>> {
        let count = REMOTE_PAGE_SIZE.to_string();
        let path = format!("lists/{list_id}/interest-categories");
        let page: CategoriesPage = self.get_json(&path, &[("count", count.as_str())]).await?;
        Ok(page.categories.into_iter().map(|c| c.into_ref(list_id)).collect())
    }

    async fn create_interest_category(&self, list_id: &str, title: &str) -> Result<CategoryRef> {
        let path = format!("lists/{list_id}/interest-categories");
        let category: CategoryResource =
            self.post_json(&path, &NewCategory::hidden(title)).await?;
        Ok(category.into_ref(list_id))
    }

    async fn list_interests(&self, list_id: &str, category_id: &str) -> Result<Vec<InterestRef>> {
        let count = REMOTE_PAGE_SIZE.to_string();
        let path = format!("lists/{list_id}/interest-categories/{category_id}/interests");
        let page: InterestsPage = self.get_json(&path, &[("count", count.as_str())]).await?;
        Ok(page.interests.into_iter().map(|i| i.into_ref(category_id)).collect())
    }

    async fn create_interest(
        &self,
        list_id: &str,
        category_id: &str,
        name: &str,
    ) -> Result<InterestRef> {
        let path = format!("lists/{list_id}/interest-categories/{category_id}/interests");
        let interest: InterestResource =
            self.post_json(&path, &NewInterest { name }).await?;
        Ok(interest.into_ref(category_id))
    }

    async fn list_merge_fields(&self, list_id: &str) -> Result<Vec<RemoteField>> {
        let count = REMOTE_PAGE_SIZE.to_string();
        let path = format!("lists/{list_id}/merge-fields");
        let page: MergeFieldsPage = self
            .get_json(&path, &[("count", count.as_str()), ("fields", MERGE_FIELD_PROJECTION)])
            .await?;
        Ok(page.merge_fields)
    }

    async fn create_merge_field(
        &self,
        list_id: &str,
        field: &NewMergeField,
    ) -> Result<RemoteField> {
        let path = format!("lists/{list_id}/merge-fields");
        let created: RemoteField = self.post_json(&path, field).await?;
        info!(list_id, tag = %created.tag, name = %created.name, "Created merge field");
        Ok(created)
    }
}

#[async_trait]
impl BatchApi for MailchimpClient {
    async fn submit_batch(&self, operations: &[BatchOperation]) -> Result<BatchJob> {
        self.post_json("batches", &BatchRequest { operations }).await
    }

    async fn get_batch(&self, batch_id: &str) -> Result<BatchJob> {
        self.get_json(&format!("batches/{batch_id}"), &[]).await
    }
}

#[async_trait]
impl MemberExportApi for MailchimpClient {
    async fn export_members(&self, list_id: &str) -> Result<ExportTable> {
        let builder = self
            .http_client
            .request(Method::GET, format!("{}/list/", self.export_url))
            .query(&[("apikey", self.api_key.as_str()), ("id", list_id)])
            .timeout(self.export_timeout);

        // Large audiences stream for a long time; only the transport timeout applies.
        let response = self.checked(builder).await?;
        let body = response.text().await.map_err(|err| {
            MailsyncError::Network(format!("failed to read export body: {err}"))
        })?;

        let table = parse_export(&body)?;
        debug!(list_id, rows = table.rows.len(), "Parsed member export");
        Ok(table)
    }
}
