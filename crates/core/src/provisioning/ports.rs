//! Port interfaces for schema provisioning

use async_trait::async_trait;
use mailsync_domain::{CategoryRef, InterestRef, ListRef, NewMergeField, RemoteField, Result};

/// Remote audience schema operations.
///
/// Create calls return `MailsyncError::Conflict` when the remote object
/// already exists.
#[async_trait]
pub trait AudienceSchemaApi: Send + Sync {
    /// All lists visible to the account
    async fn list_lists(&self) -> Result<Vec<ListRef>>;

    /// Create a list from creation settings that already include its name
    async fn create_list(&self, settings: &serde_json::Value) -> Result<ListRef>;

    async fn list_interest_categories(&self, list_id: &str) -> Result<Vec<CategoryRef>>;

    /// Create a hidden interest category
    async fn create_interest_category(&self, list_id: &str, title: &str) -> Result<CategoryRef>;

    async fn list_interests(&self, list_id: &str, category_id: &str) -> Result<Vec<InterestRef>>;

    async fn create_interest(
        &self,
        list_id: &str,
        category_id: &str,
        name: &str,
    ) -> Result<InterestRef>;

    async fn list_merge_fields(&self, list_id: &str) -> Result<Vec<RemoteField>>;

    async fn create_merge_field(
        &self,
        list_id: &str,
        field: &NewMergeField,
    ) -> Result<RemoteField>;
}

/// Local cache of remote identifiers
#[async_trait]
pub trait IdentifierCache: Send + Sync {
    /// Find a list by name
    async fn find_list(&self, name: &str) -> Result<Option<ListRef>>;

    /// Save a list, replacing any cached entry with the same name
    async fn save_list(&self, list: &ListRef) -> Result<()>;

    /// Find a category by (list, title)
    async fn find_category(&self, list_remote_id: &str, title: &str)
        -> Result<Option<CategoryRef>>;

    async fn save_category(&self, category: &CategoryRef) -> Result<()>;

    /// Find an interest by (category, name)
    async fn find_interest(
        &self,
        category_remote_id: &str,
        name: &str,
    ) -> Result<Option<InterestRef>>;

    async fn save_interest(&self, interest: &InterestRef) -> Result<()>;
}
