//! Schema provisioner - resolves remote objects through the local cache

use std::collections::HashSet;
use std::sync::Arc;

use mailsync_domain::constants::{ADDRESS_FIELD_NAME, ADDRESS_FIELD_TAG};
use mailsync_domain::{
    CategoryRef, FieldType, InterestRef, ListRef, MailsyncError, NewMergeField, RemoteField,
    Result,
};
use tracing::{debug, info, instrument};

use super::create_or_find::{create_or_find, find_or_create};
use super::ports::{AudienceSchemaApi, IdentifierCache};
use crate::classification::{FieldPlan, InterestIndex};

/// Idempotent resolver for the remote list, interest categories, interests,
/// and merge fields.
///
/// Every object goes cache, then remote list-and-match, then create. Created
/// or matched objects are cached so a second resolution makes no remote
/// calls.
pub struct SchemaProvisioner {
    api: Arc<dyn AudienceSchemaApi>,
    cache: Arc<dyn IdentifierCache>,
}

impl SchemaProvisioner {
    pub fn new(api: Arc<dyn AudienceSchemaApi>, cache: Arc<dyn IdentifierCache>) -> Self {
        Self { api, cache }
    }

    /// Resolve the list named `name`, creating it from `settings` if needed.
    ///
    /// # Errors
    /// Returns `MailsyncError::Config` when `settings` is not an object.
    #[instrument(skip(self, settings))]
    pub async fn resolve_list(&self, name: &str, settings: &serde_json::Value) -> Result<ListRef> {
        if let Some(list) = self.cache.find_list(name).await? {
            debug!(list_id = %list.remote_id, "List found in cache");
            return Ok(list);
        }

        let mut body = settings.as_object().cloned().ok_or_else(|| {
            MailsyncError::Config("audience_settings must be a table".to_string())
        })?;
        body.insert("name".to_string(), serde_json::Value::String(name.to_string()));
        let body = &serde_json::Value::Object(body);

        let api = &self.api;
        let resolution = find_or_create(
            "list",
            move || api.list_lists(),
            |list: &ListRef| list.name == name,
            move || api.create_list(body),
        )
        .await?;

        if resolution.was_created() {
            info!(name, "Created remote list");
        }
        let list = ListRef { name: name.to_string(), remote_id: resolution.into_inner().remote_id };
        self.cache.save_list(&list).await?;
        Ok(list)
    }

    /// Resolve a hidden interest category of `list` by title.
    #[instrument(skip(self, list), fields(list_id = %list.remote_id))]
    pub async fn resolve_category(&self, list: &ListRef, title: &str) -> Result<CategoryRef> {
        if let Some(category) = self.cache.find_category(&list.remote_id, title).await? {
            return Ok(category);
        }

        let api = &self.api;
        let list_id = list.remote_id.as_str();
        let resolution = find_or_create(
            "interest category",
            move || api.list_interest_categories(list_id),
            |category: &CategoryRef| category.title == title,
            move || api.create_interest_category(list_id, title),
        )
        .await?;

        if resolution.was_created() {
            info!(title, "Created interest category");
        }
        let category = CategoryRef {
            remote_id: resolution.into_inner().remote_id,
            title: title.to_string(),
            list_remote_id: list.remote_id.clone(),
        };
        self.cache.save_category(&category).await?;
        Ok(category)
    }

    /// Resolve an interest of `category` by name.
    #[instrument(skip(self, list, category), fields(category = %category.title))]
    pub async fn resolve_interest(
        &self,
        list: &ListRef,
        category: &CategoryRef,
        name: &str,
    ) -> Result<InterestRef> {
        if let Some(interest) = self.cache.find_interest(&category.remote_id, name).await? {
            return Ok(interest);
        }

        let api = &self.api;
        let list_id = list.remote_id.as_str();
        let category_id = category.remote_id.as_str();
        let resolution = find_or_create(
            "interest",
            move || api.list_interests(list_id, category_id),
            |interest: &InterestRef| interest.name == name,
            move || api.create_interest(list_id, category_id, name),
        )
        .await?;

        if resolution.was_created() {
            info!(name, "Created interest");
        }
        let interest = InterestRef {
            remote_id: resolution.into_inner().remote_id,
            name: name.to_string(),
            category_remote_id: category.remote_id.clone(),
        };
        self.cache.save_interest(&interest).await?;
        Ok(interest)
    }

    /// Resolve every interest category and interest named by the plan.
    pub async fn resolve_interests(&self, list: &ListRef, plan: &FieldPlan) -> Result<InterestIndex> {
        let mut index = InterestIndex::default();
        for group in plan.interest_groups() {
            let category = self.resolve_category(list, &group.title).await?;
            for name in &group.interests {
                let interest = self.resolve_interest(list, &category, name).await?;
                index.insert(group.title.clone(), name.clone(), interest.remote_id);
            }
        }
        Ok(index)
    }

    /// Create the merge fields the plan needs and the remote lacks.
    ///
    /// An address field is created first when the list has none. Returns the
    /// remote fields as they stand afterwards.
    #[instrument(skip(self, list, plan), fields(list_id = %list.remote_id))]
    pub async fn provision_fields(
        &self,
        list: &ListRef,
        plan: &FieldPlan,
    ) -> Result<Vec<RemoteField>> {
        let list_id = list.remote_id.as_str();
        let mut remote = self.api.list_merge_fields(list_id).await?;

        let known: HashSet<String> = remote.iter().map(|f| f.name.clone()).collect();
        let mut seen = HashSet::new();
        let new_fields: Vec<NewMergeField> = plan
            .merge_fields()
            .filter(|(_, display_name)| !known.contains(*display_name))
            .filter(|(_, display_name)| seen.insert(display_name.to_string()))
            .map(|(column, display_name)| {
                NewMergeField::for_declared_type(display_name, &column.declared_type)
            })
            .collect();

        if new_fields.is_empty() {
            info!("No new fields found");
        } else {
            let names: Vec<&str> = new_fields.iter().map(|f| f.name.as_str()).collect();
            info!(fields = ?names, "Found new fields");
        }

        if !remote.iter().any(|f| f.field_type == FieldType::Address) {
            info!("No address merge field found, creating one");
            let address = NewMergeField::address(ADDRESS_FIELD_NAME, ADDRESS_FIELD_TAG);
            remote.push(self.create_field(list_id, &address).await?);
        }

        for field in &new_fields {
            info!(field = %field.name, field_type = ?field.field_type, "Syncing new field");
            remote.push(self.create_field(list_id, field).await?);
        }

        Ok(remote)
    }

    async fn create_field(&self, list_id: &str, field: &NewMergeField) -> Result<RemoteField> {
        let api = &self.api;
        let resolution = create_or_find(
            "merge field",
            api.create_merge_field(list_id, field),
            move || async move {
                let fields = api.list_merge_fields(list_id).await?;
                Ok::<_, MailsyncError>(fields.into_iter().find(|f| f.name == field.name))
            },
        )
        .await?;
        Ok(resolution.into_inner())
    }
}
