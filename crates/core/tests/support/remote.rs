//! Mock remote API implementations
//!
//! `MockAudienceApi` behaves like a tiny in-memory audience service: creates
//! add objects, duplicate creates fail with a conflict, and every call is
//! logged by name.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use mailsync_core::{AudienceSchemaApi, BatchApi, MemberExportApi};
use mailsync_domain::{
    BatchJob, BatchOperation, BatchStatus, CategoryRef, ExportTable, FieldType, InterestRef,
    ListRef, MailsyncError, NewMergeField, RemoteField, Result as DomainResult,
};

#[derive(Default)]
struct RemoteState {
    lists: Vec<ListRef>,
    categories: HashMap<String, Vec<CategoryRef>>,
    interests: HashMap<String, Vec<InterestRef>>,
    merge_fields: HashMap<String, Vec<RemoteField>>,
    list_bodies: Vec<serde_json::Value>,
    created_fields: Vec<NewMergeField>,
    next_id: u32,
}

impl RemoteState {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}-{}", self.next_id)
    }
}

/// In-memory audience service.
#[derive(Default)]
pub struct MockAudienceApi {
    state: Mutex<RemoteState>,
    calls: Mutex<Vec<String>>,
    race_on_create: AtomicBool,
}

impl MockAudienceApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_list(self, name: &str, remote_id: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .lists
            .push(ListRef { name: name.into(), remote_id: remote_id.into() });
        self
    }

    pub fn with_category(self, list_id: &str, title: &str, remote_id: &str) -> Self {
        self.state.lock().unwrap().categories.entry(list_id.into()).or_default().push(
            CategoryRef {
                remote_id: remote_id.into(),
                title: title.into(),
                list_remote_id: list_id.into(),
            },
        );
        self
    }

    pub fn with_interest(self, category_id: &str, name: &str, remote_id: &str) -> Self {
        self.state.lock().unwrap().interests.entry(category_id.into()).or_default().push(
            InterestRef {
                remote_id: remote_id.into(),
                name: name.into(),
                category_remote_id: category_id.into(),
            },
        );
        self
    }

    pub fn with_merge_field(self, list_id: &str, name: &str, tag: &str, kind: FieldType) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            let fields = state.merge_fields.entry(list_id.into()).or_default();
            let merge_id = Some(fields.len() as u32 + 1);
            fields.push(RemoteField {
                merge_id,
                name: name.into(),
                tag: tag.into(),
                field_type: kind,
            });
        }
        self
    }

    /// Simulate another writer creating the object between our lookup and our
    /// create: the create stores the object but answers with a conflict.
    pub fn racing_creates(self) -> Self {
        self.race_on_create.store(true, Ordering::SeqCst);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| *c == call).count()
    }

    pub fn create_calls(&self) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| c.starts_with("create_")).count()
    }

    pub fn list_bodies(&self) -> Vec<serde_json::Value> {
        self.state.lock().unwrap().list_bodies.clone()
    }

    pub fn created_fields(&self) -> Vec<NewMergeField> {
        self.state.lock().unwrap().created_fields.clone()
    }

    pub fn merge_fields(&self, list_id: &str) -> Vec<RemoteField> {
        self.state.lock().unwrap().merge_fields.get(list_id).cloned().unwrap_or_default()
    }

    fn record(&self, call: &str) {
        self.calls.lock().unwrap().push(call.to_string());
    }

    fn racing(&self) -> bool {
        self.race_on_create.load(Ordering::SeqCst)
    }
}

fn conflict(what: &str) -> MailsyncError {
    MailsyncError::Conflict(format!("{what} already exists"))
}

#[async_trait]
impl AudienceSchemaApi for MockAudienceApi {
    async fn list_lists(&self) -> DomainResult<Vec<ListRef>> {
        self.record("list_lists");
        Ok(self.state.lock().unwrap().lists.clone())
    }

    async fn create_list(&self, settings: &serde_json::Value) -> DomainResult<ListRef> {
        self.record("create_list");
        let name = settings["name"].as_str().unwrap_or_default().to_string();
        let mut state = self.state.lock().unwrap();
        state.list_bodies.push(settings.clone());
        if state.lists.iter().any(|l| l.name == name) {
            return Err(conflict("list"));
        }
        let list = ListRef { name, remote_id: state.next_id("list") };
        state.lists.push(list.clone());
        if self.racing() {
            return Err(conflict("list"));
        }
        Ok(list)
    }

    async fn list_interest_categories(&self, list_id: &str) -> DomainResult<Vec<CategoryRef>> {
        self.record("list_interest_categories");
        Ok(self.state.lock().unwrap().categories.get(list_id).cloned().unwrap_or_default())
    }

    async fn create_interest_category(
        &self,
        list_id: &str,
        title: &str,
    ) -> DomainResult<CategoryRef> {
        self.record("create_interest_category");
        let mut state = self.state.lock().unwrap();
        if state.categories.get(list_id).is_some_and(|cs| cs.iter().any(|c| c.title == title)) {
            return Err(conflict("category"));
        }
        let category = CategoryRef {
            remote_id: state.next_id("cat"),
            title: title.into(),
            list_remote_id: list_id.into(),
        };
        state.categories.entry(list_id.into()).or_default().push(category.clone());
        if self.racing() {
            return Err(conflict("category"));
        }
        Ok(category)
    }

    async fn list_interests(
        &self,
        _list_id: &str,
        category_id: &str,
    ) -> DomainResult<Vec<InterestRef>> {
        self.record("list_interests");
        Ok(self.state.lock().unwrap().interests.get(category_id).cloned().unwrap_or_default())
    }

    async fn create_interest(
        &self,
        _list_id: &str,
        category_id: &str,
        name: &str,
    ) -> DomainResult<InterestRef> {
        self.record("create_interest");
        let mut state = self.state.lock().unwrap();
        if state.interests.get(category_id).is_some_and(|is| is.iter().any(|i| i.name == name)) {
            return Err(conflict("interest"));
        }
        let interest = InterestRef {
            remote_id: state.next_id("int"),
            name: name.into(),
            category_remote_id: category_id.into(),
        };
        state.interests.entry(category_id.into()).or_default().push(interest.clone());
        if self.racing() {
            return Err(conflict("interest"));
        }
        Ok(interest)
    }

    async fn list_merge_fields(&self, list_id: &str) -> DomainResult<Vec<RemoteField>> {
        self.record("list_merge_fields");
        Ok(self.state.lock().unwrap().merge_fields.get(list_id).cloned().unwrap_or_default())
    }

    async fn create_merge_field(
        &self,
        list_id: &str,
        field: &NewMergeField,
    ) -> DomainResult<RemoteField> {
        self.record("create_merge_field");
        let mut state = self.state.lock().unwrap();
        state.created_fields.push(field.clone());
        let fields = state.merge_fields.entry(list_id.into()).or_default();
        if fields.iter().any(|f| f.name == field.name) {
            return Err(conflict("merge field"));
        }
        let merge_id = fields.len() as u32 + 1;
        let created = RemoteField {
            merge_id: Some(merge_id),
            name: field.name.clone(),
            tag: field.tag.clone().unwrap_or_else(|| format!("MMERGE{merge_id}")),
            field_type: field.field_type,
        };
        fields.push(created.clone());
        if self.racing() {
            return Err(conflict("merge field"));
        }
        Ok(created)
    }
}

/// Batch endpoint that records submissions and replays scripted poll
/// responses, finishing the job once the script runs out.
#[derive(Default)]
pub struct MockBatchApi {
    submitted: Mutex<Vec<Vec<BatchOperation>>>,
    polls: Mutex<VecDeque<DomainResult<BatchJob>>>,
    poll_count: AtomicUsize,
}

impl MockBatchApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_poll_responses(self, responses: Vec<DomainResult<BatchJob>>) -> Self {
        *self.polls.lock().unwrap() = responses.into();
        self
    }

    pub fn submissions(&self) -> Vec<Vec<BatchOperation>> {
        self.submitted.lock().unwrap().clone()
    }

    pub fn poll_count(&self) -> usize {
        self.poll_count.load(Ordering::SeqCst)
    }

    pub fn job(id: &str, status: BatchStatus, total: u64) -> BatchJob {
        BatchJob {
            id: id.into(),
            status,
            total_operations: total,
            finished_operations: if status == BatchStatus::Finished { total } else { 0 },
            errored_operations: 0,
            response_body_url: (status == BatchStatus::Finished)
                .then(|| format!("https://results.example.invalid/{id}.tar.gz")),
        }
    }

    fn last_total(&self) -> u64 {
        self.submitted.lock().unwrap().last().map_or(0, |ops| ops.len() as u64)
    }
}

#[async_trait]
impl BatchApi for MockBatchApi {
    async fn submit_batch(&self, operations: &[BatchOperation]) -> DomainResult<BatchJob> {
        self.submitted.lock().unwrap().push(operations.to_vec());
        Ok(Self::job("batch-1", BatchStatus::Pending, operations.len() as u64))
    }

    async fn get_batch(&self, batch_id: &str) -> DomainResult<BatchJob> {
        self.poll_count.fetch_add(1, Ordering::SeqCst);
        let scripted = self.polls.lock().unwrap().pop_front();
        scripted
            .unwrap_or_else(|| Ok(Self::job(batch_id, BatchStatus::Finished, self.last_total())))
    }
}

/// Member export returning a fixed table.
#[derive(Default)]
pub struct MockExportApi {
    table: ExportTable,
    calls: AtomicUsize,
}

impl MockExportApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Export whose identity column holds `emails` under a header row.
    pub fn with_emails(emails: &[&str]) -> Self {
        let mut rows = vec![vec![Some("Email Address".to_string()), Some("First Name".to_string())]];
        rows.extend(emails.iter().map(|e| vec![Some((*e).to_string()), None]));
        Self { table: ExportTable::new(rows), calls: AtomicUsize::new(0) }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MemberExportApi for MockExportApi {
    async fn export_members(&self, _list_id: &str) -> DomainResult<ExportTable> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.table.clone())
    }
}
