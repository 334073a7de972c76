//! Mock local stores: identifier cache, contact source, run marker

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mailsync_core::{ContactSource, IdentifierCache, RunStateStore};
use mailsync_domain::{
    CategoryRef, ColumnInfo, ContactRecord, InterestRef, ListRef, MailsyncError,
    Result as DomainResult, RowFilter,
};

/// HashMap-backed identifier cache.
#[derive(Default)]
pub struct MockIdentifierCache {
    lists: Mutex<HashMap<String, ListRef>>,
    categories: Mutex<HashMap<(String, String), CategoryRef>>,
    interests: Mutex<HashMap<(String, String), InterestRef>>,
}

impl MockIdentifierCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cached_list(&self, name: &str) -> Option<ListRef> {
        self.lists.lock().unwrap().get(name).cloned()
    }

    pub fn category_count(&self) -> usize {
        self.categories.lock().unwrap().len()
    }

    pub fn interest_count(&self) -> usize {
        self.interests.lock().unwrap().len()
    }
}

#[async_trait]
impl IdentifierCache for MockIdentifierCache {
    async fn find_list(&self, name: &str) -> DomainResult<Option<ListRef>> {
        Ok(self.lists.lock().unwrap().get(name).cloned())
    }

    async fn save_list(&self, list: &ListRef) -> DomainResult<()> {
        self.lists.lock().unwrap().insert(list.name.clone(), list.clone());
        Ok(())
    }

    async fn find_category(
        &self,
        list_remote_id: &str,
        title: &str,
    ) -> DomainResult<Option<CategoryRef>> {
        let key = (list_remote_id.to_string(), title.to_string());
        Ok(self.categories.lock().unwrap().get(&key).cloned())
    }

    async fn save_category(&self, category: &CategoryRef) -> DomainResult<()> {
        let key = (category.list_remote_id.clone(), category.title.clone());
        self.categories.lock().unwrap().insert(key, category.clone());
        Ok(())
    }

    async fn find_interest(
        &self,
        category_remote_id: &str,
        name: &str,
    ) -> DomainResult<Option<InterestRef>> {
        let key = (category_remote_id.to_string(), name.to_string());
        Ok(self.interests.lock().unwrap().get(&key).cloned())
    }

    async fn save_interest(&self, interest: &InterestRef) -> DomainResult<()> {
        let key = (interest.category_remote_id.clone(), interest.name.clone());
        self.interests.lock().unwrap().insert(key, interest.clone());
        Ok(())
    }
}

/// Single-table contact source evaluating filters in memory.
#[derive(Default)]
pub struct MockContactSource {
    columns: Vec<ColumnInfo>,
    rows: Vec<ContactRecord>,
    filters: Mutex<Vec<RowFilter>>,
    fail_queries: AtomicBool,
}

impl MockContactSource {
    pub fn new(columns: Vec<ColumnInfo>, rows: Vec<ContactRecord>) -> Self {
        Self { columns, rows, ..Self::default() }
    }

    /// Make every row query fail with a database error.
    pub fn failing(self) -> Self {
        self.fail_queries.store(true, Ordering::SeqCst);
        self
    }

    /// Filters passed to `query_rows`, in call order.
    pub fn filters(&self) -> Vec<RowFilter> {
        self.filters.lock().unwrap().clone()
    }
}

#[async_trait]
impl ContactSource for MockContactSource {
    async fn list_columns(&self, _table: &str) -> DomainResult<Vec<ColumnInfo>> {
        Ok(self.columns.clone())
    }

    async fn query_rows(
        &self,
        table: &str,
        filter: &RowFilter,
    ) -> DomainResult<Vec<ContactRecord>> {
        self.filters.lock().unwrap().push(filter.clone());
        if self.fail_queries.load(Ordering::SeqCst) {
            return Err(MailsyncError::Database(format!("no such table: {table}")));
        }
        Ok(self.rows.iter().filter(|row| filter.matches(row)).cloned().collect())
    }
}

/// In-memory last-run marker.
#[derive(Default)]
pub struct MockRunStateStore {
    last_run: Mutex<Option<DateTime<Utc>>>,
    commits: AtomicUsize,
}

impl MockRunStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_last_run(last_run: DateTime<Utc>) -> Self {
        Self { last_run: Mutex::new(Some(last_run)), commits: AtomicUsize::new(0) }
    }

    pub fn last_run(&self) -> Option<DateTime<Utc>> {
        *self.last_run.lock().unwrap()
    }

    pub fn commits(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RunStateStore for MockRunStateStore {
    async fn last_successful_run(&self) -> DomainResult<Option<DateTime<Utc>>> {
        Ok(*self.last_run.lock().unwrap())
    }

    async fn record_successful_run(&self, started_at: DateTime<Utc>) -> DomainResult<()> {
        *self.last_run.lock().unwrap() = Some(started_at);
        self.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
