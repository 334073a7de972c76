//! Port interfaces for sync operations

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mailsync_domain::{
    BatchJob, BatchOperation, ColumnInfo, ContactRecord, ExportTable, Result, RowFilter,
};

/// Remote batch job endpoint
#[async_trait]
pub trait BatchApi: Send + Sync {
    /// Submit all operations as one job
    async fn submit_batch(&self, operations: &[BatchOperation]) -> Result<BatchJob>;

    /// Current state of a submitted job
    async fn get_batch(&self, batch_id: &str) -> Result<BatchJob>;
}

/// Bulk member export
#[async_trait]
pub trait MemberExportApi: Send + Sync {
    /// Full member dump of a list; row 0 is a header, column 0 the identity
    async fn export_members(&self, list_id: &str) -> Result<ExportTable>;
}

/// Relational source of contact rows
#[async_trait]
pub trait ContactSource: Send + Sync {
    /// Columns of a table or view with their declared types
    async fn list_columns(&self, table: &str) -> Result<Vec<ColumnInfo>>;

    /// Rows passing `filter`, in a stable order
    async fn query_rows(&self, table: &str, filter: &RowFilter) -> Result<Vec<ContactRecord>>;
}

/// Persisted marker of the last successful run
#[async_trait]
pub trait RunStateStore: Send + Sync {
    /// `None` when no run has completed yet
    async fn last_successful_run(&self) -> Result<Option<DateTime<Utc>>>;

    async fn record_successful_run(&self, started_at: DateTime<Utc>) -> Result<()>;
}
