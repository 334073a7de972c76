//! Batch job and export types

use serde::{Deserialize, Serialize};

use crate::impl_wire_status_conversions;

/// HTTP method of a single batch operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OperationMethod {
    Put,
    Delete,
}

/// One member-level operation inside a batch job.
///
/// `body` holds the JSON document as a string, which is how the remote batch
/// endpoint expects nested request bodies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchOperation {
    pub method: OperationMethod,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl BatchOperation {
    pub fn put(path: impl Into<String>, body: impl Into<String>) -> Self {
        Self { method: OperationMethod::Put, path: path.into(), body: Some(body.into()) }
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self { method: OperationMethod::Delete, path: path.into(), body: None }
    }
}

/// Lifecycle of a remote batch job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum BatchStatus {
    Pending,
    Running,
    Finished,
    Errored,
}

impl_wire_status_conversions!(BatchStatus {
    Pending => "pending",
    Running => "running" | "preprocessing" | "started" | "finalizing",
    Finished => "finished",
    Errored => "errored" | "failed",
});

impl TryFrom<String> for BatchStatus {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<BatchStatus> for String {
    fn from(status: BatchStatus) -> Self {
        status.to_string()
    }
}

impl BatchStatus {
    /// Whether polling can stop.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Finished | Self::Errored)
    }
}

/// Remote view of a submitted batch job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchJob {
    pub id: String,
    pub status: BatchStatus,
    #[serde(default)]
    pub total_operations: u64,
    #[serde(default)]
    pub finished_operations: u64,
    #[serde(default)]
    pub errored_operations: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_body_url: Option<String>,
}

/// Tabular member export: row 0 is the header, column 0 the member identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportTable {
    pub rows: Vec<Vec<Option<String>>>,
}

impl ExportTable {
    pub fn new(rows: Vec<Vec<Option<String>>>) -> Self {
        Self { rows }
    }

    /// Identities below the header, trimmed and lower-cased. Blank and null
    /// cells are dropped.
    pub fn identities(&self) -> impl Iterator<Item = String> + '_ {
        self.rows
            .iter()
            .skip(1)
            .filter_map(|row| row.first().and_then(Option::as_deref))
            .map(|cell| cell.trim().to_lowercase())
            .filter(|cell| !cell.is_empty())
    }
}

/// Summary of one completed push run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub integration: String,
    pub list_id: String,
    pub contacts: usize,
    pub upserts: usize,
    pub deletes: usize,
    /// Rows dropped for lacking an identity or status.
    pub skipped: usize,
    /// `None` when there was nothing to send and no batch was submitted.
    pub batch: Option<BatchJob>,
}

impl RunReport {
    pub fn errored_operations(&self) -> u64 {
        self.batch.as_ref().map_or(0, |job| job.errored_operations)
    }
}
