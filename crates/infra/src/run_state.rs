//! File-backed run marker
//!
//! `<log_dir>/last_run.txt` holds the start time of the last successful run
//! as naive UTC (`%Y-%m-%dT%H:%M:%S`). The file is replaced atomically so a
//! crash mid-write never leaves a truncated marker.
//!
//! `<log_dir>/last_error.txt` holds the time, kind, and message of the most
//! recent failed run. It never affects the marker.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use mailsync_core::RunStateStore;
use mailsync_domain::constants::RUN_TIMESTAMP_FORMAT;
use mailsync_domain::{MailsyncError, Result};
use tracing::{debug, info};

use crate::errors::InfraError;

const MARKER_FILE_NAME: &str = "last_run.txt";
const ERROR_FILE_NAME: &str = "last_error.txt";

/// Run marker stored as a text file in an integration's log directory
pub struct FileRunStateStore {
    path: PathBuf,
}

impl FileRunStateStore {
    pub fn new<P: AsRef<Path>>(log_dir: P) -> Self {
        Self { path: log_dir.as_ref().join(MARKER_FILE_NAME) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn error_path(&self) -> PathBuf {
        self.path.with_file_name(ERROR_FILE_NAME)
    }

    /// Overwrite `last_error.txt` with the details of a failed run.
    pub async fn record_failure(
        &self,
        failed_at: DateTime<Utc>,
        error: &MailsyncError,
    ) -> Result<()> {
        let path = self.error_path();
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir).await.map_err(InfraError::from)?;
        }

        let details = format!(
            "{}\n{}: {error}\n",
            failed_at.format(RUN_TIMESTAMP_FORMAT),
            error.label()
        );
        tokio::fs::write(&path, details).await.map_err(InfraError::from)?;

        debug!(path = %path.display(), "Recorded failed run");
        Ok(())
    }
}

#[async_trait]
impl RunStateStore for FileRunStateStore {
    async fn last_successful_run(&self) -> Result<Option<DateTime<Utc>>> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No run marker, treating as first run");
                return Ok(None);
            }
            Err(err) => return Err(InfraError::from(err).into()),
        };

        let trimmed = contents.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }
        parse_marker(trimmed).map(Some).ok_or_else(|| {
            MailsyncError::Config(format!(
                "run marker {} holds '{trimmed}', expected {RUN_TIMESTAMP_FORMAT}",
                self.path.display()
            ))
        })
    }

    async fn record_successful_run(&self, started_at: DateTime<Utc>) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            tokio::fs::create_dir_all(dir).await.map_err(InfraError::from)?;
        }

        let marker = started_at.format(RUN_TIMESTAMP_FORMAT).to_string();
        let staging = self.path.with_extension("txt.tmp");
        tokio::fs::write(&staging, &marker).await.map_err(InfraError::from)?;
        tokio::fs::rename(&staging, &self.path).await.map_err(InfraError::from)?;

        info!(path = %self.path.display(), %marker, "Recorded successful run");
        Ok(())
    }
}

fn parse_marker(text: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(text, RUN_TIMESTAMP_FORMAT)
        .map(|naive| naive.and_utc())
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(text).ok().map(|ts| ts.with_timezone(&Utc)))
}
