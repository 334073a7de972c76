//! Sequential execution of the configured integrations.
//!
//! A failing integration is logged and reported; the remaining integrations
//! still run.

use std::path::{Path, PathBuf};

use mailsync_core::PollPolicy;
use mailsync_domain::{MailsyncError, Result, RunReport};
use mailsync_infra::config::{discover_integrations, load_integration};
use chrono::Utc;
use mailsync_infra::{FileRunStateStore, RunLock};
use tracing::{error, info, info_span, warn, Instrument};

use crate::context::{AppContext, INTEGRATION_LOG_DIR};

/// Result of one integration run
#[derive(Debug)]
pub struct IntegrationOutcome {
    /// Integration folder name
    pub name: String,
    pub result: Result<RunReport>,
}

impl IntegrationOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Folder names of the integrations to run: every enabled folder, or only
/// those named in `only`.
///
/// # Errors
/// Returns `MailsyncError::NotFound` when a requested integration does not
/// exist, and propagates discovery failures.
pub fn select_integrations(root: &Path, only: &[String]) -> Result<Vec<PathBuf>> {
    let discovered = discover_integrations(root)?;
    if only.is_empty() {
        return Ok(discovered);
    }

    let mut selected = Vec::with_capacity(only.len());
    for name in only {
        let dir = discovered
            .iter()
            .find(|dir| folder_name(dir) == *name)
            .ok_or_else(|| {
                MailsyncError::NotFound(format!(
                    "integration '{name}' not found under {}",
                    root.display()
                ))
            })?;
        selected.push(dir.clone());
    }
    Ok(selected)
}

/// Run every selected integration in order.
///
/// # Errors
/// Only selection failures abort; per-integration errors are returned in the
/// outcomes.
pub async fn run_all(ctx: &AppContext, only: &[String]) -> Result<Vec<IntegrationOutcome>> {
    let dirs = select_integrations(&ctx.config.integrations_dir, only)?;
    if dirs.is_empty() {
        warn!(dir = %ctx.config.integrations_dir.display(), "No integrations found");
    }

    let mut outcomes = Vec::with_capacity(dirs.len());
    for dir in dirs {
        let name = folder_name(&dir);
        let span = info_span!("integration", name = %name);
        let result = run_integration(ctx, &dir, ctx.poll_policy()).instrument(span).await;

        match &result {
            Ok(report) => info!(
                integration = %name,
                list_id = %report.list_id,
                contacts = report.contacts,
                upserts = report.upserts,
                deletes = report.deletes,
                skipped = report.skipped,
                errored_operations = report.errored_operations(),
                "Integration finished"
            ),
            Err(e) => error!(
                integration = %name,
                kind = e.label(),
                transient = e.is_transient(),
                error = %e,
                "Integration failed"
            ),
        }
        outcomes.push(IntegrationOutcome { name, result });
    }
    Ok(outcomes)
}

/// Load, lock, and push one integration folder. A failed push also leaves
/// its details in the integration's `log/last_error.txt`.
///
/// # Errors
/// Returns `MailsyncError::Conflict` when another process holds the
/// integration's run lock, or any error raised by the push run.
pub async fn run_integration(
    ctx: &AppContext,
    dir: &Path,
    policy: PollPolicy,
) -> Result<RunReport> {
    let integration = load_integration(dir)?;
    let _lock = RunLock::acquire(dir.join(INTEGRATION_LOG_DIR))?;

    info!(list = %integration.name, table = %integration.table, "Starting push run");
    let result = ctx.sync_service_with_policy(integration, dir, policy).run().await;

    if let Err(e) = &result {
        let store = FileRunStateStore::new(dir.join(INTEGRATION_LOG_DIR));
        if let Err(write_err) = store.record_failure(Utc::now(), e).await {
            warn!(error = %write_err, "Could not record the failure details");
        }
    }
    result
}

fn folder_name(dir: &Path) -> String {
    dir.file_name().map(|name| name.to_string_lossy().into_owned()).unwrap_or_default()
}
