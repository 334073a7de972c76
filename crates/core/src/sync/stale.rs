//! Stale member calculation

use std::collections::HashSet;
use std::sync::Arc;

use mailsync_domain::{normalize_email, ExportTable, Result};
use tracing::info;

use super::ports::MemberExportApi;

/// Exported identities absent from `active`, in export order without
/// duplicates.
pub fn stale_emails<I, S>(export: &ExportTable, active: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let active: HashSet<String> =
        active.into_iter().map(|email| normalize_email(email.as_ref())).collect();
    let mut seen = HashSet::new();

    export
        .identities()
        .filter(|email| !active.contains(email))
        .filter(|email| seen.insert(email.clone()))
        .collect()
}

/// Diffs the full remote export of a list against the local active set.
pub struct StaleSetCalculator {
    export: Arc<dyn MemberExportApi>,
}

impl StaleSetCalculator {
    pub fn new(export: Arc<dyn MemberExportApi>) -> Self {
        Self { export }
    }

    pub async fn stale_emails<I, S>(&self, list_id: &str, active: I) -> Result<Vec<String>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let table = self.export.export_members(list_id).await?;
        let stale = stale_emails(&table, active);
        info!(
            exported = table.rows.len().saturating_sub(1),
            stale = stale.len(),
            "Computed stale members"
        );
        Ok(stale)
    }
}
