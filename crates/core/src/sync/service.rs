//! Push sync service - orchestrates one integration run

use std::sync::Arc;

use chrono::{DateTime, Utc};
use mailsync_domain::{
    member_path, BatchOperation, ContactRecord, IntegrationConfig, ListRef, MailsyncError, Result,
    RowFilter, RunReport,
};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use super::poller::{BatchPoller, PollPolicy};
use super::ports::{BatchApi, ContactSource, MemberExportApi, RunStateStore};
use super::stale::StaleSetCalculator;
use super::transformer::MemberTransformer;
use crate::classification::FieldPlan;
use crate::provisioning::ports::{AudienceSchemaApi, IdentifierCache};
use crate::provisioning::SchemaProvisioner;

/// Adapters a push run talks to.
#[derive(Clone)]
pub struct SyncPorts {
    pub audience: Arc<dyn AudienceSchemaApi>,
    pub batches: Arc<dyn BatchApi>,
    pub export: Arc<dyn MemberExportApi>,
    pub cache: Arc<dyn IdentifierCache>,
    pub source: Arc<dyn ContactSource>,
    pub run_state: Arc<dyn RunStateStore>,
}

/// Runs one push integration end to end.
///
/// Order is strict: list and interests, rows, merge fields, transformation,
/// stale set, batch submission, polling. The run's start time is recorded as
/// the last successful run only when every step succeeds, so a failed run is
/// re-processed in full next time.
pub struct PushSyncService {
    config: IntegrationConfig,
    provisioner: SchemaProvisioner,
    source: Arc<dyn ContactSource>,
    run_state: Arc<dyn RunStateStore>,
    stale: StaleSetCalculator,
    batches: Arc<dyn BatchApi>,
    poller: BatchPoller,
}

impl PushSyncService {
    pub fn new(config: IntegrationConfig, ports: SyncPorts) -> Self {
        Self {
            provisioner: SchemaProvisioner::new(ports.audience, ports.cache),
            source: ports.source,
            run_state: ports.run_state,
            stale: StaleSetCalculator::new(ports.export),
            poller: BatchPoller::new(ports.batches.clone(), PollPolicy::default()),
            batches: ports.batches,
            config,
        }
    }

    /// Override the batch polling cadence and bound
    pub fn with_poll_policy(mut self, policy: PollPolicy) -> Self {
        self.poller = BatchPoller::new(self.batches.clone(), policy);
        self
    }

    pub fn config(&self) -> &IntegrationConfig {
        &self.config
    }

    /// Execute the run and commit the run marker on success.
    #[instrument(
        name = "push_run",
        skip(self),
        fields(integration = %self.config.name, run_id = %Uuid::new_v4())
    )]
    pub async fn run(&self) -> Result<RunReport> {
        let started_at = Utc::now();
        info!(%started_at, "Run commencement (all times in UTC)");

        match self.execute().await {
            Ok(report) => {
                self.run_state.record_successful_run(started_at).await?;
                info!(
                    contacts = report.contacts,
                    upserts = report.upserts,
                    deletes = report.deletes,
                    skipped = report.skipped,
                    "Finished, run saved as complete"
                );
                Ok(report)
            }
            Err(err) => {
                error!(
                    category = ?err.category(),
                    error = %err,
                    "Run failed, last-run marker not advanced"
                );
                Err(err)
            }
        }
    }

    async fn execute(&self) -> Result<RunReport> {
        let config = &self.config;
        config.validate()?;

        let columns = self.source.list_columns(&config.table).await?;
        let plan = FieldPlan::build(config, &columns)?;

        info!("Syncing list");
        let list = self.provisioner.resolve_list(&config.name, &config.audience_settings).await?;
        info!("Syncing interests");
        let interests = self.provisioner.resolve_interests(&list, &plan).await?;

        let last_run =
            self.run_state.last_successful_run().await?.unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
        let filter = config.constraints(last_run);
        info!(%last_run, "Fetching contacts to be synced");
        let contacts = self.source.query_rows(&config.table, &filter).await?;
        info!(count = contacts.len(), "Found contacts to be synced");

        let mut operations = Vec::with_capacity(contacts.len());
        let mut skipped = 0;
        if !contacts.is_empty() {
            info!("Checking for new fields");
            let remote_fields = self.provisioner.provision_fields(&list, &plan).await?;
            let transform_plan = plan.resolve(&remote_fields, &interests)?;
            let transformer = MemberTransformer::new(list.remote_id.clone(), transform_plan);

            for contact in &contacts {
                match transformer.upsert_operation(contact) {
                    Ok(operation) => operations.push(operation),
                    Err(MailsyncError::InvalidInput(reason)) => {
                        warn!(%reason, "Skipping row");
                        skipped += 1;
                    }
                    Err(err) => return Err(err),
                }
            }
        }
        let upserts = operations.len();
        info!(upserts, "PUT operations composed");

        let mut deletes = 0;
        if config.purge_stale_emails {
            let stale = self.stale_members(&list, &filter, &contacts).await?;
            deletes = stale.len();
            operations.extend(
                stale.iter().map(|email| BatchOperation::delete(member_path(&list.remote_id, email))),
            );
            info!(deletes, "DELETE operations composed");
        }

        let batch = if operations.is_empty() {
            info!("Nothing to send, skipping batch submission");
            None
        } else {
            let submitted = self.batches.submit_batch(&operations).await?;
            info!(batch_id = %submitted.id, operations = operations.len(), "Batch starting");
            let finished = self.poller.wait_for(&submitted.id).await?;
            info!(
                batch_id = %finished.id,
                errors = finished.errored_operations,
                total = finished.total_operations,
                response_body_url = finished.response_body_url.as_deref().unwrap_or(""),
                "Batch finished"
            );
            Some(finished)
        };

        Ok(RunReport {
            integration: config.name.clone(),
            list_id: list.remote_id,
            contacts: contacts.len(),
            upserts,
            deletes,
            skipped,
            batch,
        })
    }

    /// Remote members missing from the full local active set.
    ///
    /// An incremental fetch only holds changed rows, so the active set is
    /// re-read without the filter in that case.
    async fn stale_members(
        &self,
        list: &ListRef,
        filter: &RowFilter,
        contacts: &[ContactRecord],
    ) -> Result<Vec<String>> {
        let identity_column = &self.config.identity_column;
        let identities = |rows: &[ContactRecord]| -> Vec<String> {
            rows.iter()
                .filter_map(|row| row.get(identity_column).and_then(|v| v.as_text()))
                .collect()
        };

        let active = match filter {
            RowFilter::All => identities(contacts),
            RowFilter::AnySinceAfter { .. } => {
                let all = self.source.query_rows(&self.config.table, &RowFilter::All).await?;
                identities(&all)
            }
        };

        self.stale.stale_emails(&list.remote_id, active).await
    }
}
