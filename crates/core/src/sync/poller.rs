//! Bounded batch-completion polling

use std::sync::Arc;
use std::time::Duration;

use mailsync_domain::constants::{DEFAULT_MAX_POLL_ATTEMPTS, DEFAULT_POLL_INTERVAL_SECS};
use mailsync_domain::{BatchJob, BatchStatus, MailsyncError, Result};
use tracing::{debug, error, info, instrument};

use super::ports::BatchApi;

/// How often and how long to poll a batch job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            max_attempts: DEFAULT_MAX_POLL_ATTEMPTS,
        }
    }
}

impl PollPolicy {
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self { interval, max_attempts }
    }
}

/// Polls one batch job until it finishes.
///
/// Transient errors are logged and polling continues. Any other error ends
/// the wait. Running out of attempts yields `MailsyncError::Timeout`.
pub struct BatchPoller {
    api: Arc<dyn BatchApi>,
    policy: PollPolicy,
}

impl BatchPoller {
    pub fn new(api: Arc<dyn BatchApi>, policy: PollPolicy) -> Self {
        Self { api, policy }
    }

    #[instrument(skip(self))]
    pub async fn wait_for(&self, batch_id: &str) -> Result<BatchJob> {
        for attempt in 1..=self.policy.max_attempts {
            match self.api.get_batch(batch_id).await {
                Ok(job) if job.status == BatchStatus::Finished => {
                    info!(attempt, "Batch finished");
                    return Ok(job);
                }
                Ok(job) if job.status == BatchStatus::Errored => {
                    return Err(MailsyncError::Remote(format!(
                        "batch {batch_id} errored after {} of {} operations",
                        job.finished_operations, job.total_operations
                    )));
                }
                Ok(job) => {
                    debug!(
                        attempt,
                        status = %job.status,
                        finished = job.finished_operations,
                        total = job.total_operations,
                        "Batch still running"
                    );
                }
                Err(err) if err.is_transient() => {
                    error!(
                        attempt,
                        category = ?err.category(),
                        error = ?err,
                        "Transient error polling batch, will retry"
                    );
                }
                Err(err) => return Err(err),
            }

            if attempt < self.policy.max_attempts {
                tokio::time::sleep(self.policy.interval).await;
            }
        }

        Err(MailsyncError::Timeout(format!(
            "batch {batch_id} not finished after {} polls at {:?} intervals",
            self.policy.max_attempts, self.policy.interval
        )))
    }
}
