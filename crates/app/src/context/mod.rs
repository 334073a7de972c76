//! Application context - dependency injection container

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use mailsync_core::{PollPolicy, PushSyncService, SyncPorts};
use mailsync_domain::{AppConfig, IntegrationConfig, Result};
use mailsync_infra::{
    DbManager, FileRunStateStore, MailchimpClient, SqliteContactSource, SqliteIdentifierCache,
};
use tracing::info;

const CACHE_POOL_SIZE: u32 = 2;
const SOURCE_POOL_SIZE: u32 = 4;

/// Sub-directory of an integration folder holding its run marker and lock
pub const INTEGRATION_LOG_DIR: &str = "log";

/// Shared services for every integration in one process run
pub struct AppContext {
    pub config: AppConfig,
    pub cache_db: Arc<DbManager>,
    pub source_db: Arc<DbManager>,
    pub mailchimp: Arc<MailchimpClient>,
}

impl AppContext {
    /// Validate the configuration and open both databases and the API client.
    ///
    /// # Errors
    /// Fails on invalid configuration, a missing source database, or a cache
    /// database that cannot be migrated.
    pub fn new(config: AppConfig) -> Result<Self> {
        config.validate()?;

        let cache_db = DbManager::new(&config.cache_db_path, CACHE_POOL_SIZE)?;
        cache_db.run_migrations()?;

        let source_db = DbManager::read_only(&config.source_db_path, SOURCE_POOL_SIZE)?;
        source_db.health_check()?;

        let mailchimp = MailchimpClient::from_config(&config)?;

        info!(
            cache_db = %config.cache_db_path.display(),
            source_db = %config.source_db_path.display(),
            "Application context ready"
        );

        Ok(Self {
            config,
            cache_db: Arc::new(cache_db),
            source_db: Arc::new(source_db),
            mailchimp: Arc::new(mailchimp),
        })
    }

    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy::new(
            Duration::from_secs(self.config.poll_interval_secs),
            self.config.max_poll_attempts,
        )
    }

    /// Wire a push service for one integration whose folder is `dir`.
    pub fn sync_service(&self, integration: IntegrationConfig, dir: &Path) -> PushSyncService {
        self.sync_service_with_policy(integration, dir, self.poll_policy())
    }

    pub fn sync_service_with_policy(
        &self,
        integration: IntegrationConfig,
        dir: &Path,
        policy: PollPolicy,
    ) -> PushSyncService {
        let ports = SyncPorts {
            audience: self.mailchimp.clone(),
            batches: self.mailchimp.clone(),
            export: self.mailchimp.clone(),
            cache: Arc::new(SqliteIdentifierCache::new(Arc::clone(&self.cache_db))),
            source: Arc::new(SqliteContactSource::new(Arc::clone(&self.source_db))),
            run_state: Arc::new(FileRunStateStore::new(dir.join(INTEGRATION_LOG_DIR))),
        };
        PushSyncService::new(integration, ports).with_poll_policy(policy)
    }
}
