//! r2d2 pool helpers for SQLite
//!
//! Every pooled connection gets the same pragmas on open. Read-only pools are
//! used for the contact source and never change journal mode.

use std::path::Path;
use std::time::Duration;

use mailsync_domain::{MailsyncError, Result};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, OpenFlags};
use tracing::warn;

use crate::errors::InfraError;

pub type SqlitePool = Pool<SqliteConnectionManager>;

/// Pool sizing and per-connection settings.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub max_size: u32,
    pub connection_timeout: Duration,
    pub busy_timeout: Duration,
    pub read_only: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_size: 4,
            connection_timeout: Duration::from_secs(5),
            busy_timeout: Duration::from_secs(5),
            read_only: false,
        }
    }
}

/// Build a pool over the database file at `path`.
pub fn create_pool<P: AsRef<Path>>(path: P, config: &PoolConfig) -> Result<SqlitePool> {
    let path = path.as_ref();
    let mut manager = SqliteConnectionManager::file(path);
    if config.read_only {
        manager = manager.with_flags(OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_URI);
    }

    let pragma_config = config.clone();
    let manager = manager.with_init(move |conn| apply_connection_pragmas(conn, &pragma_config));

    Pool::builder()
        .max_size(config.max_size.max(1))
        .connection_timeout(config.connection_timeout)
        .build(manager)
        .map_err(|err| {
            warn!(db_path = %path.display(), error = %err, "Failed to create connection pool");
            MailsyncError::from(InfraError::from(err))
        })
}

fn apply_connection_pragmas(conn: &mut Connection, config: &PoolConfig) -> rusqlite::Result<()> {
    if !config.read_only {
        // WAL for concurrency
        conn.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA synchronous=NORMAL;
             PRAGMA foreign_keys=ON;",
        )?;
    }
    conn.busy_timeout(config.busy_timeout)
}
