//! Database connection manager backed by an r2d2 SQLite pool.

use std::path::{Path, PathBuf};

use mailsync_domain::{MailsyncError, Result};
use r2d2::PooledConnection;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;
use tracing::info;

use super::pool::{create_pool, PoolConfig, SqlitePool};
use crate::errors::InfraError;

const SCHEMA_VERSION: i32 = 1;
const SCHEMA_SQL: &str = include_str!("schema.sql");

pub type SqliteConnection = PooledConnection<SqliteConnectionManager>;

/// Database manager that wraps an [`SqlitePool`].
pub struct DbManager {
    pool: SqlitePool,
    path: PathBuf,
}

impl DbManager {
    /// Open (or create) a read-write database with the given pool size.
    pub fn new<P: AsRef<Path>>(db_path: P, pool_size: u32) -> Result<Self> {
        let config = PoolConfig { max_size: pool_size.max(1), ..PoolConfig::default() };
        Self::with_config(db_path, &config)
    }

    /// Open an existing database without write access.
    pub fn read_only<P: AsRef<Path>>(db_path: P, pool_size: u32) -> Result<Self> {
        let path = db_path.as_ref();
        if !path.exists() {
            return Err(MailsyncError::Config(format!(
                "source database not found: {}",
                path.display()
            )));
        }
        let config =
            PoolConfig { max_size: pool_size.max(1), read_only: true, ..PoolConfig::default() };
        Self::with_config(path, &config)
    }

    fn with_config<P: AsRef<Path>>(db_path: P, config: &PoolConfig) -> Result<Self> {
        let path = db_path.as_ref().to_path_buf();
        let pool = create_pool(&path, config)?;

        info!(
            db_path = %path.display(),
            max_connections = pool.max_size(),
            read_only = config.read_only,
            "sqlite pool initialised"
        );

        Ok(Self { pool, path })
    }

    /// Acquire a connection from the pool.
    pub fn get_connection(&self) -> Result<SqliteConnection> {
        self.pool.get().map_err(|err| MailsyncError::from(InfraError::from(err)))
    }

    /// Ensure the cache schema exists on the current database.
    pub fn run_migrations(&self) -> Result<()> {
        let conn = self.get_connection()?;
        create_schema(&conn)?;
        Ok(())
    }

    /// Return the configured database path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Verify the database is reachable and answering queries.
    pub fn health_check(&self) -> Result<()> {
        let conn = self.get_connection()?;
        conn.query_row("SELECT 1", params![], |row| row.get::<_, i32>(0)).map_err(map_sql_error)?;
        Ok(())
    }
}

fn create_schema(conn: &SqliteConnection) -> Result<()> {
    conn.execute_batch(SCHEMA_SQL).map_err(map_sql_error)?;
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (?1, CAST(strftime('%s','now') AS INTEGER))",
        params![SCHEMA_VERSION],
    )
    .map_err(map_sql_error)?;
    Ok(())
}

pub(crate) fn map_sql_error(err: rusqlite::Error) -> MailsyncError {
    MailsyncError::from(InfraError::from(err))
}

pub(crate) fn map_join_error(err: tokio::task::JoinError) -> MailsyncError {
    MailsyncError::Internal(format!("blocking database task failed: {err}"))
}
