//! Shared fixtures for application tests: a temp workspace with a SQLite
//! contact source, an integrations folder, and config pointing at a mock
//! Mailchimp server.

#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use mailsync_app::AppContext;
use mailsync_core::PollPolicy;
use mailsync_domain::AppConfig;
use tempfile::TempDir;
use wiremock::MockServer;

pub const API_KEY: &str = "test-key-us1";

pub const MEMBERS_SCHEMA: &str = r#"
CREATE TABLE members (
    email TEXT,
    subscription_status TEXT,
    first_name TEXT,
    "interestNewsletter$Weekly" INTEGER,
    updated_at DATETIME
);
INSERT INTO members VALUES ('Ada@Example.com', 'subscribed', 'Ada', 1, '2024-06-01 10:00:00');
INSERT INTO members VALUES ('grace@example.com', 'unsubscribed', 'Grace', 0, '2024-06-02 10:00:00');
INSERT INTO members VALUES (NULL, 'subscribed', 'Nobody', 0, '2024-06-03 10:00:00');
"#;

pub const MEMBERS_INTEGRATION: &str = r#"
name = "Members"
table = "members"
purge_stale_emails = true
since = ["updated_at"]

[audience_settings]
permission_reminder = "You signed up on our website"
email_type_option = false
"#;

/// Temporary directory holding every file a run touches.
pub struct Workspace {
    root: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        Self { root: TempDir::new().expect("temp dir created") }
    }

    pub fn source_path(&self) -> PathBuf {
        self.root.path().join("source.db")
    }

    pub fn cache_path(&self) -> PathBuf {
        self.root.path().join("cache.db")
    }

    pub fn integrations_dir(&self) -> PathBuf {
        self.root.path().join("integrations")
    }

    /// Run SQL against the contact source, creating it if needed.
    pub fn seed_source(&self, sql: &str) {
        let conn = rusqlite::Connection::open(self.source_path()).expect("source opened");
        conn.execute_batch(sql).expect("source seeded");
    }

    /// Write `<folder>/<folder>.toml` and return the folder.
    pub fn add_integration(&self, folder: &str, toml: &str) -> PathBuf {
        let dir = self.integrations_dir().join(folder);
        fs::create_dir_all(&dir).expect("integration dir created");
        fs::write(dir.join(format!("{folder}.toml")), toml).expect("integration written");
        dir
    }

    pub fn config(&self, server: &MockServer) -> AppConfig {
        AppConfig {
            api_key: API_KEY.to_string(),
            api_base_url: Some(format!("{}/3.0", server.uri())),
            export_base_url: Some(format!("{}/export/1.0", server.uri())),
            cache_db_path: self.cache_path(),
            source_db_path: self.source_path(),
            integrations_dir: self.integrations_dir(),
            poll_interval_secs: 1,
            max_poll_attempts: 3,
            request_timeout_secs: 5,
        }
    }

    pub fn context(&self, server: &MockServer) -> AppContext {
        AppContext::new(self.config(server)).expect("context created")
    }
}

impl Default for Workspace {
    fn default() -> Self {
        Self::new()
    }
}

pub fn fast_poll() -> PollPolicy {
    PollPolicy::new(Duration::from_millis(5), 3)
}
