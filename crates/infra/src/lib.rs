//! # Mailsync Infrastructure
//!
//! Infrastructure implementations of the core sync ports.
//!
//! This crate contains:
//! - SQLite identifier cache and read-only contact source
//! - Mailchimp Marketing and Export API client
//! - Configuration loading and integration discovery
//! - Run marker, run lock, and logging setup
//!
//! ## Architecture
//! - Implements traits defined in `mailsync-core`
//! - Contains all "impure" code (file system, SQLite, HTTP)

pub mod config;
pub mod database;
pub mod errors;
pub mod http;
pub mod integrations;
pub mod observability;
pub mod run_lock;
pub mod run_state;

// Re-export commonly used items
pub use database::{DbManager, SqliteContactSource, SqliteIdentifierCache};
pub use errors::InfraError;
pub use http::HttpClient;
pub use integrations::mailchimp::{MailchimpClient, MailchimpError};
pub use run_lock::RunLock;
pub use run_state::FileRunStateStore;
