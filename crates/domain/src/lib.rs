//! # Mailsync Domain
//!
//! Business domain types for the push sync engine.
//!
//! This crate contains:
//! - Configuration value objects and row filters
//! - Remote schema references, contact records, member payloads, batch jobs
//! - Domain error types and Result definitions
//! - Pure helpers for field naming and member identity hashing
//!
//! ## Architecture
//! - No dependencies on other Mailsync crates
//! - No I/O

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;
pub mod utils;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
pub use utils::identity::{member_hash, member_path, normalize_email};
pub use utils::title::titleize;
