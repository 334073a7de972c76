//! Application constants
//!
//! Centralized location for all domain-level constants used throughout the
//! application.

// Column naming conventions
pub const DEFAULT_IDENTITY_COLUMN: &str = "email";
pub const DEFAULT_STATUS_COLUMN: &str = "subscription_status";
pub const INTEREST_COLUMN_PREFIX: &str = "interest";
pub const INTEREST_DELIMITER: char = '$';

// Remote address merge field
pub const ADDRESS_FIELD_NAME: &str = "Address";
pub const ADDRESS_FIELD_TAG: &str = "ADDRESS";

// Remote field creation
pub const DATE_FIELD_FORMAT: &str = "dd/mm/yyyy";
pub const INTEREST_CATEGORY_TYPE: &str = "hidden";

// Words the title-caser always keeps upper-case
pub const DEFAULT_ACRONYMS: &[&str] = &["ID", "IDs", "HSR", "HSRs"];

// Batch polling
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;
pub const DEFAULT_MAX_POLL_ATTEMPTS: u32 = 360;

// Remote collection paging
pub const REMOTE_PAGE_SIZE: u32 = 1000;

// Run-state timestamp format (UTC)
pub const RUN_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
