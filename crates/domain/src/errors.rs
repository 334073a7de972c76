//! Error types used throughout the application

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for Mailsync
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum MailsyncError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The remote service refused a create because the object already exists.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The remote service failed in a way that may succeed on a later attempt
    /// (5xx, rate limiting).
    #[error("Remote service error: {0}")]
    Remote(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse classification used for retry and reporting decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Operator must fix settings before the next run
    Config,
    /// Credentials rejected by the remote service
    Authentication,
    /// Connection-level failure
    Network,
    /// Remote service reported a retryable failure
    Remote,
    /// Expected create race, recovered locally
    Conflict,
    /// Request was malformed or referenced something missing
    Client,
    /// Local storage failure
    Database,
    /// A bounded wait ran out
    Timeout,
    /// Programming or ordering invariant violated
    Internal,
}

impl MailsyncError {
    /// Get the error category for this error
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Config(_) => ErrorCategory::Config,
            Self::Auth(_) => ErrorCategory::Authentication,
            Self::Network(_) => ErrorCategory::Network,
            Self::Remote(_) => ErrorCategory::Remote,
            Self::Conflict(_) => ErrorCategory::Conflict,
            Self::NotFound(_) | Self::InvalidInput(_) => ErrorCategory::Client,
            Self::Database(_) => ErrorCategory::Database,
            Self::Timeout(_) => ErrorCategory::Timeout,
            Self::Internal(_) => ErrorCategory::Internal,
        }
    }

    /// Whether repeating the same call later may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self.category(), ErrorCategory::Network | ErrorCategory::Remote)
    }

    /// Stable label for structured logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Database(_) => "database",
            Self::Config(_) => "config",
            Self::Network(_) => "network",
            Self::Auth(_) => "auth",
            Self::NotFound(_) => "not_found",
            Self::InvalidInput(_) => "invalid_input",
            Self::Conflict(_) => "conflict",
            Self::Remote(_) => "remote",
            Self::Timeout(_) => "timeout",
            Self::Internal(_) => "internal",
        }
    }
}

/// Result type alias for Mailsync operations
pub type Result<T> = std::result::Result<T, MailsyncError>;
