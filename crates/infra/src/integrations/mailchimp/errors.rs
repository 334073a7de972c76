//! Mailchimp problem responses and their mapping onto domain errors
//!
//! The marketing API reports failures as RFC 7807 problem documents. A create
//! that collides with an existing object comes back as a 400 whose detail says
//! the object "already exists"; that case becomes `MailsyncError::Conflict` so
//! the provisioner can fall back to a lookup.

use mailsync_domain::MailsyncError;
use serde::Deserialize;
use thiserror::Error;

/// Error code the legacy export API uses for a rejected key.
const EXPORT_INVALID_KEY_CODE: i64 = 104;

/// Problem document returned with non-success statuses.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ProblemDetail {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub detail: String,
}

/// A failed Mailchimp call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MailchimpError {
    /// Marketing API returned a non-success status
    #[error("{title} (status {status}): {detail}")]
    Api { status: u16, title: String, detail: String },

    /// Export API returned an error object instead of rows
    #[error("export failed (code {code}): {message}")]
    Export { code: i64, message: String },

    /// Response body did not have the expected shape
    #[error("unexpected response body: {0}")]
    InvalidBody(String),
}

impl MailchimpError {
    /// Build from a status and raw body. Bodies that are not problem
    /// documents are kept verbatim as the detail.
    pub fn from_response(status: u16, body: &str) -> Self {
        let problem = serde_json::from_str::<ProblemDetail>(body).unwrap_or_else(|_| {
            ProblemDetail { title: "Unexpected response".into(), detail: body.trim().to_string() }
        });
        Self::Api { status, title: problem.title, detail: problem.detail }
    }

    /// Whether the remote refused a create because the object exists.
    pub fn is_already_exists(&self) -> bool {
        match self {
            Self::Api { status: 400, title, detail } => {
                let text = format!("{title} {detail}").to_lowercase();
                text.contains("already exist") || text.contains("member exists")
            }
            _ => false,
        }
    }
}

impl From<MailchimpError> for MailsyncError {
    fn from(err: MailchimpError) -> Self {
        let message = err.to_string();
        match &err {
            _ if err.is_already_exists() => MailsyncError::Conflict(message),
            MailchimpError::Api { status, .. } => match status {
                401 | 403 => MailsyncError::Auth(message),
                404 => MailsyncError::NotFound(message),
                429 | 500..=599 => MailsyncError::Remote(message),
                400..=499 => MailsyncError::InvalidInput(message),
                _ => MailsyncError::Remote(message),
            },
            MailchimpError::Export { code: EXPORT_INVALID_KEY_CODE, .. } => {
                MailsyncError::Auth(message)
            }
            MailchimpError::Export { .. } => MailsyncError::InvalidInput(message),
            MailchimpError::InvalidBody(_) => MailsyncError::Remote(message),
        }
    }
}
