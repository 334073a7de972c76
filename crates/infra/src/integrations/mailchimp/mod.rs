//! Mailchimp integration
//!
//! `MailchimpClient` implements the audience schema, batch, and member export
//! ports on top of the retrying [`HttpClient`](crate::http::HttpClient).
//!
//! # Error Handling
//!
//! - **Network errors and 5xx/429**: retried by `HttpClient`, then surfaced as
//!   transient domain errors
//! - **"already exists" on create**: `MailsyncError::Conflict`
//! - **401/403**: `MailsyncError::Auth`
//! - **Other 4xx**: `MailsyncError::InvalidInput` or `NotFound`
//! - **Slow calls**: transient `MailsyncError::Network` once the per-call
//!   deadline (all transport attempts plus backoff) expires

pub mod client;
pub mod errors;
mod types;

pub use client::MailchimpClient;
pub use errors::MailchimpError;
