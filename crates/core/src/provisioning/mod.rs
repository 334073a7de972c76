//! Remote schema provisioning
//!
//! Resolves the remote list, interest categories, interests, and merge
//! fields an integration needs, creating whatever is missing.

pub mod create_or_find;
pub mod ports;
pub mod service;

pub use create_or_find::{create_or_find, find_or_create, Resolution};
pub use service::SchemaProvisioner;
