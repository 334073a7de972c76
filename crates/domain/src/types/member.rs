//! Remote member payload
//!
//! Maps are ordered so that the same row always serializes to the same bytes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Body of a member upsert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberPayload {
    pub email_address: String,
    pub status: String,
    pub status_if_new: String,
    pub merge_fields: BTreeMap<String, serde_json::Value>,
    pub interests: BTreeMap<String, bool>,
}

impl MemberPayload {
    /// New payload with the same status for existing and new members.
    pub fn new(email_address: impl Into<String>, status: impl Into<String>) -> Self {
        let status = status.into();
        Self {
            email_address: email_address.into(),
            status_if_new: status.clone(),
            status,
            merge_fields: BTreeMap::new(),
            interests: BTreeMap::new(),
        }
    }
}
