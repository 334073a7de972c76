//! Remote schema references
//!
//! Identifiers of remote lists, interest categories, and interests as cached
//! locally, plus the transient merge-field descriptors fetched every run.

use serde::{Deserialize, Serialize};

use crate::constants::DATE_FIELD_FORMAT;

/// A remote audience list, cached by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListRef {
    pub name: String,
    pub remote_id: String,
}

/// A remote interest category, unique per (list, title).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRef {
    pub remote_id: String,
    pub title: String,
    pub list_remote_id: String,
}

/// A remote interest, unique per (category, name).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterestRef {
    pub remote_id: String,
    pub name: String,
    pub category_remote_id: String,
}

/// Remote merge-field type.
///
/// Only the types this service creates or reads are named; anything else the
/// remote reports (phone, birthday, ...) is kept as `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Date,
    Address,
    Number,
    #[serde(other)]
    Other,
}

/// A merge field as reported by the remote service. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteField {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merge_id: Option<u32>,
    pub name: String,
    pub tag: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
}

/// Display options sent with a new merge field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldOptions {
    pub date_format: String,
}

/// Request body for creating a merge field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMergeField {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<FieldOptions>,
}

impl NewMergeField {
    /// Free-text field; the remote assigns the tag.
    pub fn text(name: impl Into<String>) -> Self {
        Self { name: name.into(), field_type: FieldType::Text, tag: None, options: None }
    }

    /// Date field displayed day/month/year.
    pub fn date(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_type: FieldType::Date,
            tag: None,
            options: Some(FieldOptions { date_format: DATE_FIELD_FORMAT.to_string() }),
        }
    }

    /// Structured address field with a fixed tag.
    pub fn address(name: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_type: FieldType::Address,
            tag: Some(tag.into()),
            options: None,
        }
    }

    /// Pick the remote type from a local column's declared SQL type.
    pub fn for_declared_type(name: impl Into<String>, declared_type: &str) -> Self {
        if is_datetime_type(declared_type) {
            Self::date(name)
        } else {
            Self::text(name)
        }
    }
}

/// Whether a declared column type holds timestamps.
pub fn is_datetime_type(declared_type: &str) -> bool {
    let lower = declared_type.trim().to_ascii_lowercase();
    lower.starts_with("datetime") || lower.starts_with("timestamp")
}
