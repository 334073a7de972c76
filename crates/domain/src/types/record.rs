//! Local contact rows
//!
//! A `ContactRecord` is one row of the relational source with its columns in
//! declaration order. Records live only for the duration of one run.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// A typed scalar read from the relational source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ColumnValue {
    Null,
    Text(String),
    Integer(i64),
    Real(f64),
    Timestamp(DateTime<Utc>),
    Bit(bool),
}

impl ColumnValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// String form used for identity and status columns.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Self::Null => None,
            Self::Text(s) => Some(s.clone()),
            Self::Integer(i) => Some(i.to_string()),
            Self::Real(r) => Some(r.to_string()),
            Self::Timestamp(ts) => Some(ts.to_rfc3339_opts(SecondsFormat::Secs, true)),
            Self::Bit(b) => Some(b.to_string()),
        }
    }

    /// Interest-flag truthiness: only a set bit, the integer 1, or the text
    /// "1"/"true" count as subscribed.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Bit(b) => *b,
            Self::Integer(i) => *i == 1,
            Self::Text(s) => {
                let s = s.trim();
                s == "1" || s.eq_ignore_ascii_case("true")
            }
            Self::Null | Self::Real(_) | Self::Timestamp(_) => false,
        }
    }

    /// JSON value written into a member's merge fields.
    ///
    /// Timestamps are serialized as UTC ISO-8601. Returns `None` for nulls,
    /// which are left out of the payload.
    pub fn to_merge_value(&self) -> Option<serde_json::Value> {
        match self {
            Self::Null => None,
            Self::Text(s) => Some(serde_json::Value::String(s.clone())),
            Self::Integer(i) => Some(serde_json::Value::from(*i)),
            Self::Real(r) => Some(
                serde_json::Number::from_f64(*r)
                    .map(serde_json::Value::Number)
                    .unwrap_or_else(|| serde_json::Value::String(r.to_string())),
            ),
            Self::Timestamp(ts) => {
                Some(serde_json::Value::String(ts.to_rfc3339_opts(SecondsFormat::Secs, true)))
            }
            Self::Bit(b) => Some(serde_json::Value::Bool(*b)),
        }
    }

    /// Timestamp view used by incremental filtering.
    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }
}

/// Name and declared SQL type of a source column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    pub declared_type: String,
}

impl ColumnInfo {
    pub fn new(name: impl Into<String>, declared_type: impl Into<String>) -> Self {
        Self { name: name.into(), declared_type: declared_type.into() }
    }
}

/// One row of the relational source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContactRecord {
    columns: Vec<(String, ColumnValue)>,
}

impl ContactRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, keeping column order.
    #[must_use]
    pub fn with(mut self, column: impl Into<String>, value: ColumnValue) -> Self {
        self.insert(column, value);
        self
    }

    /// Set a column, replacing any earlier value of the same name.
    pub fn insert(&mut self, column: impl Into<String>, value: ColumnValue) {
        let column = column.into();
        match self.columns.iter_mut().find(|(name, _)| *name == column) {
            Some((_, existing)) => *existing = value,
            None => self.columns.push((column, value)),
        }
    }

    pub fn get(&self, column: &str) -> Option<&ColumnValue> {
        self.columns.iter().find(|(name, _)| name == column).map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ColumnValue)> {
        self.columns.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}
