//! Configuration value objects
//!
//! `AppConfig` holds process-wide settings (credentials, endpoints, paths).
//! `IntegrationConfig` describes one push integration: which table feeds which
//! remote list, and how columns map onto remote fields. Both are loaded once
//! per run and passed explicitly into the components that need them.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_ACRONYMS, DEFAULT_IDENTITY_COLUMN, DEFAULT_MAX_POLL_ATTEMPTS,
    DEFAULT_POLL_INTERVAL_SECS, DEFAULT_STATUS_COLUMN, INTEREST_COLUMN_PREFIX,
};
use crate::types::ContactRecord;
use crate::utils::title::titleize;
use crate::{MailsyncError, Result};

/// Application-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    pub api_key: String,
    /// Defaults to the data center encoded in the API key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export_base_url: Option<String>,
    #[serde(default = "default_cache_db_path")]
    pub cache_db_path: PathBuf,
    pub source_db_path: PathBuf,
    #[serde(default = "default_integrations_dir")]
    pub integrations_dir: PathBuf,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_max_poll_attempts")]
    pub max_poll_attempts: u32,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_cache_db_path() -> PathBuf {
    PathBuf::from("mailsync.db")
}

fn default_integrations_dir() -> PathBuf {
    PathBuf::from("integrations")
}

fn default_poll_interval_secs() -> u64 {
    DEFAULT_POLL_INTERVAL_SECS
}

fn default_max_poll_attempts() -> u32 {
    DEFAULT_MAX_POLL_ATTEMPTS
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl AppConfig {
    /// Data-center suffix of the API key (`<key>-us6` => `us6`).
    ///
    /// # Errors
    /// Returns `MailsyncError::Config` when the key carries no suffix.
    pub fn data_center(&self) -> Result<&str> {
        self.api_key
            .rsplit_once('-')
            .map(|(_, dc)| dc.trim())
            .filter(|dc| !dc.is_empty())
            .ok_or_else(|| {
                MailsyncError::Config(
                    "api_key has no data-center suffix; set api_base_url explicitly".to_string(),
                )
            })
    }

    pub fn resolved_api_base_url(&self) -> Result<String> {
        match &self.api_base_url {
            Some(url) => Ok(url.trim_end_matches('/').to_string()),
            None => Ok(format!("https://{}.api.mailchimp.com/3.0", self.data_center()?)),
        }
    }

    pub fn resolved_export_base_url(&self) -> Result<String> {
        match &self.export_base_url {
            Some(url) => Ok(url.trim_end_matches('/').to_string()),
            None => Ok(format!("https://{}.api.mailchimp.com/export/1.0", self.data_center()?)),
        }
    }

    /// # Errors
    /// Returns `MailsyncError::Config` for an empty key, a zero poll interval
    /// or attempt budget, or unresolvable endpoints.
    pub fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(MailsyncError::Config("api_key must not be empty".to_string()));
        }
        if self.poll_interval_secs == 0 || self.max_poll_attempts == 0 {
            return Err(MailsyncError::Config(
                "poll_interval_secs and max_poll_attempts must be positive".to_string(),
            ));
        }
        self.resolved_api_base_url()?;
        self.resolved_export_base_url()?;
        Ok(())
    }
}

/// Fixed sub-keys of the remote structured address field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressKey {
    Addr1,
    Addr2,
    City,
    State,
    Country,
    Zip,
}

impl AddressKey {
    pub const ALL: [Self; 6] =
        [Self::Addr1, Self::Addr2, Self::City, Self::State, Self::Country, Self::Zip];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Addr1 => "addr1",
            Self::Addr2 => "addr2",
            Self::City => "city",
            Self::State => "state",
            Self::Country => "country",
            Self::Zip => "zip",
        }
    }
}

fn default_address_map() -> BTreeMap<String, AddressKey> {
    AddressKey::ALL.iter().map(|key| (key.as_str().to_string(), *key)).collect()
}

fn default_audience_settings() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

fn default_identity_column() -> String {
    DEFAULT_IDENTITY_COLUMN.to_string()
}

fn default_status_column() -> String {
    DEFAULT_STATUS_COLUMN.to_string()
}

/// Settings for one push integration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegrationConfig {
    /// Remote list name.
    pub name: String,
    /// Creation defaults for the remote list (contact, permission reminder,
    /// campaign defaults). The list name is merged in at creation time.
    #[serde(default = "default_audience_settings")]
    pub audience_settings: serde_json::Value,
    /// Source table or view.
    pub table: String,
    #[serde(default)]
    pub purge_stale_emails: bool,
    #[serde(default)]
    pub field_exclusions: BTreeSet<String>,
    /// Timestamp columns used for incremental fetches.
    #[serde(default)]
    pub since: Vec<String>,
    /// Column => remote field display name.
    #[serde(default)]
    pub merge_fields_map: BTreeMap<String, String>,
    #[serde(default = "default_address_map", alias = "address_columns")]
    pub address_fields_map: BTreeMap<String, AddressKey>,
    /// Extra words kept upper-case in derived field names.
    #[serde(default)]
    pub acronyms: Vec<String>,
    #[serde(default = "default_identity_column")]
    pub identity_column: String,
    #[serde(default = "default_status_column")]
    pub status_column: String,
}

impl IntegrationConfig {
    /// Minimal configuration with every optional key at its default.
    pub fn new(name: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            audience_settings: default_audience_settings(),
            table: table.into(),
            purge_stale_emails: false,
            field_exclusions: BTreeSet::new(),
            since: Vec::new(),
            merge_fields_map: BTreeMap::new(),
            address_fields_map: default_address_map(),
            acronyms: Vec::new(),
            identity_column: default_identity_column(),
            status_column: default_status_column(),
        }
    }

    /// # Errors
    /// Returns `MailsyncError::Config` describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(MailsyncError::Config("integration name must not be empty".to_string()));
        }
        if self.table.trim().is_empty() {
            return Err(MailsyncError::Config(format!(
                "integration '{}' has no source table",
                self.name
            )));
        }
        if !self.audience_settings.is_object() {
            return Err(MailsyncError::Config(format!(
                "integration '{}': audience_settings must be a table",
                self.name
            )));
        }
        if self.identity_column.trim().is_empty() || self.status_column.trim().is_empty() {
            return Err(MailsyncError::Config(format!(
                "integration '{}': identity and status columns must be named",
                self.name
            )));
        }
        if let Some(column) = self.since.iter().find(|c| self.merge_fields_map.contains_key(*c)) {
            return Err(MailsyncError::Config(format!(
                "integration '{}': column '{column}' is both a since column and a mapped merge field",
                self.name
            )));
        }
        Ok(())
    }

    /// Row filter for an incremental fetch.
    ///
    /// A row passes when any `since` column is strictly later than
    /// `last_run`. Without `since` columns every row passes.
    pub fn constraints(&self, last_run: DateTime<Utc>) -> RowFilter {
        if self.since.is_empty() {
            RowFilter::All
        } else {
            RowFilter::AnySinceAfter { columns: self.since.clone(), since: last_run }
        }
    }

    /// Columns that may become merge fields, in their original order.
    ///
    /// Drops interest-prefixed columns, `since` and excluded columns, and the
    /// identity and status columns.
    pub fn candidate_merge_fields<S: AsRef<str>>(&self, columns: &[S]) -> Vec<String> {
        columns
            .iter()
            .map(AsRef::as_ref)
            .filter(|column| !is_interest_column(column))
            .filter(|column| !self.since.iter().any(|s| s.as_str() == *column))
            .filter(|column| !self.field_exclusions.contains(*column))
            .filter(|column| *column != self.identity_column && *column != self.status_column)
            .map(str::to_string)
            .collect()
    }

    /// Default acronyms plus the integration's own.
    pub fn acronyms(&self) -> Vec<String> {
        DEFAULT_ACRONYMS
            .iter()
            .map(|a| (*a).to_string())
            .chain(self.acronyms.iter().cloned())
            .collect()
    }

    /// Remote display name for a merge-field column: the configured override,
    /// else the title-cased column name.
    pub fn display_name(&self, column: &str) -> String {
        self.merge_fields_map
            .get(column)
            .cloned()
            .unwrap_or_else(|| titleize(column, &self.acronyms()))
    }

    pub fn address_key(&self, column: &str) -> Option<AddressKey> {
        self.address_fields_map.get(column).copied()
    }
}

/// Whether a column follows the interest-flag naming convention.
pub fn is_interest_column(column: &str) -> bool {
    column.starts_with(INTEREST_COLUMN_PREFIX)
}

/// Which source rows to fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowFilter {
    /// Every row.
    All,
    /// Rows where at least one of `columns` is strictly after `since`.
    AnySinceAfter { columns: Vec<String>, since: DateTime<Utc> },
}

impl RowFilter {
    /// In-memory evaluation, matching what a source adapter does in SQL.
    pub fn matches(&self, record: &ContactRecord) -> bool {
        match self {
            Self::All => true,
            Self::AnySinceAfter { columns, since } => columns.iter().any(|column| {
                record.get(column).and_then(|v| v.as_timestamp()).is_some_and(|ts| ts > *since)
            }),
        }
    }
}
