//! Typed field plan built from the source columns

use std::collections::HashMap;

use mailsync_domain::constants::{INTEREST_COLUMN_PREFIX, INTEREST_DELIMITER};
use mailsync_domain::{
    AddressKey, ColumnInfo, FieldType, IntegrationConfig, MailsyncError, RemoteField, Result,
};
use tracing::warn;

/// What a single source column becomes on the remote side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnClass {
    /// `interest<Category>$<Interest>` flag.
    Interest { category: String, interest: String },
    /// One component of the structured address field.
    Address(AddressKey),
    /// Merge field located by display name. `mapped` is set when the name
    /// comes from `merge_fields_map` rather than title-casing.
    MergeField { display_name: String, mapped: bool },
    /// Identity, status, `since`, excluded, or interest-prefixed column
    /// that is not a well-formed flag.
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedColumn {
    pub name: String,
    pub declared_type: String,
    pub class: ColumnClass,
}

/// Interest names of one category, in column order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterestGroup {
    pub title: String,
    pub interests: Vec<String>,
}

/// Remote interest ids keyed by (category title, interest name).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InterestIndex {
    ids: HashMap<(String, String), String>,
}

impl InterestIndex {
    pub fn insert(
        &mut self,
        category: impl Into<String>,
        interest: impl Into<String>,
        remote_id: impl Into<String>,
    ) {
        self.ids.insert((category.into(), interest.into()), remote_id.into());
    }

    pub fn get(&self, category: &str, interest: &str) -> Option<&str> {
        self.ids.get(&(category.to_string(), interest.to_string())).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Classification of every column of the source table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPlan {
    identity_column: String,
    status_column: String,
    columns: Vec<PlannedColumn>,
}

impl FieldPlan {
    /// Classify `columns` against the integration settings.
    ///
    /// Priority: interest prefix, then reserved columns, then address
    /// components, then mapped and default merge fields. A column in both
    /// `address_fields_map` and `merge_fields_map` is an address component.
    ///
    /// # Errors
    /// Returns `MailsyncError::Config` when the identity column is missing
    /// from the source.
    pub fn build(config: &IntegrationConfig, columns: &[ColumnInfo]) -> Result<Self> {
        if !columns.iter().any(|c| c.name == config.identity_column) {
            return Err(MailsyncError::Config(format!(
                "table '{}' has no identity column '{}'",
                config.table, config.identity_column
            )));
        }

        let names: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
        let candidates = config.candidate_merge_fields(&names);

        let columns = columns
            .iter()
            .map(|column| {
                let class = if let Some(rest) = column.name.strip_prefix(INTEREST_COLUMN_PREFIX) {
                    parse_interest(rest).unwrap_or_else(|| {
                        warn!(
                            column = %column.name,
                            "Interest-prefixed column is not a well-formed flag, skipping"
                        );
                        ColumnClass::Skipped
                    })
                } else if !candidates.contains(&column.name) {
                    ColumnClass::Skipped
                } else if let Some(key) = config.address_key(&column.name) {
                    ColumnClass::Address(key)
                } else {
                    ColumnClass::MergeField {
                        display_name: config.display_name(&column.name),
                        mapped: config.merge_fields_map.contains_key(&column.name),
                    }
                };

                PlannedColumn {
                    name: column.name.clone(),
                    declared_type: column.declared_type.clone(),
                    class,
                }
            })
            .collect();

        Ok(Self {
            identity_column: config.identity_column.clone(),
            status_column: config.status_column.clone(),
            columns,
        })
    }

    pub fn columns(&self) -> &[PlannedColumn] {
        &self.columns
    }

    /// Interest categories with their interests, in first-seen order.
    pub fn interest_groups(&self) -> Vec<InterestGroup> {
        let mut groups: Vec<InterestGroup> = Vec::new();
        for column in &self.columns {
            if let ColumnClass::Interest { category, interest } = &column.class {
                match groups.iter_mut().find(|g| g.title == *category) {
                    Some(group) => {
                        if !group.interests.contains(interest) {
                            group.interests.push(interest.clone());
                        }
                    }
                    None => groups.push(InterestGroup {
                        title: category.clone(),
                        interests: vec![interest.clone()],
                    }),
                }
            }
        }
        groups
    }

    /// Merge-field columns (address components excluded).
    pub fn merge_fields(&self) -> impl Iterator<Item = (&PlannedColumn, &str)> {
        self.columns.iter().filter_map(|column| match &column.class {
            ColumnClass::MergeField { display_name, .. } => Some((column, display_name.as_str())),
            _ => None,
        })
    }

    pub fn has_address_columns(&self) -> bool {
        self.columns.iter().any(|c| matches!(c.class, ColumnClass::Address(_)))
    }

    /// Bind every classified column to its remote target.
    ///
    /// Mapped merge fields and default merge fields are both located by exact
    /// display name; address components by the first remote field of type
    /// address.
    ///
    /// # Errors
    /// Returns `MailsyncError::Internal` when a remote field or interest is
    /// missing. Provisioning must complete before resolution.
    pub fn resolve(
        &self,
        remote_fields: &[RemoteField],
        interests: &InterestIndex,
    ) -> Result<TransformPlan> {
        let address_tag = remote_fields
            .iter()
            .find(|f| f.field_type == FieldType::Address)
            .map(|f| f.tag.clone());

        let mut targets = Vec::new();
        for column in &self.columns {
            let target = match &column.class {
                ColumnClass::Skipped => continue,
                ColumnClass::Interest { category, interest } => {
                    let remote_id = interests.get(category, interest).ok_or_else(|| {
                        MailsyncError::Internal(format!(
                            "interest '{category}' / '{interest}' was not provisioned"
                        ))
                    })?;
                    ColumnTarget::Interest { remote_id: remote_id.to_string() }
                }
                ColumnClass::Address(key) => {
                    let tag = address_tag.clone().ok_or_else(|| {
                        MailsyncError::Internal("no remote address field".to_string())
                    })?;
                    ColumnTarget::AddressPart { tag, key: *key }
                }
                ColumnClass::MergeField { display_name, .. } => {
                    let field =
                        remote_fields.iter().find(|f| f.name == *display_name).ok_or_else(|| {
                            MailsyncError::Internal(format!(
                                "merge field '{display_name}' for column '{}' was not provisioned",
                                column.name
                            ))
                        })?;
                    ColumnTarget::MergeTag(field.tag.clone())
                }
            };
            targets.push((column.name.clone(), target));
        }

        Ok(TransformPlan {
            identity_column: self.identity_column.clone(),
            status_column: self.status_column.clone(),
            targets,
        })
    }
}

fn parse_interest(rest: &str) -> Option<ColumnClass> {
    match rest.split_once(INTEREST_DELIMITER) {
        Some((category, interest)) if !category.is_empty() && !interest.is_empty() => {
            Some(ColumnClass::Interest {
                category: category.to_string(),
                interest: interest.to_string(),
            })
        }
        _ => None,
    }
}

/// Where a column's value lands in the member payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnTarget {
    MergeTag(String),
    AddressPart { tag: String, key: AddressKey },
    Interest { remote_id: String },
}

/// Fully resolved plan consumed by the member transformer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformPlan {
    pub identity_column: String,
    pub status_column: String,
    pub targets: Vec<(String, ColumnTarget)>,
}
