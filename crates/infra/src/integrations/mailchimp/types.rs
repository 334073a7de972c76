//! Wire types for the Mailchimp marketing and export APIs

use mailsync_domain::constants::INTEREST_CATEGORY_TYPE;
use mailsync_domain::{
    BatchOperation, CategoryRef, ExportTable, InterestRef, ListRef, RemoteField,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::errors::MailchimpError;

#[derive(Debug, Deserialize)]
pub(crate) struct ListResource {
    pub id: String,
    pub name: String,
}

impl From<ListResource> for ListRef {
    fn from(list: ListResource) -> Self {
        ListRef { name: list.name, remote_id: list.id }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ListsPage {
    #[serde(default)]
    pub lists: Vec<ListResource>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CategoryResource {
    pub id: String,
    pub title: String,
}

impl CategoryResource {
    pub fn into_ref(self, list_id: &str) -> CategoryRef {
        CategoryRef { remote_id: self.id, title: self.title, list_remote_id: list_id.to_string() }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct CategoriesPage {
    #[serde(default)]
    pub categories: Vec<CategoryResource>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct InterestResource {
    pub id: String,
    pub name: String,
}

impl InterestResource {
    pub fn into_ref(self, category_id: &str) -> InterestRef {
        InterestRef {
            remote_id: self.id,
            name: self.name,
            category_remote_id: category_id.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct InterestsPage {
    #[serde(default)]
    pub interests: Vec<InterestResource>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MergeFieldsPage {
    #[serde(default)]
    pub merge_fields: Vec<RemoteField>,
}

/// Body for `POST lists/{id}/interest-categories`
#[derive(Debug, Serialize)]
pub(crate) struct NewCategory<'a> {
    pub title: &'a str,
    #[serde(rename = "type")]
    pub kind: &'static str,
}

impl<'a> NewCategory<'a> {
    pub fn hidden(title: &'a str) -> Self {
        Self { title, kind: INTEREST_CATEGORY_TYPE }
    }
}

/// Body for `POST .../interest-categories/{id}/interests`
#[derive(Debug, Serialize)]
pub(crate) struct NewInterest<'a> {
    pub name: &'a str,
}

/// Body for `POST batches`
#[derive(Debug, Serialize)]
pub(crate) struct BatchRequest<'a> {
    pub operations: &'a [BatchOperation],
}

/// Parse an export body: one JSON array per line, header first.
///
/// The export API signals failures with a single JSON object carrying
/// `error` and `code` instead of rows.
pub(crate) fn parse_export(body: &str) -> Result<ExportTable, MailchimpError> {
    let mut rows = Vec::new();

    for (index, line) in body.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let value: Value = serde_json::from_str(line).map_err(|err| {
            MailchimpError::InvalidBody(format!("export line {}: {err}", index + 1))
        })?;

        match value {
            Value::Array(cells) => rows.push(cells.into_iter().map(cell_text).collect()),
            Value::Object(object) if object.contains_key("error") => {
                return Err(MailchimpError::Export {
                    code: object.get("code").and_then(Value::as_i64).unwrap_or_default(),
                    message: object
                        .get("error")
                        .and_then(Value::as_str)
                        .unwrap_or("unknown export error")
                        .to_string(),
                });
            }
            other => {
                return Err(MailchimpError::InvalidBody(format!(
                    "export line {} is not an array: {other}",
                    index + 1
                )));
            }
        }
    }

    Ok(ExportTable::new(rows))
}

fn cell_text(cell: Value) -> Option<String> {
    match cell {
        Value::Null => None,
        Value::String(text) => Some(text),
        other => Some(other.to_string()),
    }
}
