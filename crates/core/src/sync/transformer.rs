//! Member transformer - source rows to member payloads

use mailsync_domain::{
    member_path, normalize_email, BatchOperation, ContactRecord, MailsyncError, MemberPayload,
    Result,
};

use crate::classification::{ColumnTarget, TransformPlan};

/// Maps source rows onto member payloads and upsert operations for one list.
pub struct MemberTransformer {
    list_id: String,
    plan: TransformPlan,
}

impl MemberTransformer {
    pub fn new(list_id: impl Into<String>, plan: TransformPlan) -> Self {
        Self { list_id: list_id.into(), plan }
    }

    /// Normalized identity of a row, if it has one.
    pub fn identity(&self, contact: &ContactRecord) -> Option<String> {
        contact
            .get(&self.plan.identity_column)
            .and_then(|value| value.as_text())
            .map(|raw| normalize_email(&raw))
            .filter(|email| !email.is_empty())
    }

    /// Build the member payload for one row.
    ///
    /// # Errors
    /// Returns `MailsyncError::InvalidInput` when the row has no identity or
    /// no subscription status.
    pub fn transform(&self, contact: &ContactRecord) -> Result<MemberPayload> {
        let email = self.identity(contact).ok_or_else(|| {
            MailsyncError::InvalidInput(format!("row has no '{}' value", self.plan.identity_column))
        })?;
        let status = contact
            .get(&self.plan.status_column)
            .and_then(|value| value.as_text())
            .ok_or_else(|| {
                MailsyncError::InvalidInput(format!(
                    "row {email} has no '{}' value",
                    self.plan.status_column
                ))
            })?;

        let mut payload = MemberPayload::new(email, status);

        for (column, target) in &self.plan.targets {
            let Some(value) = contact.get(column) else {
                continue;
            };

            match target {
                ColumnTarget::Interest { remote_id } => {
                    payload.interests.insert(remote_id.clone(), value.is_truthy());
                }
                ColumnTarget::MergeTag(tag) => {
                    if let Some(json) = value.to_merge_value() {
                        payload.merge_fields.insert(tag.clone(), json);
                    }
                }
                ColumnTarget::AddressPart { tag, key } => {
                    let Some(json) = value.to_merge_value() else {
                        continue;
                    };
                    let address = payload
                        .merge_fields
                        .entry(tag.clone())
                        .or_insert_with(|| serde_json::Value::Object(serde_json::Map::new()));
                    if let serde_json::Value::Object(parts) = address {
                        parts.insert(key.as_str().to_string(), json);
                    }
                }
            }
        }

        Ok(payload)
    }

    /// Idempotent upsert keyed by the identity hash.
    pub fn upsert_operation(&self, contact: &ContactRecord) -> Result<BatchOperation> {
        let payload = self.transform(contact)?;
        let body = serde_json::to_string(&payload)
            .map_err(|e| MailsyncError::Internal(format!("failed to encode member: {e}")))?;
        Ok(BatchOperation::put(member_path(&self.list_id, &payload.email_address), body))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use mailsync_domain::{AddressKey, ColumnValue, OperationMethod};
    use serde_json::json;

    use super::*;

    fn transformer() -> MemberTransformer {
        MemberTransformer::new(
            "list-1",
            TransformPlan {
                identity_column: "email".into(),
                status_column: "subscription_status".into(),
                targets: vec![
                    ("first_name".into(), ColumnTarget::MergeTag("FNAME".into())),
                    ("signup_date".into(), ColumnTarget::MergeTag("MMERGE3".into())),
                    (
                        "addr1".into(),
                        ColumnTarget::AddressPart { tag: "ADDRESS".into(), key: AddressKey::Addr1 },
                    ),
                    (
                        "city".into(),
                        ColumnTarget::AddressPart { tag: "ADDRESS".into(), key: AddressKey::City },
                    ),
                    (
                        "interestNewsletter$Weekly".into(),
                        ColumnTarget::Interest { remote_id: "int-w".into() },
                    ),
                    (
                        "interestNewsletter$Monthly".into(),
                        ColumnTarget::Interest { remote_id: "int-m".into() },
                    ),
                ],
            },
        )
    }

    fn contact() -> ContactRecord {
        ContactRecord::new()
            .with("email", ColumnValue::Text("USER@Example.com".into()))
            .with("subscription_status", ColumnValue::Text("subscribed".into()))
            .with("first_name", ColumnValue::Text("Ann".into()))
            .with(
                "signup_date",
                ColumnValue::Timestamp(Utc.with_ymd_and_hms(2023, 11, 2, 9, 15, 0).unwrap()),
            )
            .with("addr1", ColumnValue::Text("1 Main St".into()))
            .with("city", ColumnValue::Null)
            .with("interestNewsletter$Weekly", ColumnValue::Integer(1))
            .with("interestNewsletter$Monthly", ColumnValue::Bit(false))
    }

    #[test]
    fn builds_member_payload() {
        let payload = transformer().transform(&contact()).unwrap();

        assert_eq!(payload.email_address, "user@example.com");
        assert_eq!(payload.status, "subscribed");
        assert_eq!(payload.status_if_new, "subscribed");
        assert_eq!(payload.merge_fields["FNAME"], json!("Ann"));
        assert_eq!(payload.merge_fields["MMERGE3"], json!("2023-11-02T09:15:00Z"));
        assert_eq!(payload.merge_fields["ADDRESS"], json!({ "addr1": "1 Main St" }));
        assert_eq!(payload.interests.get("int-w"), Some(&true));
        assert_eq!(payload.interests.get("int-m"), Some(&false));
        assert!(!payload.merge_fields.contains_key("interestNewsletter$Weekly"));
    }

    #[test]
    fn address_is_omitted_when_every_component_is_null() {
        let record = contact().with("addr1", ColumnValue::Null);
        let payload = transformer().transform(&record).unwrap();
        assert!(!payload.merge_fields.contains_key("ADDRESS"));
    }

    #[test]
    fn upsert_is_keyed_by_identity_hash_and_stable() {
        let transformer = transformer();
        let first = transformer.upsert_operation(&contact()).unwrap();
        let second = transformer.upsert_operation(&contact()).unwrap();

        assert_eq!(first.method, OperationMethod::Put);
        assert_eq!(first.path, "lists/list-1/members/b58996c504c5638798eb6b511e6f49af");
        assert_eq!(first, second);
    }

    #[test]
    fn rows_without_identity_or_status_are_rejected() {
        let transformer = transformer();
        let no_email = contact().with("email", ColumnValue::Text("  ".into()));
        let no_status = contact().with("subscription_status", ColumnValue::Null);

        assert!(matches!(transformer.transform(&no_email), Err(MailsyncError::InvalidInput(_))));
        assert!(matches!(transformer.transform(&no_status), Err(MailsyncError::InvalidInput(_))));
    }
}
