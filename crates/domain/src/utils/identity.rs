//! Member identity normalization and content-hash keys

use md5::{Digest, Md5};

/// Canonical form of a member identity: trimmed and lower-cased.
pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// MD5 hex digest of the normalized identity.
///
/// The remote service addresses members by this hash, which makes upserts
/// and deletes idempotent across runs.
///
/// ```
/// use mailsync_domain::utils::identity::member_hash;
///
/// assert_eq!(member_hash("USER@Example.com"), "b58996c504c5638798eb6b511e6f49af");
/// ```
pub fn member_hash(email: &str) -> String {
    hex::encode(Md5::digest(normalize_email(email).as_bytes()))
}

/// Remote path of a member resource.
pub fn member_path(list_id: &str, email: &str) -> String {
    format!("lists/{list_id}/members/{}", member_hash(email))
}
