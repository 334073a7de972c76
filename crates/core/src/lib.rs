//! # Mailsync Core
//!
//! Pure business logic layer - no infrastructure dependencies.
//!
//! This crate contains:
//! - Column classification into a typed field plan
//! - Port interfaces (traits) for the remote API, caches, and the source
//! - Schema provisioning and the push sync service
//!
//! ## Architecture Principles
//! - Only depends on `mailsync-domain`
//! - No database, HTTP, or filesystem code
//! - All external dependencies via traits

pub mod classification;
pub mod provisioning;
pub mod sync;

// Re-export specific items to avoid ambiguity
pub use classification::{FieldPlan, InterestIndex, TransformPlan};
pub use provisioning::ports::{AudienceSchemaApi, IdentifierCache};
pub use provisioning::SchemaProvisioner;
pub use sync::ports::{BatchApi, ContactSource, MemberExportApi, RunStateStore};
pub use sync::{BatchPoller, PollPolicy, PushSyncService, SyncPorts};
