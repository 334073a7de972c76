//! Shared test helpers for `mailsync-core` integration tests.
//!
//! In-memory mocks for every port. Each mock records its calls so tests can
//! assert on exactly which remote operations a run performed.

#![allow(dead_code)]

pub mod remote;
pub mod stores;

pub use remote::{MockAudienceApi, MockBatchApi, MockExportApi};
pub use stores::{MockContactSource, MockIdentifierCache, MockRunStateStore};
