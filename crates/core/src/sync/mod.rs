//! Push synchronization
//!
//! Transforms source rows into member operations, computes stale members,
//! submits one batch job per run, and waits for it to finish.

pub mod poller;
pub mod ports;
pub mod service;
pub mod stale;
pub mod transformer;

pub use poller::{BatchPoller, PollPolicy};
pub use service::{PushSyncService, SyncPorts};
pub use stale::StaleSetCalculator;
pub use transformer::MemberTransformer;
