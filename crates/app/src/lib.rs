//! # Mailsync Application
//!
//! Wires the infrastructure adapters into the push sync service and runs the
//! configured integrations. The `mailsync` binary is a thin CLI over
//! [`run_all`].

pub mod context;
pub mod runner;

pub use context::AppContext;
pub use runner::{run_all, run_integration, select_integrations, IntegrationOutcome};
