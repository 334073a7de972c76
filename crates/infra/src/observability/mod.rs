//! Observability infrastructure
//!
//! Log sink setup for the `mailsync` binary. Everything else logs through
//! `tracing` macros and stays sink-agnostic.

pub mod logging;

pub use logging::{init_logging, level_from_verbosity, LoggingConfig, LoggingGuard};
