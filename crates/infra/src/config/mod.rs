//! Configuration loading
//!
//! Application settings come from a file or the environment; integration
//! settings come from one folder per integration.

pub mod loader;

pub use loader::{
    discover_integrations, load, load_from_env, load_from_file, load_integration,
    probe_config_paths,
};
