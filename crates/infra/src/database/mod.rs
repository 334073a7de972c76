//! Database implementations

pub mod contact_source;
pub mod identifier_cache;
pub mod manager;
pub mod pool;

pub use contact_source::*;
pub use identifier_cache::*;
pub use manager::{DbManager, SqliteConnection};
pub use pool::*;
