//! Pure helpers shared across layers

pub mod identity;
pub mod title;
