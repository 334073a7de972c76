//! Macro for implementing Display and FromStr for wire-status enums
//!
//! Remote services often report several spellings for what is one state to
//! us. Each variant maps to a canonical string (used by `Display`) followed by
//! any number of accepted aliases (accepted by `FromStr`, case-insensitive).
//!
//! # Example
//!
//! ```rust
//! use mailsync_domain::impl_wire_status_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum JobStatus {
//!     Queued,
//!     Running,
//!     Done,
//! }
//!
//! impl_wire_status_conversions!(JobStatus {
//!     Queued => "queued",
//!     Running => "running" | "started" | "finalizing",
//!     Done => "done",
//! });
//!
//! assert_eq!("STARTED".parse::<JobStatus>(), Ok(JobStatus::Running));
//! assert_eq!(JobStatus::Running.to_string(), "running");
//! ```

/// Implements Display and FromStr traits for status enums
///
/// # Arguments
///
/// * `$enum_name` - The name of the enum type
/// * `$variant => $str | $alias ...` - Canonical string followed by optional
///   aliases
#[macro_export]
macro_rules! impl_wire_status_conversions {
    ($enum_name:ident { $($variant:ident => $str:literal $(| $alias:literal)*),+ $(,)? }) => {
        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(Self::$variant => f.write_str($str),)+
                }
            }
        }

        impl std::str::FromStr for $enum_name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_lowercase().as_str() {
                    $($str $(| $alias)* => Ok(Self::$variant),)+
                    _ => Err(format!("Invalid {}: {}", stringify!($enum_name), s)),
                }
            }
        }
    };
}
