//! Kernel utilities shared across slices.
//!
//! Everything a feature needs to implement a record family lives here: the
//! request context, the timestamp normalizer, the reference resolver, the
//! status/role guard and the repository that writes guarded transitions.
//!
//! ## ID generation
//! Use `safe_nanoid!` for URL-safe, unambiguous IDs:
//! ```rust
//! # use rego_kernel::safe_nanoid;
//! let id = safe_nanoid!();
//! assert_eq!(id.len(), 12);
//! ```
//!
//! ## Config loading
//! ```rust,no_run
//! use rego_kernel::config::load_config;
//! use rego_kernel::domain::config::ApiConfig;
//!
//! let cfg: ApiConfig = load_config(Some("server.toml")).unwrap();
//! ```
pub mod audit;
pub mod config;
pub mod context;
pub mod csv;
pub mod error;
pub mod lifecycle;
pub mod reference;
pub mod repository;
pub mod security;
#[cfg(feature = "server")]
pub mod server;
pub mod time;
pub mod validation;

// Alphabet excludes visually ambiguous characters (I, O, l, 0, 1).
pub const SAFE_ALPHABET: &[char; 55] = &[
    '2', '3', '4', '5', '6', '7', '8', '9', 'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'J', 'K', 'L',
    'M', 'N', 'P', 'Q', 'R', 'S', 'T', 'U', 'V', 'W', 'X', 'Y', 'Z', 'a', 'b', 'c', 'd', 'e', 'f',
    'g', 'h', 'j', 'k', 'm', 'n', 'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z',
];

/// Uppercase subset of [`SAFE_ALPHABET`], used for printed record numbers.
pub const NUMBER_ALPHABET: &[char; 32] = &[
    '2', '3', '4', '5', '6', '7', '8', '9', 'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'J', 'K', 'L',
    'M', 'N', 'P', 'Q', 'R', 'S', 'T', 'U', 'V', 'W', 'X', 'Y', 'Z',
];

pub use error::{ServiceError, ServiceErrorExt};
pub use nanoid::nanoid;
pub use rego_database as database;
pub use rego_domain as domain;

/// Generates an unambiguous `NanoID` (no visually confusing characters).
#[macro_export]
macro_rules! safe_nanoid {
    () => {
        $crate::nanoid!(12, $crate::SAFE_ALPHABET)
    };
    ($size:expr) => {
        $crate::nanoid!($size, $crate::SAFE_ALPHABET)
    };
}

/// Generates a printed record number such as `RC-2026-7KQ2M9XD`.
#[macro_export]
macro_rules! record_number {
    ($prefix:expr, $year:expr) => {
        format!("{}-{}-{}", $prefix, $year, $crate::nanoid!(8, $crate::NUMBER_ALPHABET))
    };
}
