//! # Domain Models
//!
//! Pure domain types shared by every slice: configuration, collection names,
//! roles, record statuses and the slice registry.
//! Keep it lean: no I/O, networking, or heavy logic. Just data and simple helpers.

pub mod config;
pub mod constants;
pub mod registry;
pub mod roles;
pub mod status;
