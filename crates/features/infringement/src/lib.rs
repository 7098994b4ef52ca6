//! Infringement feature slice.
//!
//! An officer drafts a notice against a registration, issues it and submits it
//! for review. Management approves or voids it; payment is recorded by the
//! registry. Points and fine totals are summed from the items on every read.

pub mod lifecycle;
pub mod model;
#[cfg(feature = "server")]
pub mod routes;
pub mod service;

pub use lifecycle::{InfringementAction, InfringementLifecycle};
pub use model::{InfringementCommand, InfringementView, Totals};
pub use service::InfringementService;

use rego_domain::registry::InitializedSlice;
use rego_kernel::repository::Repository;

#[rego_derive::rego_slice(name = "infringement")]
pub struct Infringements {
    pub service: InfringementService,
}

#[must_use]
pub fn init(repo: Repository) -> InitializedSlice {
    tracing::info!("Infringement slice initialized");
    InitializedSlice::new(
        Infringements::new(InfringementsInner { service: InfringementService::new(repo) }),
    )
}
