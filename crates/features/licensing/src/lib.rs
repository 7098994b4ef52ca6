//! Operator licence feature slice.
//!
//! Applications follow the registration review path, with an optional
//! competency test in the middle. Each scheduled test is its own
//! `competencyTests` document; a failed test may be rescheduled.

pub mod lifecycle;
pub mod model;
#[cfg(feature = "server")]
pub mod routes;
pub mod service;

pub use lifecycle::{LicenseAction, LicenseLifecycle};
pub use model::{LicenseCommand, LicenseView};
pub use service::LicenseService;

use rego_domain::config::ApiConfig;
use rego_domain::registry::InitializedSlice;
use rego_kernel::repository::Repository;

#[rego_derive::rego_slice(name = "licensing")]
pub struct Licensing {
    pub service: LicenseService,
}

#[must_use]
pub fn init(config: &ApiConfig, repo: Repository) -> InitializedSlice {
    let service = LicenseService::new(repo, &config.records);
    tracing::info!(term_months = config.records.license_term_months, "Licensing slice initialized");
    InitializedSlice::new(Licensing::new(LicensingInner { service }))
}
