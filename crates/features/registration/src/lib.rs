//! Registration feature slice.
//!
//! Craft registrations move Draft → Submitted → PendingReview and end
//! Approved, Rejected or Expired. Approval assigns the printed number and the
//! registration term.

pub mod lifecycle;
pub mod model;
#[cfg(feature = "server")]
pub mod routes;
pub mod service;

pub use lifecycle::{RegistrationAction, RegistrationLifecycle};
pub use model::{RegistrationCommand, RegistrationView};
pub use service::RegistrationService;

use rego_domain::config::ApiConfig;
use rego_domain::registry::InitializedSlice;
use rego_kernel::repository::Repository;

#[rego_derive::rego_slice(name = "registration")]
pub struct Registrations {
    pub service: RegistrationService,
}

#[must_use]
pub fn init(config: &ApiConfig, repo: Repository) -> InitializedSlice {
    let service = RegistrationService::new(repo, &config.records);
    tracing::info!(
        term_months = config.records.registration_term_months,
        "Registration slice initialized"
    );
    InitializedSlice::new(Registrations::new(RegistrationsInner { service }))
}
