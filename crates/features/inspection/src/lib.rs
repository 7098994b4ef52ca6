//! Inspection feature slice.
//!
//! An inspection is scheduled against a registration and assigned to one
//! inspector, who starts it, works the checklist and completes it for review.
//! Checklist suggestions are optional and need a configured endpoint.

pub mod lifecycle;
pub mod model;
#[cfg(feature = "server")]
pub mod routes;
pub mod service;
pub mod suggest;

pub use lifecycle::{InspectionAction, InspectionLifecycle};
pub use model::{InspectionCommand, InspectionView};
pub use service::InspectionService;
pub use suggest::{ChecklistSuggester, HostedSuggester, SuggestionError};

use rego_domain::config::ApiConfig;
use rego_domain::registry::InitializedSlice;
use rego_kernel::repository::Repository;
use std::sync::Arc;

#[rego_derive::rego_slice(name = "inspection")]
pub struct Inspections {
    pub service: InspectionService,
}

pub fn init(config: &ApiConfig, repo: Repository) -> Result<InitializedSlice, SuggestionError> {
    let mut service = InspectionService::new(repo);
    match HostedSuggester::from_config(&config.suggestions)? {
        Some(suggester) => service = service.with_suggester(Arc::new(suggester)),
        None => tracing::info!("Checklist suggestions disabled: no endpoint configured"),
    }
    tracing::info!("Inspection slice initialized");
    Ok(InitializedSlice::new(Inspections::new(InspectionsInner { service })))
}
