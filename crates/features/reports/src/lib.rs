//! Report slice: CSV exports over the record collections.
//!
//! Reads only. Rows are built from the same stored shapes the owning slices
//! decode, with references resolved to display names.

pub mod report;
#[cfg(feature = "server")]
pub mod routes;
pub mod service;

pub use report::Report;
pub use service::{EmptyReport, ReportOutput, ReportService};

use rego_domain::registry::InitializedSlice;
use rego_kernel::repository::Repository;

#[rego_derive::rego_slice(name = "reports")]
pub struct Reports {
    pub service: ReportService,
}

#[must_use]
pub fn init(repo: Repository) -> InitializedSlice {
    tracing::info!("Reports slice initialized");
    InitializedSlice::new(Reports::new(ReportsInner { service: ReportService::new(repo) }))
}
