//! Facade crate for the RegoCraft feature slices and shared modules.
//! Re-exports domain/kernel primitives and aggregates slice initialization.
//! Keep this crate thin: it composes other crates and holds no business rules.
//!
//! ## Usage
//! - Depend on `regocraft` with the `server` feature.
//! - Call [`init`] with the loaded config and a document store, fold the
//!   returned slices into an [`ApiState`](kernel::server::ApiState) and mount
//!   [`server::router`].

use rego_database::SharedStore;
pub use rego_domain as domain;
use rego_domain::config::ApiConfig;
use rego_domain::registry::InitializedSlice;
use rego_identity::{IdentityError, JwtAuthenticator, SharedAuthenticator};
use rego_inspection::SuggestionError;
pub use rego_kernel as kernel;
use rego_kernel::repository::Repository;
use std::borrow::Cow;
use std::sync::Arc;
use tracing::info;

/// Feature registry for runtime introspection.
pub mod features {
    pub use rego_identity as identity;
    pub use rego_infringement as infringement;
    pub use rego_inspection as inspection;
    pub use rego_licensing as licensing;
    pub use rego_registration as registration;
    pub use rego_reports as reports;

    /// Slices compiled into this build.
    pub const ENABLED: &[&str] =
        &["identity", "registration", "inspection", "licensing", "infringement", "reports"];

    #[must_use]
    pub fn is_enabled(name: &str) -> bool {
        ENABLED.contains(&name)
    }
}

#[cfg(feature = "server")]
pub mod server {
    use rego_kernel::server::ApiState;
    use utoipa_axum::router::OpenApiRouter;

    /// Health plus every feature router.
    pub fn router() -> OpenApiRouter<ApiState> {
        OpenApiRouter::new()
            .merge(rego_kernel::server::router::system_router())
            .merge(rego_identity::routes::router())
            .merge(rego_registration::routes::router())
            .merge(rego_inspection::routes::router())
            .merge(rego_licensing::routes::router())
            .merge(rego_infringement::routes::router())
            .merge(rego_reports::routes::router())
    }
}

#[rego_derive::rego_error]
pub enum BootstrapError {
    #[error("Identity bootstrap failed{}: {source}", format_context(.context))]
    Identity { source: IdentityError, context: Option<Cow<'static, str>> },
    #[error("Inspection bootstrap failed{}: {source}", format_context(.context))]
    Suggestions { source: SuggestionError, context: Option<Cow<'static, str>> },
    #[error("Bootstrap failed{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

/// Everything the server needs to assemble its state.
#[derive(Debug)]
pub struct Platform {
    pub authenticator: SharedAuthenticator,
    pub slices: Vec<InitializedSlice>,
}

/// Builds the authenticator and initializes every slice over `store`.
///
/// # Errors
/// Returns an error if the JWT settings are unusable or the suggestion
/// client cannot be built.
pub fn init(config: &ApiConfig, store: &SharedStore) -> Result<Platform, BootstrapError> {
    let repo = Repository::new(Arc::clone(store), config.records.write_mode);
    let authenticator: SharedAuthenticator = Arc::new(
        JwtAuthenticator::new(&config.security.identity, Arc::clone(store))
            .context("security.identity")?,
    );

    let slices = vec![
        features::identity::init(repo.clone(), Arc::clone(&authenticator)),
        features::registration::init(config, repo.clone()),
        features::inspection::init(config, repo.clone()).context("suggestions")?,
        features::licensing::init(config, repo.clone()),
        features::infringement::init(repo.clone()),
        features::reports::init(repo),
    ];
    info!(
        slices = slices.len(),
        write_mode = ?config.records.write_mode,
        "Feature slices initialized"
    );

    Ok(Platform { authenticator, slices })
}
