//! Identity feature slice.
//!
//! Verifies HS256 bearer tokens issued by the external identity provider and
//! resolves each subject to a [`Principal`](rego_kernel::context::Principal)
//! through its `users` profile. User administration is Admin-only.

mod error;
pub mod jwt;
#[cfg(feature = "server")]
pub mod routes;
pub mod users;

pub use error::{IdentityError, IdentityErrorExt};
pub use jwt::{Claims, JwtAuthenticator, SharedAuthenticator};
pub use users::{UserService, UserView};

use rego_domain::registry::InitializedSlice;
use rego_kernel::repository::Repository;
use tracing::info;

/// Identity feature state
#[rego_derive::rego_slice(name = "identity")]
pub struct Identity {
    pub authenticator: SharedAuthenticator,
    pub users: UserService,
}

/// Initializes the identity slice around an already-built authenticator.
#[must_use]
pub fn init(repo: Repository, authenticator: SharedAuthenticator) -> InitializedSlice {
    let users = UserService::new(repo, authenticator.clone());
    info!("Identity slice initialized");
    InitializedSlice::new(Identity::new(IdentityInner { authenticator, users }))
}
