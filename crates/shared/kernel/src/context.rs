//! Request-scoped identity.
//!
//! Every service operation takes a [`RequestContext`] explicitly. There is no
//! ambient session: the server extracts the context per request from the
//! bearer token through an [`Authenticator`].

use crate::ServiceError;
use crate::lifecycle::Actor;
use crate::reference::RefField;
use async_trait::async_trait;
use rego_derive::api_model;
use rego_domain::constants::Collection;
use rego_domain::roles::{Role, RoleSet};
use std::fmt::Debug;

/// The authenticated caller, with the role read from its `users` document.
#[api_model]
#[derive(Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: String,
    pub display_name: String,
    pub role: Role,
}

#[derive(Debug, Clone)]
pub struct RequestContext {
    pub principal: Principal,
    pub request_id: String,
}

impl RequestContext {
    #[must_use]
    pub fn new(principal: Principal) -> Self {
        Self { principal, request_id: crate::safe_nanoid!() }
    }

    #[must_use]
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = request_id.into();
        self
    }

    #[must_use]
    pub const fn role(&self) -> Role {
        self.principal.role
    }

    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.principal.user_id
    }

    /// Guard actor for a record whose assignee is `assignee`.
    #[must_use]
    pub fn actor(&self, assignee: &RefField) -> Actor {
        Actor::new(self.role()).assignee(assignee.is_user(self.user_id()))
    }

    /// Pointer to the caller's `users` document, for audit fields.
    #[must_use]
    pub fn user_ref(&self) -> RefField {
        RefField::pointer(Collection::Users, self.user_id())
    }

    /// Operation-level role check, for operations outside any lifecycle.
    pub fn require(&self, roles: RoleSet, operation: &'static str) -> Result<(), ServiceError> {
        if roles.allows(self.role()) {
            Ok(())
        } else {
            Err(ServiceError::Forbidden {
                message: format!("Role '{}' may not {operation}", self.role()).into(),
                context: None,
            })
        }
    }
}

/// Turns a bearer token into a [`Principal`].
#[async_trait]
pub trait Authenticator: Debug + Send + Sync {
    /// # Errors
    /// [`ServiceError::Unauthenticated`] for a missing, malformed or expired token.
    /// [`ServiceError::Forbidden`] for a valid token whose user is unknown or inactive.
    async fn authenticate(&self, token: &str) -> Result<Principal, ServiceError>;
}
