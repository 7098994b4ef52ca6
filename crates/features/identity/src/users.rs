//! User profiles: the role and active flag behind every principal.

use crate::jwt::SharedAuthenticator;
use rego_database::{Body, DocumentStore, Filter};
use rego_derive::api_model;
use rego_domain::constants::Collection;
use rego_domain::roles::{Role, RoleSet};
use rego_kernel::ServiceError;
use rego_kernel::audit::{self, AuditTrail, StoredAudit};
use rego_kernel::context::RequestContext;
use rego_kernel::repository::{Repository, Stored};
use rego_kernel::security::resource::ResourceGuard;
use rego_kernel::time;
use rego_kernel::validation::FieldErrors;
use serde::Deserialize;
use serde_json::Value;
use std::str::FromStr;
use tracing::{info, instrument};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredUser {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub active: Option<bool>,
    #[serde(flatten)]
    pub audit: StoredAudit,
}

#[api_model]
#[derive(Clone, PartialEq)]
pub struct UserView {
    pub id: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
    pub active: bool,
    #[serde(flatten)]
    pub audit: AuditTrail,
}

impl From<Stored<StoredUser>> for UserView {
    fn from(stored: Stored<StoredUser>) -> Self {
        let Stored { id, record } = stored;
        Self {
            id,
            display_name: record.display_name,
            email: record.email,
            role: record.role.as_deref().and_then(|r| Role::from_str(r).ok()),
            active: record.active.unwrap_or(true),
            audit: AuditTrail::from(&record.audit),
        }
    }
}

#[api_model(deny_unknown_fields = true)]
pub struct UpsertUserRequest {
    pub display_name: String,
    #[serde(default)]
    pub email: Option<String>,
    pub role: Role,
    #[serde(default = "active_by_default")]
    pub active: bool,
}

const fn active_by_default() -> bool {
    true
}

#[api_model(deny_unknown_fields = true)]
pub struct ChangeRoleRequest {
    pub role: Role,
}

#[derive(Debug, Clone)]
pub struct UserService {
    repo: Repository,
    authenticator: SharedAuthenticator,
}

impl UserService {
    #[must_use]
    pub const fn new(repo: Repository, authenticator: SharedAuthenticator) -> Self {
        Self { repo, authenticator }
    }

    #[instrument(skip_all, fields(user = ctx.user_id()), err)]
    pub async fn list(&self, ctx: &RequestContext) -> Result<Vec<UserView>, ServiceError> {
        ctx.require(RoleSet::ADMIN, "list users")?;
        let users = self.repo.list::<StoredUser>(Collection::Users, &Filter::all()).await?;
        Ok(users.into_iter().map(UserView::from).collect())
    }

    /// The caller's own profile.
    pub async fn me(&self, ctx: &RequestContext) -> Result<UserView, ServiceError> {
        let stored = self.repo.fetch::<StoredUser>(Collection::Users, ctx.user_id()).await?;
        Ok(stored.into())
    }

    /// Creates or replaces a profile. The id is the identity provider's subject.
    #[instrument(skip(self, ctx, request), fields(user = ctx.user_id()), err)]
    pub async fn upsert(
        &self,
        ctx: &RequestContext,
        id: &str,
        request: UpsertUserRequest,
    ) -> Result<UserView, ServiceError> {
        ctx.require(RoleSet::ADMIN, "manage users")?;
        let id = ResourceGuard::verify(id, Collection::Users)?;

        let mut errors = FieldErrors::new();
        errors.require(Some(request.display_name.as_str()), "displayName");
        if let Some(email) = &request.email {
            errors.check(email.contains('@'), "email", "must be an email address");
        }
        errors.finish()?;

        let mut body = Body::new();
        body.insert(
            "displayName".to_owned(),
            Value::String(request.display_name.trim().to_owned()),
        );
        body.insert("email".to_owned(), request.email.map_or(Value::Null, Value::String));
        body.insert("role".to_owned(), Value::String(request.role.to_string()));
        body.insert("active".to_owned(), Value::Bool(request.active));

        let now = time::now();
        let exists = self.repo.store().get(Collection::Users, &id).await?.is_some();
        if exists {
            audit::stamp_updated(&mut body, ctx, now);
            self.repo.patch(Collection::Users, &id, body).await?;
        } else {
            body.retain(|_, value| !value.is_null());
            audit::stamp_created(&mut body, ctx, now);
            self.repo.put(Collection::Users, &id, body).await?;
        }
        self.authenticator.invalidate(&id).await;
        info!(%id, role = %request.role, created = !exists, "User profile written");

        Ok(self.repo.fetch::<StoredUser>(Collection::Users, &id).await?.into())
    }

    #[instrument(skip(self, ctx), fields(user = ctx.user_id()), err)]
    pub async fn change_role(
        &self,
        ctx: &RequestContext,
        id: &str,
        role: Role,
    ) -> Result<UserView, ServiceError> {
        ctx.require(RoleSet::ADMIN, "change roles")?;
        let id = ResourceGuard::verify(id, Collection::Users)?;
        self.repo.fetch::<StoredUser>(Collection::Users, &id).await?;

        let mut patch = Body::new();
        patch.insert("role".to_owned(), Value::String(role.to_string()));
        audit::stamp_updated(&mut patch, ctx, time::now());
        self.repo.patch(Collection::Users, &id, patch).await?;
        self.authenticator.invalidate(&id).await;
        info!(%id, %role, "User role changed");

        Ok(self.repo.fetch::<StoredUser>(Collection::Users, &id).await?.into())
    }
}
