use crate::error::{IdentityError, IdentityErrorExt};
use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use moka::future::Cache;
use rego_database::{DocumentStore, SharedStore};
use rego_domain::config::IdentityConfig;
use rego_domain::constants::Collection;
use rego_domain::roles::Role;
use rego_kernel::ServiceError;
use rego_kernel::context::{Authenticator, Principal};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Registered claims issued by the identity provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: i64,
    #[serde(default)]
    pub iat: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,
    /// Display name fallback when the user profile has none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// HS256 bearer-token verifier backed by the `users` collection.
pub struct JwtAuthenticator {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    issuer: Option<String>,
    audience: Option<String>,
    ttl_seconds: i64,
    store: SharedStore,
    cache: Cache<String, Principal>,
}

impl fmt::Debug for JwtAuthenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtAuthenticator")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("ttl_seconds", &self.ttl_seconds)
            .field("cached", &self.cache.entry_count())
            .finish_non_exhaustive()
    }
}

impl JwtAuthenticator {
    /// # Errors
    /// Returns an error if the shared secret is empty.
    pub fn new(config: &IdentityConfig, store: SharedStore) -> Result<Self, IdentityError> {
        let jwt = &config.jwt;
        if jwt.secret.is_empty() {
            return Err(IdentityError::InvalidConfiguration {
                message: "JWT secret must not be empty".into(),
                context: Some("security.identity.jwt.secret".into()),
            });
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = jwt.clock_skew_seconds;
        validation.set_required_spec_claims(&["exp", "sub"]);
        if let Some(issuer) = &jwt.issuer {
            validation.set_issuer(&[issuer]);
        }
        match &jwt.audience {
            Some(audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }

        let cache = Cache::builder()
            .max_capacity(config.session_cache_capacity)
            .time_to_live(Duration::from_secs(config.principal_ttl_seconds))
            .build();

        Ok(Self {
            encoding_key: EncodingKey::from_secret(jwt.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(jwt.secret.as_bytes()),
            validation,
            issuer: jwt.issuer.clone(),
            audience: jwt.audience.clone(),
            ttl_seconds: i64::try_from(jwt.ttl_seconds).unwrap_or(i64::MAX),
            store,
            cache,
        })
    }

    /// Mints a token for `subject`, as the identity provider would.
    pub fn issue(&self, subject: &str, name: Option<&str>) -> Result<String, IdentityError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: subject.to_owned(),
            exp: now.saturating_add(self.ttl_seconds),
            iat: Some(now),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            name: name.map(str::to_owned),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .context("Failed to encode token")
    }

    /// Checks signature, expiry and the configured issuer/audience.
    pub fn verify(&self, token: &str) -> Result<Claims, IdentityError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .context("Token rejected")
    }

    /// Drops a cached principal so the next request re-reads the profile.
    pub async fn invalidate(&self, user_id: &str) {
        self.cache.invalidate(user_id).await;
    }

    async fn load_principal(&self, claims: &Claims) -> Result<Principal, ServiceError> {
        let Some(doc) = self.store.get(Collection::Users, &claims.sub).await? else {
            warn!(user = %claims.sub, "Token subject has no user profile");
            return Err(ServiceError::forbidden("No user profile for this account"));
        };
        if doc.data.get("active").and_then(Value::as_bool) == Some(false) {
            warn!(user = %claims.sub, "Inactive user presented a valid token");
            return Err(ServiceError::forbidden("User account is inactive"));
        }
        let role = doc
            .data
            .get("role")
            .and_then(Value::as_str)
            .and_then(|raw| Role::from_str(raw).ok())
            .ok_or_else(|| ServiceError::forbidden("User profile has no valid role"))?;
        let display_name = doc
            .data
            .get("displayName")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .or_else(|| claims.name.clone())
            .unwrap_or_else(|| claims.sub.clone());

        debug!(user = %claims.sub, %role, "Principal resolved");
        Ok(Principal { user_id: claims.sub.clone(), display_name, role })
    }
}

#[async_trait]
impl Authenticator for JwtAuthenticator {
    #[instrument(skip_all, err)]
    async fn authenticate(&self, token: &str) -> Result<Principal, ServiceError> {
        let claims = self.verify(token)?;

        self.cache
            .try_get_with(claims.sub.clone(), self.load_principal(&claims))
            .await
            .map_err(|e: Arc<ServiceError>| {
                Arc::try_unwrap(e).unwrap_or_else(|arc| match arc.as_ref() {
                    ServiceError::Forbidden { message, .. } => {
                        ServiceError::forbidden(message.clone())
                    }
                    other => ServiceError::Internal {
                        message: other.to_string().into(),
                        context: Some("Principal loader failed for a concurrent request".into()),
                    },
                })
            })
    }
}

/// Shared handle used by both the request extractor and user administration.
pub type SharedAuthenticator = Arc<JwtAuthenticator>;
