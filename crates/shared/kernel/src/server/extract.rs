use super::error::ApiError;
use super::state::ApiState;
use crate::ServiceError;
use crate::context::RequestContext;
use axum::extract::{FromRef, FromRequestParts};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

impl<S> FromRequestParts<S> for RequestContext
where
    ApiState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = ApiState::from_ref(state);
        let token = bearer_token(parts).map_err(ApiError::signed_out)?;
        let principal =
            state.authenticator.authenticate(token).await.map_err(ApiError::signed_out)?;
        let request_id = parts
            .headers
            .get(REQUEST_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.is_empty() && value.len() <= 64)
            .map_or_else(|| crate::safe_nanoid!(), str::to_owned);

        tracing::Span::current().record("user", principal.user_id.as_str());
        Ok(Self { principal, request_id })
    }
}

fn bearer_token(parts: &Parts) -> Result<&str, ServiceError> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .ok_or_else(|| ServiceError::unauthenticated("Missing Authorization header"))?;
    let value = header
        .to_str()
        .map_err(|_| ServiceError::unauthenticated("Authorization header is not valid text"))?;
    value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| ServiceError::unauthenticated("Expected a Bearer token"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{Authenticator, Principal};
    use async_trait::async_trait;
    use axum::http::{Request, StatusCode};
    use rego_database::MemoryStore;
    use rego_domain::config::ApiConfig;
    use rego_domain::roles::Role;
    use std::sync::Arc;

    #[derive(Debug)]
    struct Fixed;

    #[async_trait]
    impl Authenticator for Fixed {
        async fn authenticate(&self, token: &str) -> Result<Principal, ServiceError> {
            if token == "good" {
                Ok(
                    Principal {
                        user_id: "u1".into(),
                        display_name: "Kim".into(),
                        role: Role::Registrar,
                    },
                )
            } else {
                Err(ServiceError::unauthenticated("Token rejected"))
            }
        }
    }

    async fn extract(
        authorization: Option<&str>,
        request_id: Option<&str>,
    ) -> Result<RequestContext, ApiError> {
        let state = ApiState::builder()
            .config(ApiConfig::default())
            .store(Arc::new(MemoryStore::new()))
            .authenticator(Arc::new(Fixed))
            .build()
            .unwrap();
        let mut builder = Request::builder().uri("/api/registrations");
        if let Some(value) = authorization {
            builder = builder.header(AUTHORIZATION, value);
        }
        if let Some(value) = request_id {
            builder = builder.header(REQUEST_ID_HEADER, value);
        }
        let (mut parts, ()) = builder.body(()).unwrap().into_parts();
        RequestContext::from_request_parts(&mut parts, &state).await
    }

    #[tokio::test]
    async fn bearer_token_resolves_the_principal() {
        let ctx = extract(Some("Bearer good"), Some("req-42")).await.unwrap();
        assert_eq!(ctx.user_id(), "u1");
        assert_eq!(ctx.role(), Role::Registrar);
        assert_eq!(ctx.request_id, "req-42");
    }

    #[tokio::test]
    async fn request_id_is_generated_when_absent() {
        let ctx = extract(Some("Bearer good"), None).await.unwrap();
        assert_eq!(ctx.request_id.len(), 12);
    }

    #[tokio::test]
    async fn missing_or_foreign_schemes_are_unauthenticated() {
        for header in [None, Some("Basic dTpw"), Some("Bearer "), Some("Bearer bad")] {
            let err = extract(header, None).await.unwrap_err();
            assert_eq!(err.status(), StatusCode::UNAUTHORIZED, "header {header:?}");
            assert!(!err.body().retry);
        }
    }
}
