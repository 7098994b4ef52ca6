use crate::ServiceError;
use crate::validation::FieldError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use rego_database::DatabaseError;
use rego_derive::api_model;

pub type ApiResult<T> = Result<T, ApiError>;

/// JSON body of every error response.
#[api_model]
pub struct ErrorBody {
    pub error: String,
    /// Stable machine-readable code, e.g. `not_found`.
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldError>,
    /// The caller is signed in and may retry by hand. Nothing retries on its own.
    pub retry: bool,
}

/// HTTP face of [`ServiceError`].
///
/// Errors raised after the request context was established are offered a
/// manual retry. Rejections from the context extractor are not.
#[derive(Debug)]
pub struct ApiError {
    error: ServiceError,
    signed_in: bool,
}

impl<E: Into<ServiceError>> From<E> for ApiError {
    fn from(err: E) -> Self {
        Self { error: err.into(), signed_in: true }
    }
}

impl ApiError {
    /// A rejection raised before any principal was resolved.
    #[must_use]
    pub fn signed_out(err: impl Into<ServiceError>) -> Self {
        Self { error: err.into(), signed_in: false }
    }

    #[must_use]
    pub const fn error(&self) -> &ServiceError {
        &self.error
    }

    #[must_use]
    pub fn into_inner(self) -> ServiceError {
        self.error
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        match &self.error {
            ServiceError::NotFound { .. } => StatusCode::NOT_FOUND,
            ServiceError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ServiceError::Guard { .. } | ServiceError::Forbidden { .. } => StatusCode::FORBIDDEN,
            ServiceError::Unauthenticated { .. } => StatusCode::UNAUTHORIZED,
            ServiceError::Conflict { .. } => StatusCode::CONFLICT,
            ServiceError::Unavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            ServiceError::Store { source, .. } => match source {
                DatabaseError::NotFound { .. } => StatusCode::NOT_FOUND,
                DatabaseError::PermissionDenied { .. } => StatusCode::FORBIDDEN,
                DatabaseError::PreconditionFailed { .. } | DatabaseError::AlreadyExists { .. } => {
                    StatusCode::CONFLICT
                }
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ServiceError::Codec { .. } | ServiceError::Internal { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Error code for the body. Store failures report the store's code.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match &self.error {
            ServiceError::Store { source, .. } => source.kind(),
            ServiceError::Guard { source, .. } => source.kind(),
            other => other.kind(),
        }
    }

    #[must_use]
    pub fn body(&self) -> ErrorBody {
        let hint = match &self.error {
            ServiceError::Store {
                source: DatabaseError::PermissionDenied { collection, .. },
                ..
            } => {
                Some(format!("Check the document store access rules for '{collection}'"))
            }
            _ => None,
        };
        let fields = match &self.error {
            ServiceError::Validation { fields, .. } => fields.as_slice().to_vec(),
            _ => Vec::new(),
        };
        ErrorBody {
            error: self.error.to_string(),
            kind: self.kind().to_owned(),
            hint,
            fields,
            retry: self.signed_in,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.error, kind = self.kind(), "Request failed");
        } else {
            tracing::debug!(
                error = %self.error,
                kind = self.kind(),
                status = status.as_u16(),
                "Request rejected"
            );
        }
        (status, Json(self.body())).into_response()
    }
}
