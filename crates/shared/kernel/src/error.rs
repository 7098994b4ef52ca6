use crate::lifecycle::GuardError;
use crate::validation::FieldErrors;
use rego_database::DatabaseError;
use std::borrow::Cow;

/// Failure taxonomy shared by every feature service.
#[rego_derive::rego_error]
pub enum ServiceError {
    #[error("{collection}/{id} not found{}", format_context(.context))]
    NotFound { collection: &'static str, id: String, context: Option<Cow<'static, str>> },

    #[error("Validation failed{}: {fields}", format_context(.context))]
    Validation { fields: FieldErrors, context: Option<Cow<'static, str>> },

    /// The lifecycle guard refused the action.
    #[error("Action refused{}: {source}", format_context(.context))]
    Guard {
        #[source]
        source: GuardError,
        context: Option<Cow<'static, str>>,
    },

    /// The caller's role may not use this operation at all.
    #[error("Forbidden{}: {message}", format_context(.context))]
    Forbidden { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Unauthenticated{}: {message}", format_context(.context))]
    Unauthenticated { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Conflict{}: {message}", format_context(.context))]
    Conflict { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// An optional collaborator is not configured or not reachable.
    #[error("Service unavailable{}: {message}", format_context(.context))]
    Unavailable { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Store error{}: {source}", format_context(.context))]
    Store {
        #[source]
        source: DatabaseError,
        context: Option<Cow<'static, str>>,
    },

    /// A stored document that does not match its record type.
    #[error("Record codec error{}: {source}", format_context(.context))]
    Codec {
        #[source]
        source: serde_json::Error,
        context: Option<Cow<'static, str>>,
    },

    #[error("Internal error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

impl ServiceError {
    pub fn forbidden(message: impl Into<Cow<'static, str>>) -> Self {
        Self::Forbidden { message: message.into(), context: None }
    }

    pub fn unauthenticated(message: impl Into<Cow<'static, str>>) -> Self {
        Self::Unauthenticated { message: message.into(), context: None }
    }

    pub fn unavailable(message: impl Into<Cow<'static, str>>) -> Self {
        Self::Unavailable { message: message.into(), context: None }
    }

    pub fn not_found(collection: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound { collection, id: id.into(), context: None }
    }
}
