use std::borrow::Cow;

/// A specialized [`DatabaseError`] enum of this crate.
#[rego_derive::rego_error]
pub enum DatabaseError {
    /// Validation errors.
    #[error("Validation error{}: {message}", format_context(.context))]
    Validation { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// Occurs when connectivity or health checks fail.
    #[error("Database connection failed{}: {message}", format_context(.context))]
    Connection { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// Occurs when authentication fails.
    #[error("Authentication failed{}: {message}", format_context(.context))]
    Auth { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// A wrapper for underlying `SurrealDB` engine errors.
    #[error("SurrealDB error{}: {source}", format_context(.context))]
    Surreal {
        #[source]
        source: surrealdb::Error,
        context: Option<Cow<'static, str>>,
    },

    /// A stored body that is not a JSON object, or a document that cannot be encoded.
    #[error("Document codec error{}: {source}", format_context(.context))]
    Codec {
        #[source]
        source: serde_json::Error,
        context: Option<Cow<'static, str>>,
    },

    /// Migration failures or invariant violations.
    #[error("Migration error{}: {message}", format_context(.context))]
    Migration { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Document {collection}/{id} not found{}", format_context(.context))]
    NotFound { collection: &'static str, id: String, context: Option<Cow<'static, str>> },

    #[error("Document {collection}/{id} already exists{}", format_context(.context))]
    AlreadyExists { collection: &'static str, id: String, context: Option<Cow<'static, str>> },

    /// The store refused the operation for the caller's access rules.
    #[error("Permission denied on '{collection}'{}", format_context(.context))]
    PermissionDenied { collection: &'static str, context: Option<Cow<'static, str>> },

    /// A conditional write found the record in another status.
    #[error(
        "Document {collection}/{id} is '{actual}', expected '{expected}'{}",
        format_context(.context)
    )]
    PreconditionFailed {
        collection: &'static str,
        id: String,
        expected: String,
        actual: String,
        context: Option<Cow<'static, str>>,
    },

    /// Internal fallback for unexpected issues or logic errors.
    #[error("Internal database error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}
