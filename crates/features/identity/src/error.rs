use rego_kernel::ServiceError;
use std::borrow::Cow;

#[rego_derive::rego_error]
pub enum IdentityError {
    #[error("Token error{}: {source}", format_context(.context))]
    Token { source: jsonwebtoken::errors::Error, context: Option<Cow<'static, str>> },

    #[error("Invalid identity configuration{}: {message}", format_context(.context))]
    InvalidConfiguration { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Internal identity error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

impl From<IdentityError> for ServiceError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::Token { .. } => Self::unauthenticated(err.to_string()),
            IdentityError::InvalidConfiguration { .. } | IdentityError::Internal { .. } => {
                Self::Internal { message: err.to_string().into(), context: None }
            }
        }
    }
}
