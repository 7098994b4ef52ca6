use rego_domain::constants::Collection;
use std::borrow::Cow;

#[rego_derive::rego_error]
pub enum ResourceGuardError {
    #[error("Resource validation error{}: {message}", format_context(.context))]
    Validation { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

/// Validation of record ids arriving from callers.
#[derive(Debug)]
pub struct ResourceGuard;

impl ResourceGuard {
    /// Validates an id against the collection it is used with and returns the bare id.
    ///
    /// Accepts `abc` or `registrations/abc` for [`Collection::Registrations`]. Rejects a
    /// pointer into another collection (`users/abc` on a registrations endpoint), empty
    /// ids, and ids with further path segments.
    ///
    /// # Errors
    /// Returns an error if the id is empty, malformed, or names another collection.
    pub fn verify<I>(id: I, expected: Collection) -> Result<String, ResourceGuardError>
    where
        I: AsRef<str>,
    {
        let id_ref = id.as_ref().trim();
        let bare = match id_ref.split_once('/') {
            Some((collection, rest)) => {
                if collection != expected.name() {
                    return Err(ResourceGuardError::Validation {
                        message: format!("Expected '{}', got '{collection}'", expected.name())
                            .into(),
                        context: Some("ID collection mismatch".into()),
                    });
                }
                rest
            }
            None => id_ref,
        };

        if bare.is_empty() || bare.contains('/') {
            return Err(ResourceGuardError::Validation {
                message: format!("Malformed id '{id_ref}'").into(),
                context: None,
            });
        }
        Ok(bare.to_owned())
    }
}

impl From<ResourceGuardError> for crate::ServiceError {
    fn from(err: ResourceGuardError) -> Self {
        let mut fields = crate::validation::FieldErrors::new();
        fields.push("id", err.to_string());
        Self::Validation { fields, context: None }
    }
}
