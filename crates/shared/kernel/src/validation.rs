//! Field-level validation results for request payloads.

use rego_derive::api_model;
use std::fmt;

#[api_model]
#[derive(Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Dotted path of the offending field, e.g. `owners[1].name`.
    pub field: String,
    pub message: String,
}

/// Accumulates every problem in a payload before failing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(Vec<FieldError>);

impl FieldErrors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.push(FieldError { field: field.into(), message: message.into() });
    }

    /// Records `message` against `field` unless `ok` holds.
    pub fn check(&mut self, ok: bool, field: impl Into<String>, message: impl Into<String>) {
        if !ok {
            self.push(field, message);
        }
    }

    /// Records a "required" error when `value` is missing or blank.
    pub fn require(&mut self, value: Option<&str>, field: impl Into<String>) {
        self.check(value.is_some_and(|v| !v.trim().is_empty()), field, "is required");
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[FieldError] {
        &self.0
    }

    /// `Ok(())` when nothing was recorded.
    pub fn finish(self) -> Result<(), crate::ServiceError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(crate::ServiceError::Validation { fields: self, context: None })
        }
    }

    /// Single-field shorthand.
    #[must_use]
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> crate::ServiceError {
        let mut errors = Self::new();
        errors.push(field, message);
        crate::ServiceError::Validation { fields: errors, context: None }
    }
}

/// Trimmed `value`, or a "required" error against `field` when it is blank.
pub fn required(value: &str, field: &str) -> Result<String, crate::ServiceError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(FieldErrors::single(field, "is required"));
    }
    Ok(trimmed.to_owned())
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{} {}", error.field, error.message)?;
        }
        Ok(())
    }
}

impl IntoIterator for FieldErrors {
    type Item = FieldError;
    type IntoIter = std::vec::IntoIter<FieldError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
