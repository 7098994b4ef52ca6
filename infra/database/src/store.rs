//! The document-store seam every feature crate talks to.

use crate::error::DatabaseError;
use async_trait::async_trait;
use rego_domain::constants::Collection;
use serde_json::{Map, Value};
use std::fmt::Debug;
use std::sync::Arc;

/// JSON object body of a stored document.
pub type Body = Map<String, Value>;

/// A document as read from a collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub data: Body,
}

impl Document {
    #[must_use]
    pub const fn new(id: String, data: Body) -> Self {
        Self { id, data }
    }

    /// The document's `status` field, if it is a string.
    #[must_use]
    pub fn status(&self) -> Option<&str> {
        self.data.get("status").and_then(Value::as_str)
    }
}

/// Condition a write must meet against the stored document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Precondition {
    /// The stored `status` must still equal this value.
    StatusIs(String),
}

/// Top-level field equality filter. An empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    equals: Vec<(String, Value)>,
}

impl Filter {
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.equals.push((field.into(), value.into()));
        self
    }

    /// Value the filter pins `status` to, used by backends that index it.
    #[must_use]
    pub fn status(&self) -> Option<&str> {
        self.equals.iter().find(|(field, _)| field == "status").and_then(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn matches(&self, body: &Body) -> bool {
        self.equals.iter().all(|(field, value)| body.get(field) == Some(value))
    }
}

/// Persistence seam for record collections.
///
/// Writes to a single document are atomic. There are no multi-document transactions.
#[async_trait]
pub trait DocumentStore: Debug + Send + Sync {
    async fn get(
        &self,
        collection: Collection,
        id: &str,
    ) -> Result<Option<Document>, DatabaseError>;

    /// Documents matching `filter`, ordered by id.
    async fn list(
        &self,
        collection: Collection,
        filter: &Filter,
    ) -> Result<Vec<Document>, DatabaseError>;

    /// Inserts a new document. Fails with [`DatabaseError::AlreadyExists`] if the id is taken.
    async fn create(
        &self,
        collection: Collection,
        id: &str,
        data: Body,
    ) -> Result<Document, DatabaseError>;

    /// Inserts or fully replaces a document.
    async fn put(&self, collection: Collection, id: &str, data: Body)
    -> Result<Document, DatabaseError>;

    /// Merges `patch` into the stored body at the top level. A `null` in the
    /// patch removes the field.
    ///
    /// With a precondition the merge is written only if it still holds,
    /// otherwise [`DatabaseError::PreconditionFailed`] is returned.
    async fn update(
        &self,
        collection: Collection,
        id: &str,
        patch: Body,
        precondition: Option<Precondition>,
    ) -> Result<Document, DatabaseError>;

    /// Removes a document. Removing a missing document is not an error.
    async fn delete(&self, collection: Collection, id: &str) -> Result<(), DatabaseError>;
}

/// Shared handle to whichever backend was configured.
pub type SharedStore = Arc<dyn DocumentStore>;

/// Applies a merge patch to `body` in place.
pub fn merge(body: &mut Body, patch: Body) {
    for (key, value) in patch {
        if value.is_null() {
            body.remove(&key);
        } else {
            body.insert(key, value);
        }
    }
}

pub(crate) fn check_precondition(
    collection: Collection,
    id: &str,
    body: &Body,
    precondition: Option<&Precondition>,
) -> Result<(), DatabaseError> {
    let Some(Precondition::StatusIs(expected)) = precondition else {
        return Ok(());
    };
    let actual = body.get("status").and_then(Value::as_str).unwrap_or_default();
    if actual == expected {
        return Ok(());
    }
    Err(DatabaseError::PreconditionFailed {
        collection: collection.name(),
        id: id.to_owned(),
        expected: expected.clone(),
        actual: actual.to_owned(),
        context: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body(value: Value) -> Body {
        match value {
            Value::Object(map) => map,
            _ => Body::new(),
        }
    }

    #[test]
    fn merge_replaces_and_removes_top_level_fields() {
        let mut stored = body(json!({ "status": "Draft", "notes": "x", "craft": { "name": "A" } }));
        merge(
            &mut stored,
            body(json!({ "status": "Submitted", "notes": null, "craft": { "make": "B" } })),
        );

        assert_eq!(
            Value::Object(stored),
            json!({ "status": "Submitted", "craft": { "make": "B" } })
        );
    }

    #[test]
    fn filter_matches_on_every_pinned_field() {
        let doc = body(json!({ "status": "Approved", "inspectorRef": "u1" }));
        assert!(Filter::all().matches(&doc));
        assert!(Filter::all().eq("status", "Approved").matches(&doc));
        assert!(!Filter::all().eq("status", "Approved").eq("inspectorRef", "u2").matches(&doc));
        assert_eq!(Filter::all().eq("status", "Approved").status(), Some("Approved"));
    }

    #[test]
    fn precondition_reports_actual_status() {
        let doc = body(json!({ "status": "Approved" }));
        let err = check_precondition(
            Collection::Infringements,
            "inf-1",
            &doc,
            Some(&Precondition::StatusIs("PendingReview".to_owned())),
        )
        .unwrap_err();

        assert_eq!(err.kind(), "precondition_failed");
        assert!(err.to_string().contains("is 'Approved', expected 'PendingReview'"));
    }
}
