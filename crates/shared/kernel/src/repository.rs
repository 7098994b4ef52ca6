//! Typed access to record collections and the single write path for guarded actions.

use crate::audit;
use crate::context::RequestContext;
use crate::lifecycle::Step;
use crate::{ServiceError, safe_nanoid, time};
use chrono::{DateTime, Utc};
use rego_database::{Body, Document, DocumentStore, Filter, Precondition, SharedStore};
use rego_domain::config::WriteMode;
use rego_domain::constants::Collection;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt::Display;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// A record decoded from its document, with the document id alongside.
#[derive(Debug, Clone)]
pub struct Stored<T> {
    pub id: String,
    pub record: T,
}

#[derive(Debug, Clone)]
pub struct Repository {
    store: SharedStore,
    write_mode: WriteMode,
}

impl Repository {
    #[must_use]
    pub const fn new(store: SharedStore, write_mode: WriteMode) -> Self {
        Self { store, write_mode }
    }

    #[must_use]
    pub fn store(&self) -> &dyn DocumentStore {
        self.store.as_ref()
    }

    #[must_use]
    pub fn shared_store(&self) -> SharedStore {
        Arc::clone(&self.store)
    }

    #[must_use]
    pub const fn write_mode(&self) -> WriteMode {
        self.write_mode
    }

    #[instrument(skip(self), fields(collection = collection.name()), err)]
    pub async fn fetch<T: DeserializeOwned>(
        &self,
        collection: Collection,
        id: &str,
    ) -> Result<Stored<T>, ServiceError> {
        let doc = self
            .store
            .get(collection, id)
            .await?
            .ok_or_else(|| ServiceError::not_found(collection.name(), id))?;
        decode(collection, doc)
    }

    /// Documents that fail to decode are logged and left out of the result.
    #[instrument(skip(self), fields(collection = collection.name()), err)]
    pub async fn list<T: DeserializeOwned>(
        &self,
        collection: Collection,
        filter: &Filter,
    ) -> Result<Vec<Stored<T>>, ServiceError> {
        let docs = self.store.list(collection, filter).await?;
        Ok(docs
            .into_iter()
            .filter_map(|doc| {
                let id = doc.id.clone();
                decode(collection, doc)
                    .inspect_err(|error| {
                        warn!(
                            collection = collection.name(),
                            %id,
                            %error,
                            "Skipping undecodable record"
                        );
                    })
                    .ok()
            })
            .collect())
    }

    /// Creates a record under a fresh id, with audit fields stamped.
    #[instrument(
        skip(self, ctx, body),
        fields(collection = collection.name(), user = ctx.user_id()),
        err
    )]
    pub async fn insert(
        &self,
        collection: Collection,
        ctx: &RequestContext,
        mut body: Body,
    ) -> Result<Document, ServiceError> {
        let id = safe_nanoid!();
        audit::stamp_created(&mut body, ctx, time::now());
        let doc = self.store.create(collection, &id, body).await?;
        info!(collection = collection.name(), %id, "Record created");
        Ok(doc)
    }

    /// Writes an approved step.
    ///
    /// The patch gains the new status (for transitions) and the last-updated
    /// pair. Under [`WriteMode::CompareStatus`] the write only lands if the
    /// stored status still equals `step.from`.
    #[instrument(
        skip(self, ctx, step, patch),
        fields(collection = collection.name(), role = %ctx.role(), from = %step.from),
        err
    )]
    pub async fn apply<S: Display + Copy>(
        &self,
        collection: Collection,
        id: &str,
        ctx: &RequestContext,
        step: &Step<S>,
        at: DateTime<Utc>,
        mut patch: Body,
    ) -> Result<Document, ServiceError> {
        if let Some(to) = step.to {
            patch.insert("status".to_owned(), Value::String(to.to_string()));
        }
        audit::stamp_updated(&mut patch, ctx, at);

        let precondition = match self.write_mode {
            WriteMode::LastWriteWins => None,
            WriteMode::CompareStatus => Some(Precondition::StatusIs(step.from.to_string())),
        };
        let doc = self.store.update(collection, id, patch, precondition).await?;
        info!(
            collection = collection.name(),
            %id,
            from = %step.from,
            to = %step.target(),
            "Record written"
        );
        Ok(doc)
    }

    /// Unguarded full replace, for collections outside any lifecycle.
    #[instrument(skip(self, body), fields(collection = collection.name()), err)]
    pub async fn put(
        &self,
        collection: Collection,
        id: &str,
        body: Body,
    ) -> Result<Document, ServiceError> {
        Ok(self.store.put(collection, id, body).await?)
    }

    /// Unguarded merge, for collections outside any lifecycle.
    #[instrument(skip(self, patch), fields(collection = collection.name()), err)]
    pub async fn patch(
        &self,
        collection: Collection,
        id: &str,
        patch: Body,
    ) -> Result<Document, ServiceError> {
        Ok(self.store.update(collection, id, patch, None).await?)
    }
}

/// Decodes a document into its record type.
pub fn decode<T: DeserializeOwned>(
    collection: Collection,
    doc: Document,
) -> Result<Stored<T>, ServiceError> {
    let record = serde_json::from_value(Value::Object(doc.data)).map_err(|source| {
        ServiceError::Codec {
            source,
            context: Some(format!("Decoding {}/{}", collection.name(), doc.id).into()),
        }
    })?;
    Ok(Stored { id: doc.id, record })
}

/// Encodes a payload struct into a document body or patch.
pub fn to_body<T: Serialize>(value: &T) -> Result<Body, ServiceError> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(ServiceError::Internal {
            message: format!("Expected an object body, got {other}").into(),
            context: None,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Principal;
    use crate::lifecycle::Step;
    use rego_database::MemoryStore;
    use rego_domain::roles::Role;
    use rego_domain::status::InfringementStatus;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Notice {
        status: InfringementStatus,
    }

    fn ctx() -> RequestContext {
        RequestContext::new(Principal {
            user_id: "sup".into(),
            display_name: "Sup".into(),
            role: Role::Supervisor,
        })
    }

    fn pending_review() -> Step<InfringementStatus> {
        Step { from: InfringementStatus::PendingReview, to: Some(InfringementStatus::Approved) }
    }

    async fn seeded(mode: WriteMode) -> (Repository, String) {
        let repo = Repository::new(Arc::new(MemoryStore::new()), mode);
        let mut body = Body::new();
        body.insert("status".into(), json!("PendingReview"));
        let doc = repo.insert(Collection::Infringements, &ctx(), body).await.unwrap();
        (repo, doc.id)
    }

    #[tokio::test]
    async fn apply_writes_status_and_audit() {
        let (repo, id) = seeded(WriteMode::LastWriteWins).await;
        let doc = repo
            .apply(
                Collection::Infringements,
                &id,
                &ctx(),
                &pending_review(),
                time::now(),
                Body::new(),
            )
            .await
            .unwrap();

        assert_eq!(doc.status(), Some("Approved"));
        assert_eq!(doc.data["lastUpdatedByRef"], json!({ "$ref": "users/sup" }));
        let stored: Stored<Notice> = repo.fetch(Collection::Infringements, &id).await.unwrap();
        assert_eq!(stored.record.status, InfringementStatus::Approved);
    }

    #[tokio::test]
    async fn last_write_wins_lets_a_stale_step_through() {
        let (repo, id) = seeded(WriteMode::LastWriteWins).await;
        for _ in 0..2 {
            let written = repo
                .apply(
                    Collection::Infringements,
                    &id,
                    &ctx(),
                    &pending_review(),
                    time::now(),
                    Body::new(),
                )
                .await;
            assert!(written.is_ok());
        }
    }

    #[tokio::test]
    async fn compare_status_rejects_a_stale_step() {
        let (repo, id) = seeded(WriteMode::CompareStatus).await;
        repo.apply(
            Collection::Infringements,
            &id,
            &ctx(),
            &pending_review(),
            time::now(),
            Body::new(),
        )
            .await
            .unwrap();
        let err = repo
            .apply(
                Collection::Infringements,
                &id,
                &ctx(),
                &pending_review(),
                time::now(),
                Body::new(),
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ServiceError::Store {
                source: rego_database::DatabaseError::PreconditionFailed { .. },
                ..
            }
        ));
    }

    #[tokio::test]
    async fn missing_record_is_not_found() {
        let repo = Repository::new(Arc::new(MemoryStore::new()), WriteMode::default());
        let err = repo.fetch::<Notice>(Collection::Infringements, "nope").await.unwrap_err();
        assert_eq!(err.to_string(), "infringements/nope not found");
    }

    #[tokio::test]
    async fn undecodable_record_is_a_codec_error() {
        let repo = Repository::new(Arc::new(MemoryStore::new()), WriteMode::default());
        let mut body = Body::new();
        body.insert("status".into(), json!("Lost"));
        let doc = repo.insert(Collection::Infringements, &ctx(), body).await.unwrap();

        let err = repo.fetch::<Notice>(Collection::Infringements, &doc.id).await.unwrap_err();
        assert_eq!(err.kind(), "codec");
    }

    #[tokio::test]
    async fn list_leaves_out_undecodable_records() {
        let (repo, good) = seeded(WriteMode::default()).await;
        let mut body = Body::new();
        body.insert("status".into(), json!("Lost"));
        repo.insert(Collection::Infringements, &ctx(), body).await.unwrap();

        let listed = repo.list::<Notice>(Collection::Infringements, &Filter::all()).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, good);
    }
}
