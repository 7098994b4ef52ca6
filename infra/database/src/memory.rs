//! Process-local [`DocumentStore`], used by tests and `database.engine = "memory"`.

use crate::error::DatabaseError;
use crate::store::{Body, Document, DocumentStore, Filter, Precondition, check_precondition, merge};
use async_trait::async_trait;
use fxhash::{FxHashMap, FxHashSet};
use parking_lot::RwLock;
use rego_domain::constants::Collection;
use std::collections::BTreeMap;
use tracing::instrument;

#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<FxHashMap<Collection, BTreeMap<String, Body>>>,
    denied: RwLock<FxHashSet<Collection>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every operation on `collection` fail as a permission error.
    pub fn deny(&self, collection: Collection) {
        self.denied.write().insert(collection);
    }

    pub fn allow(&self, collection: Collection) {
        self.denied.write().remove(&collection);
    }

    fn guard(&self, collection: Collection) -> Result<(), DatabaseError> {
        if self.denied.read().contains(&collection) {
            return Err(DatabaseError::PermissionDenied {
                collection: collection.name(),
                context: None,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    #[instrument(level = "trace", skip(self))]
    async fn get(
        &self,
        collection: Collection,
        id: &str,
    ) -> Result<Option<Document>, DatabaseError> {
        self.guard(collection)?;
        let collections = self.collections.read();
        Ok(collections
            .get(&collection)
            .and_then(|docs| docs.get(id))
            .map(|data| Document::new(id.to_owned(), data.clone())))
    }

    #[instrument(level = "trace", skip(self))]
    async fn list(
        &self,
        collection: Collection,
        filter: &Filter,
    ) -> Result<Vec<Document>, DatabaseError> {
        self.guard(collection)?;
        let collections = self.collections.read();
        Ok(collections
            .get(&collection)
            .into_iter()
            .flat_map(BTreeMap::iter)
            .filter(|(_, data)| filter.matches(data))
            .map(|(id, data)| Document::new(id.clone(), data.clone()))
            .collect())
    }

    #[instrument(level = "trace", skip(self, data))]
    async fn create(
        &self,
        collection: Collection,
        id: &str,
        data: Body,
    ) -> Result<Document, DatabaseError> {
        self.guard(collection)?;
        let mut collections = self.collections.write();
        let docs = collections.entry(collection).or_default();
        if docs.contains_key(id) {
            return Err(DatabaseError::AlreadyExists {
                collection: collection.name(),
                id: id.to_owned(),
                context: None,
            });
        }
        docs.insert(id.to_owned(), data.clone());
        Ok(Document::new(id.to_owned(), data))
    }

    #[instrument(level = "trace", skip(self, data))]
    async fn put(
        &self,
        collection: Collection,
        id: &str,
        data: Body,
    ) -> Result<Document, DatabaseError> {
        self.guard(collection)?;
        self.collections.write().entry(collection).or_default().insert(id.to_owned(), data.clone());
        Ok(Document::new(id.to_owned(), data))
    }

    #[instrument(level = "trace", skip(self, patch))]
    async fn update(
        &self,
        collection: Collection,
        id: &str,
        patch: Body,
        precondition: Option<Precondition>,
    ) -> Result<Document, DatabaseError> {
        self.guard(collection)?;
        let mut collections = self.collections.write();
        let Some(stored) = collections.get_mut(&collection).and_then(|docs| docs.get_mut(id)) else {
            return Err(DatabaseError::NotFound {
                collection: collection.name(),
                id: id.to_owned(),
                context: None,
            });
        };
        check_precondition(collection, id, stored, precondition.as_ref())?;
        merge(stored, patch);
        Ok(Document::new(id.to_owned(), stored.clone()))
    }

    #[instrument(level = "trace", skip(self))]
    async fn delete(&self, collection: Collection, id: &str) -> Result<(), DatabaseError> {
        self.guard(collection)?;
        if let Some(docs) = self.collections.write().get_mut(&collection) {
            docs.remove(id);
        }
        Ok(())
    }
}
