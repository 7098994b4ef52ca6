//! [`DocumentStore`] over `SurrealDB`.
//!
//! Rows are `{ key, status, body }`. `body` is the JSON document as text, and
//! `status` mirrors the body's status so conditional writes can test it in SQL.

use crate::Database;
use crate::error::{DatabaseError, DatabaseErrorExt};
use crate::store::{Body, Document, DocumentStore, Filter, Precondition, check_precondition, merge};
use async_trait::async_trait;
use rego_domain::constants::Collection;
use serde_json::Value;
use surrealdb::types::SurrealValue;
use tracing::{instrument, trace};

#[derive(Debug, SurrealValue)]
struct StoredRow {
    key: String,
    status: String,
    body: String,
}

impl StoredRow {
    fn encode(id: &str, data: &Body) -> Result<Self, DatabaseError> {
        Ok(Self {
            key: id.to_owned(),
            status: data.get("status").and_then(Value::as_str).unwrap_or_default().to_owned(),
            body: serde_json::to_string(data).context("Encoding document body")?,
        })
    }

    fn decode(self) -> Result<Document, DatabaseError> {
        let data: Body = serde_json::from_str(&self.body)
            .context(format!("Decoding stored body of '{}'", self.key))?;
        Ok(Document::new(self.key, data))
    }
}

/// Maps access-rule rejections to [`DatabaseError::PermissionDenied`].
fn store_error(
    collection: Collection,
    context: &'static str,
) -> impl FnOnce(surrealdb::Error) -> DatabaseError {
    move |source| {
        let message = source.to_string().to_lowercase();
        if message.contains("permission") || message.contains("not allowed") {
            DatabaseError::PermissionDenied {
                collection: collection.name(),
                context: Some(context.into()),
            }
        } else {
            DatabaseError::Surreal { source, context: Some(context.into()) }
        }
    }
}

impl Database {
    async fn fetch_rows(
        &self,
        collection: Collection,
        sql: String,
        binds: Vec<(&'static str, String)>,
    ) -> Result<Vec<StoredRow>, DatabaseError> {
        let mut query = self.query(sql);
        for bind in binds {
            query = query.bind(bind);
        }
        query
            .await
            .map_err(store_error(collection, "Reading documents"))?
            .check()
            .map_err(surrealdb::Error::from)
            .map_err(store_error(collection, "Reading documents"))?
            .take::<Vec<StoredRow>>(0)
            .map_err(store_error(collection, "Parsing documents"))
    }

    async fn write_row(
        &self,
        collection: Collection,
        sql: String,
        row: StoredRow,
        context: &'static str,
    ) -> Result<(), DatabaseError> {
        self.query(sql)
            .bind(("key", row.key))
            .bind(("status", row.status))
            .bind(("body", row.body))
            .await
            .map_err(store_error(collection, context))?
            .check()
            .map_err(surrealdb::Error::from)
            .map_err(store_error(collection, context))?;
        Ok(())
    }

    async fn write_if_status(
        &self,
        collection: Collection,
        row: StoredRow,
        expected: String,
    ) -> Result<bool, DatabaseError> {
        let table = collection.name();
        let sql = format!(
            "LET $hit = (UPDATE {table} SET status = $status, body = $body \
             WHERE key = $key AND status = $expected RETURN VALUE key);
             RETURN array::len($hit);"
        );
        let hits = self
            .query(sql)
            .bind(("key", row.key))
            .bind(("status", row.status))
            .bind(("body", row.body))
            .bind(("expected", expected))
            .await
            .map_err(store_error(collection, "Conditional update"))?
            .check()
            .map_err(surrealdb::Error::from)
            .map_err(store_error(collection, "Conditional update"))?
            .take::<Option<i64>>(1)
            .map_err(store_error(collection, "Reading conditional update result"))?;
        Ok(hits.unwrap_or_default() > 0)
    }
}

#[async_trait]
impl DocumentStore for Database {
    #[instrument(skip(self), err)]
    async fn get(
        &self,
        collection: Collection,
        id: &str,
    ) -> Result<Option<Document>, DatabaseError> {
        let table = collection.name();
        let rows = self
            .fetch_rows(
                collection,
                format!("SELECT key, status, body FROM {table} WHERE key = $key LIMIT 1"),
                vec![("key", id.to_owned())],
            )
            .await?;
        rows.into_iter().next().map(StoredRow::decode).transpose()
    }

    #[instrument(skip(self), err)]
    async fn list(
        &self,
        collection: Collection,
        filter: &Filter,
    ) -> Result<Vec<Document>, DatabaseError> {
        let table = collection.name();
        let rows = match filter.status() {
            Some(status) => {
                self.fetch_rows(
                    collection,
                    format!(
                        "SELECT key, status, body FROM {table} WHERE status = $status ORDER BY key"
                    ),
                    vec![("status", status.to_owned())],
                )
                .await?
            }
            None => {
                self.fetch_rows(
                    collection,
                    format!("SELECT key, status, body FROM {table} ORDER BY key"),
                    Vec::new(),
                )
                .await?
            }
        };
        trace!(collection = table, rows = rows.len(), "Fetched rows");

        let mut documents = Vec::with_capacity(rows.len());
        for row in rows {
            let document = row.decode()?;
            if filter.matches(&document.data) {
                documents.push(document);
            }
        }
        Ok(documents)
    }

    #[instrument(skip(self, data), err)]
    async fn create(
        &self,
        collection: Collection,
        id: &str,
        data: Body,
    ) -> Result<Document, DatabaseError> {
        if self.get(collection, id).await?.is_some() {
            return Err(DatabaseError::AlreadyExists {
                collection: collection.name(),
                id: id.to_owned(),
                context: None,
            });
        }
        let table = collection.name();
        let row = StoredRow::encode(id, &data)?;
        self.write_row(
            collection,
            format!("CREATE {table} CONTENT {{ key: $key, status: $status, body: $body }}"),
            row,
            "Creating document",
        )
        .await?;
        Ok(Document::new(id.to_owned(), data))
    }

    #[instrument(skip(self, data), err)]
    async fn put(
        &self,
        collection: Collection,
        id: &str,
        data: Body,
    ) -> Result<Document, DatabaseError> {
        let table = collection.name();
        let row = StoredRow::encode(id, &data)?;
        let sql = if self.get(collection, id).await?.is_some() {
            format!("UPDATE {table} SET status = $status, body = $body WHERE key = $key")
        } else {
            format!("CREATE {table} CONTENT {{ key: $key, status: $status, body: $body }}")
        };
        self.write_row(collection, sql, row, "Replacing document").await?;
        Ok(Document::new(id.to_owned(), data))
    }

    #[instrument(skip(self, patch), err)]
    async fn update(
        &self,
        collection: Collection,
        id: &str,
        patch: Body,
        precondition: Option<Precondition>,
    ) -> Result<Document, DatabaseError> {
        let Some(Document { data: mut body, .. }) = self.get(collection, id).await? else {
            return Err(DatabaseError::NotFound {
                collection: collection.name(),
                id: id.to_owned(),
                context: None,
            });
        };
        check_precondition(collection, id, &body, precondition.as_ref())?;
        merge(&mut body, patch);
        let row = StoredRow::encode(id, &body)?;

        match precondition {
            Some(Precondition::StatusIs(expected)) => {
                if !self.write_if_status(collection, row, expected.clone()).await? {
                    let actual = self
                        .get(collection, id)
                        .await?
                        .and_then(|doc| doc.status().map(str::to_owned))
                        .unwrap_or_default();
                    return Err(DatabaseError::PreconditionFailed {
                        collection: collection.name(),
                        id: id.to_owned(),
                        expected,
                        actual,
                        context: Some("Status changed during write".into()),
                    });
                }
            }
            None => {
                let table = collection.name();
                self.write_row(
                    collection,
                    format!("UPDATE {table} SET status = $status, body = $body WHERE key = $key"),
                    row,
                    "Updating document",
                )
                .await?;
            }
        }
        Ok(Document::new(id.to_owned(), body))
    }

    #[instrument(skip(self), err)]
    async fn delete(&self, collection: Collection, id: &str) -> Result<(), DatabaseError> {
        let table = collection.name();
        self.query(format!("DELETE {table} WHERE key = $key"))
            .bind(("key", id.to_owned()))
            .await
            .map_err(store_error(collection, "Deleting document"))?
            .check()
            .map_err(surrealdb::Error::from)
            .map_err(store_error(collection, "Deleting document"))?;
        trace!(collection = table, %id, "Document deleted");
        Ok(())
    }
}
