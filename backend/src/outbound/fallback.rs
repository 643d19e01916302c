//! Decorator retrying failed primary calls on the tenant's file store.
//!
//! Any primary error is logged at `warn` and the same logical operation is
//! replayed once against the fallback with the tenant field stripped from
//! the query (through every `Or`) and from the payload; the file already
//! belongs to one tenant. A fallback failure propagates.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use crate::domain::ports::{DocumentStore, DocumentStoreError};
use crate::domain::{Fields, Patch, Query, Record, TENANT_FIELD};

/// Primary store with a single fallback attempt per operation.
pub struct FallbackDocumentStore {
    primary: Arc<dyn DocumentStore>,
    fallback: Arc<dyn DocumentStore>,
}

impl FallbackDocumentStore {
    /// Wrap `primary`, falling back to `fallback` on error.
    pub fn new(primary: Arc<dyn DocumentStore>, fallback: Arc<dyn DocumentStore>) -> Self {
        Self { primary, fallback }
    }

    /// Await `primary`; on error, build and await the fallback call.
    async fn attempt<T, P, F, Fut>(
        &self,
        operation: &'static str,
        collection: &str,
        primary: P,
        fallback: F,
    ) -> Result<T, DocumentStoreError>
    where
        P: Future<Output = Result<T, DocumentStoreError>> + Send,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<T, DocumentStoreError>> + Send,
    {
        match primary.await {
            Ok(value) => Ok(value),
            Err(err) => {
                warn!(
                    operation,
                    collection,
                    error = %err,
                    "document database unavailable; using file store"
                );
                fallback().await
            }
        }
    }
}

fn untenanted(query: &Query) -> Query {
    query.without_field(TENANT_FIELD)
}

#[async_trait]
impl DocumentStore for FallbackDocumentStore {
    async fn find(
        &self,
        collection: &str,
        query: &Query,
    ) -> Result<Vec<Record>, DocumentStoreError> {
        let stripped = untenanted(query);
        self.attempt(
            "find",
            collection,
            self.primary.find(collection, query),
            || self.fallback.find(collection, &stripped),
        )
        .await
    }

    async fn find_one(
        &self,
        collection: &str,
        query: &Query,
    ) -> Result<Option<Record>, DocumentStoreError> {
        let stripped = untenanted(query);
        self.attempt(
            "find_one",
            collection,
            self.primary.find_one(collection, query),
            || self.fallback.find_one(collection, &stripped),
        )
        .await
    }

    async fn find_by_id(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<Record>, DocumentStoreError> {
        self.attempt(
            "find_by_id",
            collection,
            self.primary.find_by_id(collection, id),
            || self.fallback.find_by_id(collection, id),
        )
        .await
    }

    async fn create(
        &self,
        collection: &str,
        fields: Fields,
    ) -> Result<Record, DocumentStoreError> {
        let mut stripped = fields.clone();
        stripped.remove(TENANT_FIELD);
        self.attempt(
            "create",
            collection,
            self.primary.create(collection, fields),
            || self.fallback.create(collection, stripped),
        )
        .await
    }

    async fn update_one(
        &self,
        collection: &str,
        query: &Query,
        patch: &Patch,
    ) -> Result<Option<Record>, DocumentStoreError> {
        let stripped_query = untenanted(query);
        let stripped_patch = patch.without_field(TENANT_FIELD);
        self.attempt(
            "update_one",
            collection,
            self.primary.update_one(collection, query, patch),
            || {
                self.fallback
                    .update_one(collection, &stripped_query, &stripped_patch)
            },
        )
        .await
    }

    async fn delete_one(
        &self,
        collection: &str,
        query: &Query,
    ) -> Result<bool, DocumentStoreError> {
        let stripped = untenanted(query);
        self.attempt(
            "delete_one",
            collection,
            self.primary.delete_one(collection, query),
            || self.fallback.delete_one(collection, &stripped),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::MockDocumentStore;
    use crate::domain::{DELIVERIES, RecordId};
    use crate::test_support::fields;
    use chrono::Utc;
    use rstest::rstest;
    use serde_json::json;

    fn record(id: &str) -> Record {
        Record::new(RecordId::from(id), Fields::new(), Utc::now())
    }

    #[rstest]
    #[tokio::test]
    async fn primary_success_never_touches_the_fallback() {
        let mut primary = MockDocumentStore::new();
        primary
            .expect_find_by_id()
            .return_once(|_, _| Ok(Some(record("d-1"))));
        let mut fallback = MockDocumentStore::new();
        fallback.expect_find_by_id().never();

        let store = FallbackDocumentStore::new(Arc::new(primary), Arc::new(fallback));
        let found = store.find_by_id(DELIVERIES, "d-1").await.expect("found");
        assert_eq!(found.map(|r| r.id().to_string()), Some("d-1".to_owned()));
    }

    #[rstest]
    #[tokio::test]
    async fn failed_queries_retry_once_without_tenant_clauses() {
        let mut primary = MockDocumentStore::new();
        primary
            .expect_find()
            .times(1)
            .return_once(|_, _| Err(DocumentStoreError::connection("refused")));
        let mut fallback = MockDocumentStore::new();
        fallback
            .expect_find()
            .withf(|_, query| {
                *query
                    == Query::new().any_of(vec![Query::new().equals("status", "pending")])
            })
            .times(1)
            .return_once(|_, _| Ok(vec![record("d-1")]));

        let store = FallbackDocumentStore::new(Arc::new(primary), Arc::new(fallback));
        let query = Query::new().equals(TENANT_FIELD, "santos").any_of(vec![
            Query::new()
                .equals("status", "pending")
                .equals(TENANT_FIELD, "santos"),
        ]);
        let found = store.find(DELIVERIES, &query).await.expect("fallback");
        assert_eq!(found.len(), 1);
    }

    #[rstest]
    #[tokio::test]
    async fn payloads_lose_the_tenant_field_on_fallback() {
        let mut primary = MockDocumentStore::new();
        primary
            .expect_create()
            .return_once(|_, _| Err(DocumentStoreError::query("boom")));
        let mut fallback = MockDocumentStore::new();
        fallback
            .expect_create()
            .withf(|_, fields| !fields.contains_key(TENANT_FIELD) && fields.contains_key("status"))
            .return_once(|_, fields| Ok(Record::new(RecordId::from("f-1"), fields, Utc::now())));

        let store = FallbackDocumentStore::new(Arc::new(primary), Arc::new(fallback));
        store
            .create(DELIVERIES, fields(json!({ "status": "pending", "city": "santos" })))
            .await
            .expect("fallback create");
    }

    #[rstest]
    #[tokio::test]
    async fn fallback_failures_propagate() {
        let mut primary = MockDocumentStore::new();
        primary
            .expect_delete_one()
            .return_once(|_, _| Err(DocumentStoreError::connection("refused")));
        let mut fallback = MockDocumentStore::new();
        fallback
            .expect_delete_one()
            .times(1)
            .return_once(|_, _| Err(DocumentStoreError::persistence("disk full")));

        let store = FallbackDocumentStore::new(Arc::new(primary), Arc::new(fallback));
        let err = store
            .delete_one(DELIVERIES, &Query::by_id("d-1"))
            .await
            .expect_err("both fail");
        assert_eq!(err, DocumentStoreError::persistence("disk full"));
    }
}
