//! PostgreSQL-backed `DocumentStore` implementation using Diesel ORM.
//!
//! Records of every collection share the `documents` table. Deliveries are
//! scoped to the tenant: every query gains `city = <tenant>` and created
//! deliveries are stamped with it. User records are global.
//!
//! Every backend error is returned to the caller unchanged; fallback is the
//! caller's concern.

use std::sync::Arc;

use async_trait::async_trait;
use diesel::dsl::sql;
use diesel::prelude::*;
use diesel::sql_types::Jsonb;
use diesel_async::RunQueryDsl;
use mockable::Clock;
use serde_json::Value;
use uuid::Uuid;

use crate::domain::ports::{DocumentStore, DocumentStoreError};
use crate::domain::{
    Fields, Patch, Query, Record, RecordId, TENANT_FIELD, Tenant, is_tenant_partitioned,
};

use super::error_mapping::{map_diesel_error, map_pool_error};
use super::jsonb_query::{DocumentPredicate, legacy_id_predicate, translate};
use super::models::{DocumentRow, NewDocumentRow};
use super::pool::LazyDbPool;
use super::schema::documents;

/// Diesel-backed document store for one tenant.
///
/// Cheap to construct: every tenant handle shares the same lazy pool.
#[derive(Clone)]
pub struct DieselDocumentStore {
    pool: LazyDbPool,
    tenant: Tenant,
    clock: Arc<dyn Clock>,
}

impl DieselDocumentStore {
    /// Create a store for `tenant` over `pool`.
    pub fn new(pool: LazyDbPool, tenant: Tenant, clock: Arc<dyn Clock>) -> Self {
        Self {
            pool,
            tenant,
            clock,
        }
    }

    fn scoped(&self, collection: &str, query: &Query) -> Query {
        if is_tenant_partitioned(collection) {
            query.clone().equals(TENANT_FIELD, self.tenant.as_str())
        } else {
            query.clone()
        }
    }

    async fn first_id(
        &self,
        collection: &str,
        query: &Query,
    ) -> Result<Option<Uuid>, DocumentStoreError> {
        let pool = self.pool.get().await.map_err(map_pool_error)?;
        let mut conn = pool.get().await.map_err(map_pool_error)?;
        documents::table
            .filter(documents::collection.eq(collection))
            .filter(translate(&self.scoped(collection, query)))
            .order((documents::created_at.asc(), documents::id.asc()))
            .select(documents::id)
            .first::<Uuid>(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)
    }

    async fn first_row(
        &self,
        collection: &str,
        predicate: DocumentPredicate,
    ) -> Result<Option<Record>, DocumentStoreError> {
        let scope = translate(&self.scoped(collection, &Query::new()));
        let pool = self.pool.get().await.map_err(map_pool_error)?;
        let mut conn = pool.get().await.map_err(map_pool_error)?;
        documents::table
            .filter(documents::collection.eq(collection))
            .filter(scope)
            .filter(predicate)
            .order((documents::created_at.asc(), documents::id.asc()))
            .select(DocumentRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map(|row| row.map(Record::from))
            .map_err(map_diesel_error)
    }
}

#[async_trait]
impl DocumentStore for DieselDocumentStore {
    async fn find(
        &self,
        collection: &str,
        query: &Query,
    ) -> Result<Vec<Record>, DocumentStoreError> {
        let pool = self.pool.get().await.map_err(map_pool_error)?;
        let mut conn = pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<DocumentRow> = documents::table
            .filter(documents::collection.eq(collection))
            .filter(translate(&self.scoped(collection, query)))
            .order((documents::created_at.asc(), documents::id.asc()))
            .select(DocumentRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(rows.into_iter().map(Record::from).collect())
    }

    async fn find_one(
        &self,
        collection: &str,
        query: &Query,
    ) -> Result<Option<Record>, DocumentStoreError> {
        self.first_row(collection, translate(query)).await
    }

    async fn find_by_id(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<Record>, DocumentStoreError> {
        if let Ok(uuid) = Uuid::parse_str(id) {
            let found = self
                .first_row(collection, Box::new(documents::id.eq(uuid)))
                .await?;
            if found.is_some() {
                return Ok(found);
            }
        }
        self.first_row(collection, legacy_id_predicate(id)).await
    }

    async fn create(
        &self,
        collection: &str,
        mut fields: Fields,
    ) -> Result<Record, DocumentStoreError> {
        if is_tenant_partitioned(collection) {
            fields.insert(TENANT_FIELD.to_owned(), Value::from(self.tenant.as_str()));
        }
        let now = self.clock.utc();
        let id = Uuid::new_v4();
        let draft = Record::new(RecordId::from(id.to_string()), fields, now);
        let row = NewDocumentRow {
            collection,
            id,
            body: Value::Object(draft.fields().clone()),
            created_at: now,
            updated_at: now,
        };

        let pool = self.pool.get().await.map_err(map_pool_error)?;
        let mut conn = pool.get().await.map_err(map_pool_error)?;
        diesel::insert_into(documents::table)
            .values(row)
            .returning(DocumentRow::as_returning())
            .get_result(&mut conn)
            .await
            .map(Record::from)
            .map_err(map_diesel_error)
    }

    async fn update_one(
        &self,
        collection: &str,
        query: &Query,
        patch: &Patch,
    ) -> Result<Option<Record>, DocumentStoreError> {
        let Some(id) = self.first_id(collection, query).await? else {
            return Ok(None);
        };
        let patch = if is_tenant_partitioned(collection) {
            patch.without_field(TENANT_FIELD)
        } else {
            patch.clone()
        };
        let merge = Value::Object(patch.fields().clone());

        let pool = self.pool.get().await.map_err(map_pool_error)?;
        let mut conn = pool.get().await.map_err(map_pool_error)?;
        diesel::update(
            documents::table
                .filter(documents::collection.eq(collection))
                .filter(documents::id.eq(id)),
        )
        .set((
            documents::body.eq(sql::<Jsonb>("body || ").bind::<Jsonb, _>(merge)),
            documents::updated_at.eq(self.clock.utc()),
        ))
        .returning(DocumentRow::as_returning())
        .get_result(&mut conn)
        .await
        .optional()
        .map(|row| row.map(Record::from))
        .map_err(map_diesel_error)
    }

    async fn delete_one(
        &self,
        collection: &str,
        query: &Query,
    ) -> Result<bool, DocumentStoreError> {
        let Some(id) = self.first_id(collection, query).await? else {
            return Ok(false);
        };
        let pool = self.pool.get().await.map_err(map_pool_error)?;
        let mut conn = pool.get().await.map_err(map_pool_error)?;
        let removed = diesel::delete(
            documents::table
                .filter(documents::collection.eq(collection))
                .filter(documents::id.eq(id)),
        )
        .execute(&mut conn)
        .await
        .map_err(map_diesel_error)?;
        Ok(removed > 0)
    }
}
