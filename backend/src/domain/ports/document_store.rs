//! Port for the uniform document store consumed by every service.
//!
//! Not-found is expressed as `None`, `false` or an empty list; errors are
//! reserved for backend failures.
use async_trait::async_trait;
use tracing::error;

use crate::domain::{Error, Fields, Patch, Query, Record};

use super::define_port_error;

define_port_error! {
    /// Backend failures raised by document store adapters.
    pub enum DocumentStoreError {
        /// The backend could not be reached.
        Connection { message: String } => "document store connection failed: {message}",
        /// A query or mutation was rejected or failed while executing.
        Query { message: String } => "document store query failed: {message}",
        /// State could not be read from or written to durable storage.
        Persistence { message: String } => "document store persistence failed: {message}",
    }
}

impl From<DocumentStoreError> for Error {
    fn from(err: DocumentStoreError) -> Self {
        error!(error = %err, "document store failure promoted to domain error");
        Self::internal(err.to_string())
    }
}

/// Collection store with a small Mongo-like query surface.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// All records in `collection` matching `query`, in insertion order.
    async fn find(&self, collection: &str, query: &Query)
    -> Result<Vec<Record>, DocumentStoreError>;

    /// First record matching `query`.
    async fn find_one(
        &self,
        collection: &str,
        query: &Query,
    ) -> Result<Option<Record>, DocumentStoreError>;

    /// Record whose identifier is `id`.
    async fn find_by_id(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<Record>, DocumentStoreError>;

    /// Store `fields` as a new record with a fresh identifier and timestamps.
    async fn create(&self, collection: &str, fields: Fields)
    -> Result<Record, DocumentStoreError>;

    /// Merge `patch` into the first match and return the updated record.
    ///
    /// Returns `None`, writing nothing, when no record matches.
    async fn update_one(
        &self,
        collection: &str,
        query: &Query,
        patch: &Patch,
    ) -> Result<Option<Record>, DocumentStoreError>;

    /// Remove the first match, reporting whether anything was removed.
    async fn delete_one(&self, collection: &str, query: &Query)
    -> Result<bool, DocumentStoreError>;
}
