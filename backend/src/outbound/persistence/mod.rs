//! PostgreSQL persistence adapter using Diesel ORM.
//!
//! Every collection lives in the single `documents` table as a JSONB body
//! keyed by `(collection, id)`. Connections come from `diesel-async` with
//! `bb8` pooling, established lazily on first use.
//!
//! # Architecture
//!
//! - **Thin adapter**: [`DieselDocumentStore`] only translates between the
//!   query vocabulary and SQL, and between rows and records.
//! - **Internal models**: Diesel row structs (`models.rs`) and schema
//!   definitions (`schema.rs`) never leave this module.
//! - **Strongly typed errors**: pool and Diesel failures map to
//!   `DocumentStoreError`.
//!
//! # Example
//!
//! ```ignore
//! use podtrack::outbound::persistence::{DieselDocumentStore, LazyDbPool, PoolConfig};
//!
//! let pool = LazyDbPool::new(PoolConfig::new("postgres://localhost/podtrack"));
//! let store = DieselDocumentStore::new(pool, tenant, clock);
//! ```

mod diesel_document_store;
mod error_mapping;
mod jsonb_query;
mod models;
mod pool;
mod schema;

pub use diesel_document_store::DieselDocumentStore;
pub use jsonb_query::{LEGACY_ID_FIELD, containment_literal};
pub use pool::{DbPool, LazyDbPool, PoolConfig, PoolError};
