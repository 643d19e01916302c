//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! - **file_store**: per-tenant JSON file, the always-available store
//! - **persistence**: PostgreSQL JSONB documents through Diesel
//! - **fallback**: decorator retrying failed database calls on the file store
//! - **registry**: per-tenant store handles chosen by [`BackendMode`]
//! - **blob_cleanup**: removal of stored document files
//!
//! Adapters are thin translators between domain types and infrastructure
//! representations. They contain no business logic.

pub mod blob_cleanup;
pub mod fallback;
pub mod file_store;
pub mod persistence;
pub mod registry;

pub use blob_cleanup::LoggingBlobCleanup;
pub use fallback::FallbackDocumentStore;
pub use file_store::FileDocumentStore;
pub use registry::{BackendMode, StoreRegistry};
