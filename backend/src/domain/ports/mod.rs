//! Domain ports and supporting types for the hexagonal boundary.

mod macros;
pub(crate) use macros::define_port_error;

mod blob_cleanup;
mod document_store;
mod store_provider;

#[cfg(test)]
pub use blob_cleanup::MockBlobCleanup;
pub use blob_cleanup::{BlobCleanup, BlobCleanupError};
#[cfg(test)]
pub use document_store::MockDocumentStore;
pub use document_store::{DocumentStore, DocumentStoreError};
#[cfg(test)]
pub use store_provider::MockStoreProvider;
pub use store_provider::StoreProvider;
