//! Port for removing stored document files after a delivery is deleted.
use async_trait::async_trait;

use super::define_port_error;

define_port_error! {
    /// Errors raised by blob cleanup adapters.
    pub enum BlobCleanupError {
        /// The referenced blob could not be removed.
        Removal { reference: String, message: String } =>
            "failed to remove blob {reference}: {message}",
    }
}

/// Removes externally stored files by reference.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BlobCleanup: Send + Sync {
    /// Remove the blob stored under `reference`.
    async fn remove(&self, reference: &str) -> Result<(), BlobCleanupError>;
}
