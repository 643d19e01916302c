//! Default blob cleanup adapter.
//!
//! Document files are stored by an external collaborator. Until one is wired
//! in, deletions only record which references would be removed.

use async_trait::async_trait;
use tracing::info;

use crate::domain::ports::{BlobCleanup, BlobCleanupError};

/// Logs each reference instead of deleting it.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingBlobCleanup;

#[async_trait]
impl BlobCleanup for LoggingBlobCleanup {
    async fn remove(&self, reference: &str) -> Result<(), BlobCleanupError> {
        info!(reference, "blob removal requested");
        Ok(())
    }
}
