//! Port handing out the document store for a tenant.
use std::sync::Arc;

use crate::domain::Tenant;

use super::{DocumentStore, DocumentStoreError};

/// Supplies one store handle per tenant.
#[cfg_attr(test, mockall::automock)]
pub trait StoreProvider: Send + Sync {
    /// Store serving `tenant`, created on first use.
    ///
    /// # Errors
    /// Returns [`DocumentStoreError`] when the tenant's backing store cannot
    /// be opened.
    fn get_or_create(&self, tenant: &Tenant) -> Result<Arc<dyn DocumentStore>, DocumentStoreError>;
}
