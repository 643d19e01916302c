//! Shared HTTP adapter state.
//!
//! HTTP handlers accept this state via `actix_web::web::Data` so they only
//! depend on domain ports and remain testable without I/O.

use std::sync::Arc;

use mockable::Clock;

use crate::domain::ports::{BlobCleanup, DocumentStore, StoreProvider};
use crate::domain::{DeliveryService, Error, ReconciliationService, Tenant, TenantPolicy};

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    pub stores: Arc<dyn StoreProvider>,
    pub tenants: Arc<TenantPolicy>,
    pub blobs: Arc<dyn BlobCleanup>,
    pub clock: Arc<dyn Clock>,
}

impl HttpState {
    /// Construct state from its ports.
    ///
    /// # Examples
    /// ```no_run
    /// use std::sync::Arc;
    ///
    /// use mockable::DefaultClock;
    /// use podtrack::domain::TenantPolicy;
    /// use podtrack::inbound::http::state::HttpState;
    /// use podtrack::outbound::{BackendMode, LoggingBlobCleanup, StoreRegistry};
    ///
    /// let clock = Arc::new(DefaultClock);
    /// let registry = StoreRegistry::new(BackendMode::FileOnly, "data", clock.clone());
    /// let state = HttpState::new(
    ///     Arc::new(registry),
    ///     TenantPolicy::standard(),
    ///     Arc::new(LoggingBlobCleanup),
    ///     clock,
    /// );
    /// let _stores = state.stores.clone();
    /// ```
    pub fn new(
        stores: Arc<dyn StoreProvider>,
        tenants: TenantPolicy,
        blobs: Arc<dyn BlobCleanup>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            stores,
            tenants: Arc::new(tenants),
            blobs,
            clock,
        }
    }

    /// The store serving `tenant`.
    ///
    /// # Errors
    /// An internal [`Error`] when the tenant's store cannot be opened.
    pub fn store(&self, tenant: &Tenant) -> Result<Arc<dyn DocumentStore>, Error> {
        Ok(self.stores.get_or_create(tenant)?)
    }

    /// Delivery use cases for `tenant`.
    ///
    /// # Errors
    /// See [`HttpState::store`].
    pub fn deliveries(&self, tenant: &Tenant) -> Result<DeliveryService, Error> {
        Ok(DeliveryService::new(self.store(tenant)?, self.blobs.clone()))
    }

    /// Reconciliation use cases for `tenant`.
    ///
    /// # Errors
    /// See [`HttpState::store`].
    pub fn reconciliation(&self, tenant: &Tenant) -> Result<ReconciliationService, Error> {
        Ok(ReconciliationService::new(
            self.store(tenant)?,
            self.clock.clone(),
        ))
    }
}
