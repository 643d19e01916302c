//! Per-tenant store handles for the composition root.
//!
//! The registry caches one [`FileDocumentStore`] per tenant for the process
//! lifetime; entries are never evicted. In database mode each handle is a
//! [`DieselDocumentStore`] over the shared lazy pool, wrapped in a
//! [`FallbackDocumentStore`] holding that tenant's cached file store.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use camino::Utf8PathBuf;
use mockable::Clock;
use tracing::info;

use crate::domain::Tenant;
use crate::domain::ports::{DocumentStore, DocumentStoreError, StoreProvider};

use super::fallback::FallbackDocumentStore;
use super::file_store::FileDocumentStore;
use super::persistence::{DieselDocumentStore, LazyDbPool, PoolConfig};

/// Checkout timeout used for the document database; kept short so a dead
/// database falls back promptly.
const DATABASE_CONNECTION_TIMEOUT: Duration = Duration::from_secs(5);

/// Backend selection, decided once at startup.
#[derive(Clone)]
pub enum BackendMode {
    /// No connection string configured.
    FileOnly,
    /// A connection string is configured but the database is switched off.
    DatabaseDisabled,
    /// Database first, file store on failure.
    Database {
        /// Pool shared by every tenant handle.
        pool: LazyDbPool,
    },
}

impl BackendMode {
    /// Select the mode from the configured connection string and switch.
    ///
    /// Blank connection strings count as absent.
    ///
    /// # Examples
    /// ```
    /// use podtrack::outbound::BackendMode;
    ///
    /// assert_eq!(BackendMode::select(None, false).label(), "file");
    /// assert_eq!(BackendMode::select(Some("postgres://db/app"), true).label(), "file (database disabled)");
    /// assert_eq!(BackendMode::select(Some("postgres://db/app"), false).label(), "database");
    /// ```
    #[must_use]
    pub fn select(database_url: Option<&str>, disable_database: bool) -> Self {
        match database_url.map(str::trim).filter(|url| !url.is_empty()) {
            None => Self::FileOnly,
            Some(_) if disable_database => Self::DatabaseDisabled,
            Some(url) => Self::Database {
                pool: LazyDbPool::new(
                    PoolConfig::new(url).with_connection_timeout(DATABASE_CONNECTION_TIMEOUT),
                ),
            },
        }
    }

    /// Short description for startup logs.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::FileOnly => "file",
            Self::DatabaseDisabled => "file (database disabled)",
            Self::Database { .. } => "database",
        }
    }
}

impl fmt::Debug for BackendMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Explicit per-tenant store cache.
pub struct StoreRegistry {
    mode: BackendMode,
    data_dir: Utf8PathBuf,
    clock: Arc<dyn Clock>,
    files: Mutex<HashMap<Tenant, Arc<FileDocumentStore>>>,
}

impl StoreRegistry {
    /// Create an empty registry; stores open on first request.
    pub fn new(mode: BackendMode, data_dir: impl Into<Utf8PathBuf>, clock: Arc<dyn Clock>) -> Self {
        Self {
            mode,
            data_dir: data_dir.into(),
            clock,
            files: Mutex::new(HashMap::new()),
        }
    }

    /// Backend selection in effect.
    pub fn mode(&self) -> &BackendMode {
        &self.mode
    }

    /// The cached file store for `tenant`, opening it on first use.
    ///
    /// # Errors
    /// Returns [`DocumentStoreError::Persistence`] when the file cannot be
    /// opened; nothing is cached in that case.
    pub fn file_store(&self, tenant: &Tenant) -> Result<Arc<FileDocumentStore>, DocumentStoreError> {
        let mut files = self.files.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = files.get(tenant) {
            return Ok(existing.clone());
        }
        let store = Arc::new(FileDocumentStore::open(
            &self.data_dir,
            tenant,
            self.clock.clone(),
        )?);
        info!(%tenant, backend = self.mode.label(), "tenant store opened");
        files.insert(tenant.clone(), store.clone());
        Ok(store)
    }
}

impl StoreProvider for StoreRegistry {
    fn get_or_create(&self, tenant: &Tenant) -> Result<Arc<dyn DocumentStore>, DocumentStoreError> {
        let files = self.file_store(tenant)?;
        match &self.mode {
            BackendMode::FileOnly | BackendMode::DatabaseDisabled => Ok(files),
            BackendMode::Database { pool } => {
                let primary =
                    DieselDocumentStore::new(pool.clone(), tenant.clone(), self.clock.clone());
                Ok(Arc::new(FallbackDocumentStore::new(Arc::new(primary), files)))
            }
        }
    }
}
