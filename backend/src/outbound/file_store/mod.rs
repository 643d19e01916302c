//! File-backed document store, one JSON file per tenant.
//!
//! The whole collection set lives in memory behind a mutex and is rewritten
//! atomically after every mutation. The lock is never held across an
//! `.await`; each read-modify-persist sequence runs to completion under it.
//! Writes and their fsyncs therefore run synchronously on the calling worker
//! thread and serialise concurrent callers, which suits a fallback or
//! development store rather than a hot write path. Separate processes sharing
//! a file are not coordinated and the last writer wins.

mod atomic_io;
pub mod seed;

use std::collections::BTreeMap;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use camino::Utf8Path;
use cap_std::{ambient_authority, fs::Dir};
use mockable::Clock;
use tracing::{debug, error, info};

use crate::domain::ports::{DocumentStore, DocumentStoreError};
use crate::domain::{Fields, Patch, Query, Record, RecordId, Tenant};

use atomic_io::write_atomic;

/// Collections keyed by name, as persisted.
pub(crate) type Collections = BTreeMap<String, Vec<Record>>;

/// Durable single-tenant store backed by `<data_dir>/<tenant>.json`.
pub struct FileDocumentStore {
    dir: Dir,
    file_name: String,
    state: Mutex<Collections>,
    clock: Arc<dyn Clock>,
}

impl FileDocumentStore {
    /// Open, or initialise, the file for `tenant` under `data_dir`.
    ///
    /// A missing file is seeded and persisted. A file that fails to parse is
    /// renamed to `<name>.corrupt.<millis>` and replaced by seed data.
    ///
    /// # Errors
    /// Returns [`DocumentStoreError::Persistence`] when the directory cannot
    /// be created or the file cannot be read or written.
    pub fn open(
        data_dir: &Utf8Path,
        tenant: &Tenant,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, DocumentStoreError> {
        let dir = Dir::create_ambient_dir_all(data_dir, ambient_authority())
            .and_then(|()| Dir::open_ambient_dir(data_dir, ambient_authority()))
            .map_err(|err| DocumentStoreError::persistence(format!("{data_dir}: {err}")))?;
        let file_name = format!("{tenant}.json");
        let state = load(&dir, &file_name, clock.as_ref())?;
        debug!(file = %file_name, collections = state.len(), "file store opened");
        Ok(Self {
            dir,
            file_name,
            state: Mutex::new(state),
            clock,
        })
    }

    fn lock(&self) -> MutexGuard<'_, Collections> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn select<T>(&self, collection: &str, pick: impl FnOnce(&[Record]) -> T) -> T {
        let state = self.lock();
        pick(state.get(collection).map_or(&[][..], Vec::as_slice))
    }

    /// Run `change` on a copy of the state; persist and publish the copy
    /// only when `change` reports a result.
    fn mutate<T>(
        &self,
        change: impl FnOnce(&mut Collections) -> Option<T>,
    ) -> Result<Option<T>, DocumentStoreError> {
        let mut state = self.lock();
        let mut next = state.clone();
        let Some(outcome) = change(&mut next) else {
            return Ok(None);
        };
        persist(&self.dir, &self.file_name, &next)?;
        *state = next;
        Ok(Some(outcome))
    }
}

fn load(dir: &Dir, file_name: &str, clock: &dyn Clock) -> Result<Collections, DocumentStoreError> {
    let text = match dir.read_to_string(file_name) {
        Ok(text) => text,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            info!(file = file_name, "no data file; seeding");
            return reseed(dir, file_name, clock);
        }
        Err(err) => {
            return Err(DocumentStoreError::persistence(format!("{file_name}: {err}")));
        }
    };
    match serde_json::from_str::<Collections>(&text) {
        Ok(collections) => Ok(collections),
        Err(parse_err) => {
            let quarantine = format!("{file_name}.corrupt.{}", clock.utc().timestamp_millis());
            dir.rename(file_name, dir, &quarantine).map_err(|err| {
                DocumentStoreError::persistence(format!("{file_name}: {err}"))
            })?;
            error!(
                file = file_name,
                quarantine = %quarantine,
                error = %parse_err,
                "data file is corrupt; quarantined and reseeding"
            );
            reseed(dir, file_name, clock)
        }
    }
}

fn reseed(dir: &Dir, file_name: &str, clock: &dyn Clock) -> Result<Collections, DocumentStoreError> {
    let collections = seed::seed(clock.utc());
    persist(dir, file_name, &collections)?;
    Ok(collections)
}

fn persist(dir: &Dir, file_name: &str, collections: &Collections) -> Result<(), DocumentStoreError> {
    let text = serde_json::to_string_pretty(collections)
        .map_err(|err| DocumentStoreError::persistence(err.to_string()))?;
    write_atomic(dir, file_name, &text)
}

fn first_match(records: &[Record], query: &Query) -> Option<usize> {
    records.iter().position(|record| query.matches(record))
}

#[async_trait]
impl DocumentStore for FileDocumentStore {
    async fn find(
        &self,
        collection: &str,
        query: &Query,
    ) -> Result<Vec<Record>, DocumentStoreError> {
        Ok(self.select(collection, |records| {
            records
                .iter()
                .filter(|record| query.matches(record))
                .cloned()
                .collect()
        }))
    }

    async fn find_one(
        &self,
        collection: &str,
        query: &Query,
    ) -> Result<Option<Record>, DocumentStoreError> {
        Ok(self.select(collection, |records| {
            records.iter().find(|record| query.matches(record)).cloned()
        }))
    }

    async fn find_by_id(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<Record>, DocumentStoreError> {
        Ok(self.select(collection, |records| {
            records
                .iter()
                .find(|record| record.id().as_str() == id)
                .cloned()
        }))
    }

    async fn create(
        &self,
        collection: &str,
        fields: Fields,
    ) -> Result<Record, DocumentStoreError> {
        let record = Record::new(RecordId::random(), fields, self.clock.utc());
        let stored = record.clone();
        self.mutate(|state| {
            state.entry(collection.to_owned()).or_default().push(stored);
            Some(())
        })?;
        Ok(record)
    }

    async fn update_one(
        &self,
        collection: &str,
        query: &Query,
        patch: &Patch,
    ) -> Result<Option<Record>, DocumentStoreError> {
        let now = self.clock.utc();
        self.mutate(|state| {
            let records = state.get_mut(collection)?;
            let index = first_match(records, query)?;
            let record = records.get_mut(index)?;
            record.apply(patch, now);
            Some(record.clone())
        })
    }

    async fn delete_one(
        &self,
        collection: &str,
        query: &Query,
    ) -> Result<bool, DocumentStoreError> {
        let removed = self.mutate(|state| {
            let records = state.get_mut(collection)?;
            let index = first_match(records, query)?;
            Some(records.remove(index))
        })?;
        Ok(removed.is_some())
    }
}

#[cfg(test)]
mod tests;
