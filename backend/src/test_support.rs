//! Test utilities for the backend crate.
//!
//! Shared by unit tests (in `src/`) and integration tests (in `tests/`).
//! Compiled for tests and when the `test-support` feature is enabled.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Local, TimeZone, Utc};
use mockable::Clock;
use serde_json::Value;

use crate::domain::ports::{DocumentStore, DocumentStoreError};
use crate::domain::{Fields, Patch, Query, Record};

/// Clock frozen at a chosen instant, advanced explicitly by tests.
#[derive(Debug)]
pub struct FixedClock(Mutex<DateTime<Utc>>);

impl FixedClock {
    /// Clock reading `instant`.
    #[must_use]
    pub fn at(instant: DateTime<Utc>) -> Self {
        Self(Mutex::new(instant))
    }

    /// Clock reading 2026-03-02T10:30:00Z.
    #[must_use]
    pub fn fixture() -> Self {
        Self::at(
            Utc.with_ymd_and_hms(2026, 3, 2, 10, 30, 0)
                .single()
                .unwrap_or_default(),
        )
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        let mut now = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        *now += by;
    }
}

impl Clock for FixedClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Attribute map from a JSON object literal; anything else yields no fields.
#[must_use]
pub fn fields(value: Value) -> Fields {
    match value {
        Value::Object(map) => map,
        _ => Fields::new(),
    }
}

/// Store whose every call fails with a connection error.
///
/// Stands in for an unreachable database behind the fallback router.
#[derive(Debug, Default)]
pub struct UnavailableDocumentStore {
    calls: AtomicUsize,
}

impl UnavailableDocumentStore {
    /// Number of operations attempted so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn fail<T>(&self) -> Result<T, DocumentStoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(DocumentStoreError::connection("connection refused"))
    }
}

#[async_trait]
impl DocumentStore for UnavailableDocumentStore {
    async fn find(&self, _: &str, _: &Query) -> Result<Vec<Record>, DocumentStoreError> {
        self.fail()
    }

    async fn find_one(&self, _: &str, _: &Query) -> Result<Option<Record>, DocumentStoreError> {
        self.fail()
    }

    async fn find_by_id(&self, _: &str, _: &str) -> Result<Option<Record>, DocumentStoreError> {
        self.fail()
    }

    async fn create(&self, _: &str, _: Fields) -> Result<Record, DocumentStoreError> {
        self.fail()
    }

    async fn update_one(
        &self,
        _: &str,
        _: &Query,
        _: &Patch,
    ) -> Result<Option<Record>, DocumentStoreError> {
        self.fail()
    }

    async fn delete_one(&self, _: &str, _: &Query) -> Result<bool, DocumentStoreError> {
        self.fail()
    }
}

pub mod cap_fs {
    //! Capability-safe filesystem helpers for tests.
    //!
    //! Tests inspect the data directory through `cap_std::fs::Dir` rather
    //! than `std::fs`, mirroring how the file store itself touches disk.

    use std::io;

    use camino::{Utf8Path, Utf8PathBuf};
    use cap_std::{ambient_authority, fs::Dir};
    use tempfile::TempDir;

    /// Temporary data directory plus its UTF-8 path.
    ///
    /// The directory is removed when the returned [`TempDir`] drops.
    ///
    /// # Errors
    /// Fails when the directory cannot be created or its path is not UTF-8.
    pub fn temp_data_dir() -> io::Result<(TempDir, Utf8PathBuf)> {
        let dir = tempfile::tempdir()?;
        let path = Utf8PathBuf::from_path_buf(dir.path().to_path_buf())
            .map_err(|path| io::Error::other(format!("non UTF-8 path: {}", path.display())))?;
        Ok((dir, path))
    }

    /// Read `name` inside `dir` as UTF-8.
    ///
    /// # Errors
    /// Propagates I/O errors, including `NotFound`.
    pub fn read_file(dir: &Utf8Path, name: &str) -> io::Result<String> {
        Dir::open_ambient_dir(dir, ambient_authority())?.read_to_string(name)
    }

    /// Write `contents` to `name` inside `dir`.
    ///
    /// # Errors
    /// Propagates I/O errors.
    pub fn write_file(dir: &Utf8Path, name: &str, contents: &[u8]) -> io::Result<()> {
        Dir::open_ambient_dir(dir, ambient_authority())?.write(name, contents)
    }

    /// File names directly inside `dir`, sorted.
    ///
    /// # Errors
    /// Propagates I/O errors.
    pub fn list_files(dir: &Utf8Path) -> io::Result<Vec<String>> {
        let directory = Dir::open_ambient_dir(dir, ambient_authority())?;
        let mut names = Vec::new();
        for entry in directory.entries()? {
            names.push(entry?.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        Ok(names)
    }
}
