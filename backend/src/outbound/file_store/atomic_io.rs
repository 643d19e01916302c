//! Atomic file replacement inside a capability directory.
//!
//! Contents go to a hidden temporary file in the same directory, are synced,
//! and are then renamed over the target. A crash at any point leaves either
//! the previous file or the new one, plus at worst an orphaned temp file that
//! loading ignores.

use std::io::{self, Write};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use cap_std::fs::{Dir, OpenOptions};
use tracing::debug;

use crate::domain::ports::DocumentStoreError;

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Prefix shared by every temporary file written for `file_name`.
pub(super) fn temp_prefix(file_name: &str) -> String {
    format!(".{file_name}.tmp.")
}

/// Replace `file_name` in `dir` with `contents`.
///
/// # Errors
/// Returns [`DocumentStoreError::Persistence`] when the temporary file cannot
/// be written or renamed. The target is untouched in that case.
pub(super) fn write_atomic(
    dir: &Dir,
    file_name: &str,
    contents: &str,
) -> Result<(), DocumentStoreError> {
    let counter = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_nanos());
    let tmp_name = format!(
        "{}{}.{}.{}",
        temp_prefix(file_name),
        std::process::id(),
        suffix,
        counter
    );

    write_to_temp_file(dir, &tmp_name, contents)
        .map_err(|err| persistence_error(&tmp_name, &err))?;
    if let Err(err) = dir.rename(&tmp_name, dir, file_name) {
        drop(dir.remove_file(&tmp_name));
        return Err(persistence_error(file_name, &err));
    }
    // Some filesystems refuse directory fsync; the rename already happened.
    if let Err(err) = sync_directory(dir) {
        debug!(file = file_name, error = %err, "directory sync skipped");
    }
    Ok(())
}

fn write_to_temp_file(dir: &Dir, tmp_name: &str, contents: &str) -> io::Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    let mut file = dir.open_with(tmp_name, &options)?;

    let written = file
        .write_all(contents.as_bytes())
        .and_then(|()| file.sync_all());
    if written.is_err() {
        drop(file);
        drop(dir.remove_file(tmp_name));
    }
    written
}

fn sync_directory(dir: &Dir) -> io::Result<()> {
    dir.open(".").and_then(|handle| handle.sync_all())
}

fn persistence_error(name: &str, err: &io::Error) -> DocumentStoreError {
    DocumentStoreError::persistence(format!("{name}: {err}"))
}
