//! Atomic file replacement
//!
//! Atomicity is achieved via:
//! 1. Write to `<file>.tmp`
//! 2. fsync the temp file (durability)
//! 3. Rename temp over the real path (atomicity)
//! 4. fsync the parent directory so the rename itself survives power loss
//!
//! A crash before step 3 leaves the previous committed file untouched and a
//! stale `.tmp` behind, which is removed the next time the table opens.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::errors::{PersistError, PersistResult};
use crate::crash_point::{maybe_crash, points};

/// Suffix of in-flight temp files.
pub const TEMP_SUFFIX: &str = ".tmp";

/// Temp path for a target: `accounts.rec` -> `accounts.rec.tmp`.
pub fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(TEMP_SUFFIX);
    path.with_file_name(name)
}

/// Replaces `path` with `bytes` atomically.
///
/// Returns only after the rename completes; until then readers of `path`
/// see the previous content.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> PersistResult<()> {
    let temp_path = temp_path_for(path);

    maybe_crash(points::COMMIT_BEFORE_TEMP_WRITE);

    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&temp_path)
        .map_err(|e| PersistError::io_failure("failed to create temp file", &temp_path, e))?;

    file.write_all(bytes)
        .map_err(|e| PersistError::io_failure("failed to write temp file", &temp_path, e))?;

    file.sync_all()
        .map_err(|e| PersistError::io_failure("failed to fsync temp file", &temp_path, e))?;
    drop(file);

    maybe_crash(points::COMMIT_BEFORE_RENAME);

    if let Err(e) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(PersistError::io_failure("failed to commit file", path, e));
    }

    maybe_crash(points::COMMIT_AFTER_RENAME);

    fsync_parent(path);
    debug!(path = %path.display(), bytes = bytes.len(), "committed file");
    Ok(())
}

/// Removes `path` durably. A missing file is not an error.
pub fn remove_durable(path: &Path) -> PersistResult<()> {
    maybe_crash(points::COMMIT_BEFORE_REMOVE);

    match fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(PersistError::io_failure("failed to remove file", path, e)),
    }

    fsync_parent(path);
    debug!(path = %path.display(), "removed file");
    Ok(())
}

/// Removes leftover temp files in `dir`. Returns how many were removed.
pub fn remove_stale_temps(dir: &Path) -> PersistResult<usize> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(PersistError::io_failure("failed to scan directory", dir, e)),
    };

    let mut removed = 0;
    for entry in entries {
        let entry =
            entry.map_err(|e| PersistError::io_failure("failed to scan directory", dir, e))?;
        let path = entry.path();
        let is_temp = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.ends_with(TEMP_SUFFIX))
            .unwrap_or(false);
        if !is_temp || !path.is_file() {
            continue;
        }

        warn!(path = %path.display(), "removing uncommitted temp file left by an interrupted write");
        fs::remove_file(&path)
            .map_err(|e| PersistError::io_failure("failed to remove stale temp file", &path, e))?;
        removed += 1;
    }

    Ok(removed)
}

/// fsync the directory containing `path` so a rename or unlink is durable.
///
/// Best effort: some platforms cannot open a directory for syncing.
fn fsync_parent(path: &Path) {
    let Some(parent) = path.parent() else {
        return;
    };
    if let Ok(dir) = File::open(parent) {
        if let Err(e) = dir.sync_all() {
            warn!(dir = %parent.display(), error = %e, "directory fsync failed");
        }
    }
}
