//! Single-writer table lock
//!
//! Each open table holds an exclusive advisory lock on `<name>.lock` in the
//! data directory for as long as it lives. A second opener, in this or any
//! other process, fails fast instead of interleaving writes.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use tracing::debug;

use super::errors::{PersistError, PersistResult};

/// Held lock; released when dropped.
#[derive(Debug)]
pub struct TableLock {
    file: File,
    path: PathBuf,
}

impl TableLock {
    /// Acquires the lock at `path` without blocking.
    ///
    /// # Errors
    ///
    /// `Locked` if another holder exists, `IoFailure` if the lock file
    /// cannot be opened.
    pub fn acquire(path: &Path) -> PersistResult<Self> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(|e| PersistError::io_failure("failed to open lock file", path, e))?;

        file.try_lock_exclusive()
            .map_err(|e| PersistError::locked(path, e))?;

        // Record the holder for operators; failure here does not matter.
        let _ = file.set_len(0);
        let _ = writeln!(file, "{}", std::process::id());

        debug!(path = %path.display(), "acquired table lock");
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TableLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}
