//! File Store: durable home of one table.
//!
//! Two layouts share one commit path:
//!
//! - `PerTable`: `<data_dir>/<name>.rec` holds the whole collection and is
//!   rewritten on every commit.
//! - `PerRecord`: `<data_dir>/<name>/<id>.rec` holds one record each; a
//!   commit rewrites or removes only the touched record's file.
//!
//! Either way each file is replaced with temp-write + fsync + rename, so a
//! crash never exposes a half-written file under its real name.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use super::atomic::{remove_durable, remove_stale_temps, temp_path_for, write_atomic};
use super::errors::{PersistError, PersistResult};
use super::lock::TableLock;
use crate::codec::{decode_collection, encode_collection, DecodeError, Record};

/// Extension of committed data files.
pub const DATA_EXTENSION: &str = "rec";

/// How a table maps onto files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// One file for the whole table
    PerTable,
    /// One file per record, named by record id
    PerRecord,
}

impl Layout {
    pub fn as_str(&self) -> &'static str {
        match self {
            Layout::PerTable => "table",
            Layout::PerRecord => "record",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "table" => Some(Layout::PerTable),
            "record" => Some(Layout::PerRecord),
            _ => None,
        }
    }
}

/// The mutation being committed.
#[derive(Debug, Clone, Copy)]
pub enum Change<'a> {
    /// Record inserted or updated
    Upsert(&'a Record),
    /// Record with this id deleted
    Remove(&'a str),
}

/// Loads a collection file. A missing file is an empty collection.
///
/// # Errors
///
/// `Corruption` wrapping the `DecodeError` if the file exists but does not
/// decode; `IoFailure` if it cannot be read.
pub fn load_collection(path: &Path) -> PersistResult<Vec<Record>> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(PersistError::io_failure("failed to read collection", path, e)),
    };

    decode_collection(&bytes).map_err(|e| PersistError::corruption(path, e))
}

/// Writes a full collection atomically.
pub fn save_collection(path: &Path, records: &[Record]) -> PersistResult<()> {
    write_atomic(path, &encode_collection(records))
}

/// Checks that `stem` is usable as a file name on every platform.
fn validate_file_stem(stem: &str) -> PersistResult<()> {
    let valid = !stem.is_empty()
        && !stem.starts_with('.')
        && stem
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if valid {
        Ok(())
    } else {
        Err(PersistError::invalid_name(format!(
            "'{}' cannot be used as a file name (use ASCII letters, digits, '_', '-', '.')",
            stem
        )))
    }
}

/// Durable storage for one named table.
#[derive(Debug)]
pub struct FileStore {
    data_dir: PathBuf,
    name: String,
    layout: Layout,
    _lock: TableLock,
}

impl FileStore {
    /// Opens the store for table `name` under `data_dir`.
    ///
    /// Creates the directories, takes the table lock, and removes temp files
    /// left by an interrupted commit.
    pub fn open(data_dir: &Path, name: &str, layout: Layout) -> PersistResult<Self> {
        validate_file_stem(name)?;

        fs::create_dir_all(data_dir).map_err(|e| {
            PersistError::io_failure("failed to create data directory", data_dir, e)
        })?;

        let lock = TableLock::acquire(&data_dir.join(format!("{}.lock", name)))?;

        let store = Self {
            data_dir: data_dir.to_path_buf(),
            name: name.to_string(),
            layout,
            _lock: lock,
        };

        let removed = match layout {
            Layout::PerTable => {
                let temp = temp_path_for(&store.collection_path());
                if temp.exists() {
                    warn!(path = %temp.display(), "removing uncommitted temp file left by an interrupted write");
                    fs::remove_file(&temp).map_err(|e| {
                        PersistError::io_failure("failed to remove stale temp file", &temp, e)
                    })?;
                    1
                } else {
                    0
                }
            }
            Layout::PerRecord => {
                let dir = store.records_dir();
                fs::create_dir_all(&dir).map_err(|e| {
                    PersistError::io_failure("failed to create table directory", &dir, e)
                })?;
                remove_stale_temps(&dir)?
            }
        };
        if removed > 0 {
            info!(table = %store.name, removed, "recovered from interrupted commit");
        }

        Ok(store)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// File holding the table (`PerTable`).
    pub fn collection_path(&self) -> PathBuf {
        self.data_dir.join(format!("{}.{}", self.name, DATA_EXTENSION))
    }

    /// Directory holding record files (`PerRecord`).
    pub fn records_dir(&self) -> PathBuf {
        self.data_dir.join(&self.name)
    }

    /// File holding one record (`PerRecord`).
    pub fn record_path(&self, id: &str) -> PersistResult<PathBuf> {
        validate_file_stem(id)?;
        Ok(self.records_dir().join(format!("{}.{}", id, DATA_EXTENSION)))
    }

    /// Loads every committed record.
    ///
    /// `PerRecord` files load in file name order.
    pub fn load(&self) -> PersistResult<Vec<Record>> {
        let records = match self.layout {
            Layout::PerTable => load_collection(&self.collection_path())?,
            Layout::PerRecord => self.load_record_files()?,
        };
        info!(table = %self.name, layout = self.layout.as_str(), records = records.len(), "loaded table");
        Ok(records)
    }

    fn load_record_files(&self) -> PersistResult<Vec<Record>> {
        let dir = self.records_dir();
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(PersistError::io_failure("failed to scan table directory", &dir, e)),
        };

        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry
                .map_err(|e| PersistError::io_failure("failed to scan table directory", &dir, e))?;
            let path = entry.path();
            if path.is_file()
                && path.extension().and_then(|e| e.to_str()) == Some(DATA_EXTENSION)
            {
                paths.push(path);
            }
        }
        paths.sort();

        let mut records = Vec::with_capacity(paths.len());
        for path in paths {
            let mut loaded = load_collection(&path)?;
            let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();

            if loaded.len() != 1 {
                return Err(PersistError::corruption(
                    &path,
                    DecodeError::malformed(format!(
                        "record file holds {} records, expected 1",
                        loaded.len()
                    )),
                ));
            }
            let record = loaded.remove(0);
            if record.id() != stem {
                return Err(PersistError::corruption(
                    &path,
                    DecodeError::malformed(format!(
                        "record id '{}' does not match file name",
                        record.id()
                    )),
                ));
            }
            records.push(record);
        }
        Ok(records)
    }

    /// Rewrites the whole table.
    ///
    /// `PerRecord` writes every record file and removes files of records no
    /// longer present.
    pub fn save_all(&self, records: &[Record]) -> PersistResult<()> {
        match self.layout {
            Layout::PerTable => save_collection(&self.collection_path(), records),
            Layout::PerRecord => {
                let mut keep = Vec::with_capacity(records.len());
                for record in records {
                    let path = self.record_path(record.id())?;
                    save_collection(&path, std::slice::from_ref(record))?;
                    keep.push(path);
                }
                for stale in self.load_record_paths()? {
                    if !keep.contains(&stale) {
                        remove_durable(&stale)?;
                    }
                }
                Ok(())
            }
        }
    }

    fn load_record_paths(&self) -> PersistResult<Vec<PathBuf>> {
        let dir = self.records_dir();
        let entries = fs::read_dir(&dir)
            .map_err(|e| PersistError::io_failure("failed to scan table directory", &dir, e))?;
        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry
                .map_err(|e| PersistError::io_failure("failed to scan table directory", &dir, e))?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some(DATA_EXTENSION) {
                paths.push(path);
            }
        }
        Ok(paths)
    }

    /// Commits one mutation. `records` is the full post-mutation table.
    pub fn persist(&self, records: &[Record], change: Change<'_>) -> PersistResult<()> {
        match (self.layout, change) {
            (Layout::PerTable, _) => self.save_all(records),
            (Layout::PerRecord, Change::Upsert(record)) => {
                let path = self.record_path(record.id())?;
                save_collection(&path, std::slice::from_ref(record))
            }
            (Layout::PerRecord, Change::Remove(id)) => remove_durable(&self.record_path(id)?),
        }
    }
}
