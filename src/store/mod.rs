//! File Store subsystem
//!
//! Owns the durable files behind each table.
//!
//! # Design Principles
//!
//! - Load-all at open, rewrite on every commit (write-through)
//! - Temp file + fsync + rename is the only way a data file changes
//! - Missing file means first run, never an error
//! - Corrupt content is reported, never skipped
//! - One opener per table, enforced with a lock file

mod atomic;
mod errors;
mod file_store;
mod lock;

pub use atomic::{remove_durable, temp_path_for, write_atomic, TEMP_SUFFIX};
pub use errors::{PersistError, PersistErrorKind, PersistResult, Severity};
pub use file_store::{load_collection, save_collection, Change, FileStore, Layout, DATA_EXTENSION};
pub use lock::TableLock;
