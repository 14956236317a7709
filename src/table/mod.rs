//! Record Table
//!
//! Keyed in-memory collection whose every mutation is committed to its
//! [`FileStore`](crate::store::FileStore) before it becomes visible.

mod errors;
#[allow(clippy::module_inception)]
mod table;

pub use errors::{TableError, TableResult};
pub use table::{Order, Table, TableOptions};
