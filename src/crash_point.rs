//! Crash point injection for durability testing
//!
//! When `RECSTORE_CRASH_POINT` names a point on the commit path, the process
//! terminates there via `std::process::abort()`: no cleanup, no unwinding,
//! no catching. Crash tests run the binary with the variable set and then
//! check what a fresh process can load.
//!
//! ```bash
//! RECSTORE_CRASH_POINT=commit_before_rename recstore account deposit ...
//! ```

use std::sync::OnceLock;

/// Environment variable selecting the crash point.
pub const CRASH_POINT_ENV: &str = "RECSTORE_CRASH_POINT";

static CRASH_POINT: OnceLock<Option<String>> = OnceLock::new();

#[inline]
fn get_crash_point() -> Option<&'static str> {
    CRASH_POINT
        .get_or_init(|| std::env::var(CRASH_POINT_ENV).ok())
        .as_deref()
}

/// Returns true if `RECSTORE_CRASH_POINT` equals the given name.
#[inline]
pub fn crash_point_enabled(name: &str) -> bool {
    get_crash_point().map(|p| p == name).unwrap_or(false)
}

/// Aborts the process if the named crash point is enabled.
///
/// No-op when the variable is unset or names another point.
#[inline]
pub fn maybe_crash(name: &str) {
    if crash_point_enabled(name) {
        eprintln!("[CRASH] Triggering crash at point: {}", name);
        std::process::abort();
    }
}

/// All defined crash point names
pub mod points {
    /// Before the temporary file is created
    pub const COMMIT_BEFORE_TEMP_WRITE: &str = "commit_before_temp_write";
    /// Temporary file written and fsynced, real path untouched
    pub const COMMIT_BEFORE_RENAME: &str = "commit_before_rename";
    /// Rename done, directory not yet fsynced
    pub const COMMIT_AFTER_RENAME: &str = "commit_after_rename";
    /// Record file removal (per-record layout delete)
    pub const COMMIT_BEFORE_REMOVE: &str = "commit_before_remove";

    pub fn all() -> &'static [&'static str] {
        &[
            COMMIT_BEFORE_TEMP_WRITE,
            COMMIT_BEFORE_RENAME,
            COMMIT_AFTER_RENAME,
            COMMIT_BEFORE_REMOVE,
        ]
    }
}
