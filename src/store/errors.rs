//! Persistence error types
//!
//! Error codes:
//! - RECSTORE_PERSIST_IO_FAILURE (ERROR severity)
//! - RECSTORE_PERSIST_LOCKED (ERROR severity)
//! - RECSTORE_PERSIST_INVALID_NAME (ERROR severity)
//! - RECSTORE_DATA_CORRUPTION (FATAL severity)
//!
//! I/O failures are not retried. The failed operation is reported to the
//! caller and the process stays usable for other operations. Corruption is
//! fatal for the table: the committed file cannot be trusted, so the table
//! refuses to open rather than drop records.

use std::fmt;
use std::io;
use std::path::Path;

use crate::codec::DecodeError;

/// Severity levels for persistence errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Operation fails, process continues
    Error,
    /// The table cannot be used
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// Persistence error kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistErrorKind {
    /// Disk I/O failure (open, write, fsync, rename, remove)
    IoFailure,
    /// Another process holds the table lock
    Locked,
    /// A record id cannot be used as a file name
    InvalidName,
    /// Committed content failed to decode
    Corruption,
}

impl PersistErrorKind {
    pub fn code(&self) -> &'static str {
        match self {
            PersistErrorKind::IoFailure => "RECSTORE_PERSIST_IO_FAILURE",
            PersistErrorKind::Locked => "RECSTORE_PERSIST_LOCKED",
            PersistErrorKind::InvalidName => "RECSTORE_PERSIST_INVALID_NAME",
            PersistErrorKind::Corruption => "RECSTORE_DATA_CORRUPTION",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            PersistErrorKind::Corruption => Severity::Fatal,
            _ => Severity::Error,
        }
    }
}

impl fmt::Display for PersistErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Persistence error with context
#[derive(Debug)]
pub struct PersistError {
    kind: PersistErrorKind,
    message: String,
    /// File the error refers to, if any
    path: Option<String>,
    source: Option<ErrorSource>,
}

#[derive(Debug)]
enum ErrorSource {
    Io(io::Error),
    Decode(DecodeError),
}

impl PersistError {
    /// I/O failure on a specific path
    pub fn io_failure(message: impl Into<String>, path: &Path, source: io::Error) -> Self {
        Self {
            kind: PersistErrorKind::IoFailure,
            message: message.into(),
            path: Some(path.display().to_string()),
            source: Some(ErrorSource::Io(source)),
        }
    }

    /// Lock already held by another process
    pub fn locked(path: &Path, source: io::Error) -> Self {
        Self {
            kind: PersistErrorKind::Locked,
            message: "table is locked by another process".to_string(),
            path: Some(path.display().to_string()),
            source: Some(ErrorSource::Io(source)),
        }
    }

    pub fn invalid_name(message: impl Into<String>) -> Self {
        Self {
            kind: PersistErrorKind::InvalidName,
            message: message.into(),
            path: None,
            source: None,
        }
    }

    /// Committed file failed to decode
    pub fn corruption(path: &Path, source: DecodeError) -> Self {
        Self {
            kind: PersistErrorKind::Corruption,
            message: source.to_string(),
            path: Some(path.display().to_string()),
            source: Some(ErrorSource::Decode(source)),
        }
    }

    pub fn kind(&self) -> PersistErrorKind {
        self.kind
    }

    pub fn severity(&self) -> Severity {
        self.kind.severity()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// The decode failure behind a corruption error
    pub fn decode_error(&self) -> Option<&DecodeError> {
        match &self.source {
            Some(ErrorSource::Decode(e)) => Some(e),
            _ => None,
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

impl fmt::Display for PersistError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.kind.severity(), self.kind.code(), self.message)?;
        if let Some(ref path) = self.path {
            write!(f, " (path: {})", path)?;
        }
        if let Some(ErrorSource::Io(ref e)) = self.source {
            write!(f, " (caused by: {})", e)?;
        }
        Ok(())
    }
}

impl std::error::Error for PersistError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.source {
            Some(ErrorSource::Io(e)) => Some(e),
            Some(ErrorSource::Decode(e)) => Some(e),
            None => None,
        }
    }
}

/// Result type for persistence operations
pub type PersistResult<T> = Result<T, PersistError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::DecodeErrorKind;

    #[test]
    fn test_error_codes() {
        assert_eq!(PersistErrorKind::IoFailure.code(), "RECSTORE_PERSIST_IO_FAILURE");
        assert_eq!(PersistErrorKind::Locked.code(), "RECSTORE_PERSIST_LOCKED");
        assert_eq!(PersistErrorKind::Corruption.code(), "RECSTORE_DATA_CORRUPTION");
    }

    #[test]
    fn test_corruption_is_fatal() {
        let err = PersistError::corruption(
            Path::new("/data/accounts.rec"),
            DecodeError::truncated("missing trailer"),
        );
        assert!(err.is_fatal());
        assert_eq!(
            err.decode_error().map(|e| e.kind()),
            Some(DecodeErrorKind::TruncatedInput)
        );
    }

    #[test]
    fn test_io_failure_not_fatal() {
        let err = PersistError::io_failure(
            "rename failed",
            Path::new("/data/accounts.rec"),
            io::Error::new(io::ErrorKind::Other, "disk full"),
        );
        assert!(!err.is_fatal());
        let display = err.to_string();
        assert!(display.contains("RECSTORE_PERSIST_IO_FAILURE"));
        assert!(display.contains("rename failed"));
        assert!(display.contains("/data/accounts.rec"));
        assert!(display.contains("disk full"));
    }
}
