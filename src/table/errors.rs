//! Table error types

use thiserror::Error;

use crate::store::PersistError;
use crate::validation::ValidationError;

/// Result type for table operations
pub type TableResult<T> = Result<T, TableError>;

/// Record table errors
#[derive(Debug, Error)]
pub enum TableError {
    /// Insert with an identifier that is already present
    #[error("Record '{0}' already exists")]
    DuplicateId(String),

    /// No record with this identifier
    #[error("Record '{0}' not found")]
    NotFound(String),

    /// A mutator refused the change
    #[error("Change rejected: {0}")]
    Rejected(String),

    /// A field value was rejected
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Commit failed; the in-memory table was rolled back
    #[error(transparent)]
    Persist(#[from] PersistError),
}

impl TableError {
    /// Whether the caller can simply re-prompt: nothing was mutated and
    /// nothing on disk is in doubt.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, TableError::Persist(_))
    }
}
