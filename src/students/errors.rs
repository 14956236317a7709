//! Student registry errors

use thiserror::Error;

use crate::table::TableError;
use crate::validation::ValidationError;

pub type StudentResult<T> = Result<T, StudentError>;

#[derive(Debug, Error)]
pub enum StudentError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Table(#[from] TableError),

    /// Stored record is missing a required field
    #[error("Student record '{id}' is missing field '{field}'")]
    MissingField { id: String, field: &'static str },

    /// Stored record lists a subject without its mark
    #[error("Student record '{id}' has no mark for subject '{subject}'")]
    MissingMark { id: String, subject: String },
}
