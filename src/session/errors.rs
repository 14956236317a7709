//! # Session Errors

use thiserror::Error;

use crate::table::TableError;
use crate::validation::ValidationError;

/// Result type for authentication checks
pub type AuthResult<T> = Result<T, AuthError>;

/// Result type for guard operations that also touch the table
pub type GuardResult<T> = Result<T, GuardError>;

/// Authentication errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// Unknown identity or wrong secret (deliberately indistinguishable)
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Token does not match the active session, or nobody is logged in
    #[error("No active session")]
    NoActiveSession,

    /// Another identity must log out first
    #[error("A session is already active")]
    SessionAlreadyActive,

    /// Argon2 refused to hash the secret
    #[error("Secret hashing failed")]
    HashingFailed,
}

/// Errors from guard operations
#[derive(Debug, Error)]
pub enum GuardError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Table(#[from] TableError),
}
