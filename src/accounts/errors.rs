//! Account errors

use thiserror::Error;

use super::policy::format_amount;
use crate::session::{AuthError, GuardError};
use crate::table::TableError;
use crate::validation::ValidationError;

/// Result type for account operations
pub type AccountResult<T> = Result<T, AccountError>;

/// Account errors
#[derive(Debug, Error)]
pub enum AccountError {
    /// Amount breaks the cash policy
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Withdrawal larger than the balance; nothing was changed
    #[error("Insufficient funds (available: {})", display_amount(.available))]
    InsufficientFunds { available: f64 },

    /// Stored account lacks a usable balance
    #[error("Account '{0}' has no valid balance")]
    MissingBalance(String),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Table(#[from] TableError),
}

fn display_amount(amount: &f64) -> String {
    format_amount(*amount)
}

impl From<GuardError> for AccountError {
    fn from(err: GuardError) -> Self {
        match err {
            GuardError::Auth(e) => AccountError::Auth(e),
            GuardError::Validation(e) => AccountError::Validation(e),
            GuardError::Table(e) => AccountError::Table(e),
        }
    }
}
