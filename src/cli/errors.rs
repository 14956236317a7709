//! CLI-specific error types
//!
//! Every failure ends the process with a non-zero exit and a single
//! `CODE: message` line.

use std::fmt;
use std::io;

use crate::accounts::AccountError;
use crate::session::{AuthError, GuardError};
use crate::store::PersistError;
use crate::students::StudentError;
use crate::table::TableError;
use crate::validation::ValidationError;

/// CLI error codes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliErrorCode {
    /// Configuration file error
    ConfigError,
    /// I/O error (stdout, config file)
    IoError,
    /// Config file already exists
    AlreadyInitialized,
    /// No config file yet
    NotInitialized,
    /// Argument failed validation
    InvalidInput,
    /// No record with that identifier
    NotFound,
    /// Identifier already taken
    Duplicate,
    /// Credentials or session problem
    AuthFailed,
    /// Operation refused by a business rule
    Rejected,
    /// Storage failure; data on disk may need attention
    StorageError,
}

impl CliErrorCode {
    /// Get the error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigError => "RECSTORE_CLI_CONFIG_ERROR",
            Self::IoError => "RECSTORE_CLI_IO_ERROR",
            Self::AlreadyInitialized => "RECSTORE_CLI_ALREADY_INITIALIZED",
            Self::NotInitialized => "RECSTORE_CLI_NOT_INITIALIZED",
            Self::InvalidInput => "RECSTORE_CLI_INVALID_INPUT",
            Self::NotFound => "RECSTORE_CLI_NOT_FOUND",
            Self::Duplicate => "RECSTORE_CLI_DUPLICATE",
            Self::AuthFailed => "RECSTORE_CLI_AUTH_FAILED",
            Self::Rejected => "RECSTORE_CLI_REJECTED",
            Self::StorageError => "RECSTORE_CLI_STORAGE_ERROR",
        }
    }
}

/// CLI error
#[derive(Debug)]
pub struct CliError {
    code: CliErrorCode,
    message: String,
}

impl CliError {
    /// Create a new CLI error
    pub fn new(code: CliErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::ConfigError, msg)
    }

    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::IoError, msg)
    }

    pub fn already_initialized() -> Self {
        Self::new(
            CliErrorCode::AlreadyInitialized,
            "Config file already exists",
        )
    }

    pub fn not_initialized() -> Self {
        Self::new(
            CliErrorCode::NotInitialized,
            "No config file found. Run 'recstore init' first.",
        )
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::InvalidInput, msg)
    }

    /// Get the error code
    pub fn code(&self) -> &CliErrorCode {
        &self.code
    }

    /// Get the error code string
    pub fn code_str(&self) -> &'static str {
        self.code.code()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for CliError {}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        Self::io_error(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::io_error(format!("JSON error: {}", e))
    }
}

impl From<ValidationError> for CliError {
    fn from(e: ValidationError) -> Self {
        Self::invalid_input(e.to_string())
    }
}

impl From<PersistError> for CliError {
    fn from(e: PersistError) -> Self {
        Self::new(CliErrorCode::StorageError, e.to_string())
    }
}

impl From<AuthError> for CliError {
    fn from(e: AuthError) -> Self {
        Self::new(CliErrorCode::AuthFailed, e.to_string())
    }
}

impl From<TableError> for CliError {
    fn from(e: TableError) -> Self {
        let code = match &e {
            TableError::DuplicateId(_) => CliErrorCode::Duplicate,
            TableError::NotFound(_) => CliErrorCode::NotFound,
            TableError::Rejected(_) => CliErrorCode::Rejected,
            TableError::Validation(_) => CliErrorCode::InvalidInput,
            TableError::Persist(_) => CliErrorCode::StorageError,
        };
        Self::new(code, e.to_string())
    }
}

impl From<GuardError> for CliError {
    fn from(e: GuardError) -> Self {
        match e {
            GuardError::Auth(e) => e.into(),
            GuardError::Validation(e) => e.into(),
            GuardError::Table(e) => e.into(),
        }
    }
}

impl From<AccountError> for CliError {
    fn from(e: AccountError) -> Self {
        match e {
            AccountError::InvalidAmount(_) => Self::invalid_input(e.to_string()),
            AccountError::InsufficientFunds { .. } => {
                Self::new(CliErrorCode::Rejected, e.to_string())
            }
            AccountError::MissingBalance(_) => {
                Self::new(CliErrorCode::StorageError, e.to_string())
            }
            AccountError::Auth(e) => e.into(),
            AccountError::Validation(e) => e.into(),
            AccountError::Table(e) => e.into(),
        }
    }
}

impl From<StudentError> for CliError {
    fn from(e: StudentError) -> Self {
        match e {
            StudentError::Validation(e) => e.into(),
            StudentError::Table(e) => e.into(),
            StudentError::MissingField { .. } | StudentError::MissingMark { .. } => {
                Self::new(CliErrorCode::StorageError, e.to_string())
            }
        }
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;
