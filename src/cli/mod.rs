//! CLI module for recstore
//!
//! Provides command-line interface for:
//! - init: write a config file and create the data directory
//! - account: ATM operations (open, balance, deposit, withdraw, history,
//!   change-pin, seed)
//! - student: registry operations (add, remove, show, edit, list, rank)

mod args;
mod commands;
mod config;
mod errors;
mod io;

pub use args::{AccountCommand, Cli, Command, Credentials, StudentCommand};
pub use commands::{
    account, init, open_accounts, open_students, run, run_command, student, ACCOUNTS_TABLE,
    STUDENTS_TABLE,
};
pub use config::{CashConfig, Config, DEFAULT_CONFIG_PATH};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::write_response;
