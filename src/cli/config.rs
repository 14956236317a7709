//! Configuration file
//!
//! JSON, `./recstore.json` unless `--config` says otherwise. Only
//! `data_dir` is required.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::errors::{CliError, CliResult};
use crate::accounts::CashPolicy;
use crate::session::SecretPolicy;
use crate::store::Layout;
use crate::table::TableOptions;

/// Default config file location
pub const DEFAULT_CONFIG_PATH: &str = "./recstore.json";

/// Configuration file structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Data directory (required)
    pub data_dir: String,

    /// Account storage layout: "record" (one file per account) or "table"
    #[serde(default = "default_layout")]
    pub layout: String,

    /// Keep per-record audit logs (default: true)
    #[serde(default = "default_audit")]
    pub audit: bool,

    /// Number of digits in a PIN (default: 4)
    #[serde(default = "default_secret_length")]
    pub secret_length: usize,

    /// Deposit and withdrawal limits
    #[serde(default)]
    pub cash: CashConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashConfig {
    #[serde(default = "default_cash_step")]
    pub minimum: f64,

    #[serde(default = "default_cash_step")]
    pub multiple: f64,
}

impl Default for CashConfig {
    fn default() -> Self {
        Self {
            minimum: default_cash_step(),
            multiple: default_cash_step(),
        }
    }
}

fn default_layout() -> String {
    "record".to_string()
}
fn default_audit() -> bool {
    true
}
fn default_secret_length() -> usize {
    4
}
fn default_cash_step() -> f64 {
    100.0
}

impl Config {
    /// Defaults with the given data directory
    pub fn with_data_dir(data_dir: impl Into<String>) -> Self {
        Self {
            data_dir: data_dir.into(),
            layout: default_layout(),
            audit: default_audit(),
            secret_length: default_secret_length(),
            cash: CashConfig::default(),
        }
    }

    /// Load configuration from file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(CliError::not_initialized())
            }
            Err(e) => {
                return Err(CliError::config_error(format!(
                    "Failed to read config: {}",
                    e
                )))
            }
        };

        let config: Config = serde_json::from_str(&content)
            .map_err(|e| CliError::config_error(format!("Invalid config JSON: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    /// Write as a new file; never overwrites.
    pub fn write_new(&self, path: &Path) -> CliResult<()> {
        let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                return Err(CliError::already_initialized())
            }
            Err(e) => {
                return Err(CliError::config_error(format!(
                    "Failed to create config {:?}: {}",
                    path, e
                )))
            }
        };

        serde_json::to_writer_pretty(&mut file, self)?;
        writeln!(file)?;
        file.sync_all()?;
        Ok(())
    }

    pub fn validate(&self) -> CliResult<()> {
        if self.data_dir.trim().is_empty() {
            return Err(CliError::config_error("data_dir must not be empty"));
        }

        if Layout::parse(&self.layout).is_none() {
            return Err(CliError::config_error(format!(
                "Invalid layout: '{}'. Must be 'table' or 'record'.",
                self.layout
            )));
        }

        if self.secret_length == 0 || self.secret_length > 12 {
            return Err(CliError::config_error("secret_length must be between 1 and 12"));
        }

        if !self.cash.minimum.is_finite() || self.cash.minimum <= 0.0 {
            return Err(CliError::config_error("cash.minimum must be > 0"));
        }

        if !self.cash.multiple.is_finite() || self.cash.multiple < 0.0 {
            return Err(CliError::config_error("cash.multiple must be >= 0"));
        }

        Ok(())
    }

    /// Get data directory as Path
    pub fn data_path(&self) -> &Path {
        Path::new(&self.data_dir)
    }

    pub fn account_layout(&self) -> Layout {
        Layout::parse(&self.layout).unwrap_or(Layout::PerRecord)
    }

    pub fn secret_policy(&self) -> SecretPolicy {
        SecretPolicy::new(self.secret_length)
    }

    pub fn cash_policy(&self) -> CashPolicy {
        CashPolicy {
            minimum: self.cash.minimum,
            multiple: self.cash.multiple,
        }
    }

    pub fn table_options(&self) -> TableOptions {
        TableOptions {
            audit: self.audit,
            ..TableOptions::default()
        }
    }
}
