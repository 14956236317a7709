//! CLI argument definitions using clap
//!
//! Commands:
//! - recstore init --data-dir <dir>
//! - recstore account <open|balance|deposit|withdraw|history|change-pin|seed>
//! - recstore student <add|remove|show|edit|mark|list|rank>

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use super::config::DEFAULT_CONFIG_PATH;
use crate::students::SubjectMark;

/// recstore - crash-consistent record store with ATM and student registry front ends
#[derive(Parser, Debug)]
#[command(name = "recstore")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Write a default config file and create the data directory
    Init {
        /// Data directory to record in the new config
        #[arg(long, default_value = "./data")]
        data_dir: PathBuf,
    },

    /// Bank account operations
    #[command(subcommand)]
    Account(AccountCommand),

    /// Student registry operations
    #[command(subcommand)]
    Student(StudentCommand),
}

/// Account number and PIN for commands that need a session
#[derive(Args, Debug, Clone)]
pub struct Credentials {
    /// Account number
    #[arg(long)]
    pub id: String,

    /// Account PIN
    #[arg(long)]
    pub pin: String,
}

#[derive(Subcommand, Debug)]
pub enum AccountCommand {
    /// Open a new account
    Open {
        #[command(flatten)]
        credentials: Credentials,

        /// Opening balance
        #[arg(long, default_value_t = 0.0)]
        balance: f64,
    },

    /// Show the balance
    Balance {
        #[command(flatten)]
        credentials: Credentials,
    },

    /// Deposit cash
    Deposit {
        #[command(flatten)]
        credentials: Credentials,

        #[arg(long)]
        amount: f64,
    },

    /// Withdraw cash
    Withdraw {
        #[command(flatten)]
        credentials: Credentials,

        #[arg(long)]
        amount: f64,
    },

    /// Show the transaction history
    History {
        #[command(flatten)]
        credentials: Credentials,
    },

    /// Change the PIN
    ChangePin {
        #[command(flatten)]
        credentials: Credentials,

        #[arg(long)]
        new_pin: String,
    },

    /// Create the demo accounts if they do not exist
    Seed,
}

#[derive(Subcommand, Debug)]
pub enum StudentCommand {
    /// Add a student
    Add {
        #[arg(long)]
        roll: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        grade: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        phone: String,
        /// Average mark out of 100, when no subject marks are given
        #[arg(long)]
        score: Option<f64>,
        /// Subject mark out of 100; repeat for each subject
        #[arg(long = "mark", value_name = "SUBJECT=MARK")]
        marks: Vec<SubjectMark>,
    },

    /// Remove a student
    Remove {
        #[arg(long)]
        roll: String,
    },

    /// Show one student
    Show {
        #[arg(long)]
        roll: String,
    },

    /// Change one field (name, grade, email, phone, score)
    Edit {
        #[arg(long)]
        roll: String,
        #[arg(long)]
        field: String,
        #[arg(long)]
        value: String,
    },

    /// Add or replace one subject mark; the score becomes the average
    Mark {
        #[arg(long)]
        roll: String,
        #[arg(long)]
        subject: String,
        #[arg(long)]
        mark: f64,
    },

    /// List students in the order they were added
    List,

    /// Rank students by score with their grade band, flagging top scorers
    Rank,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_withdraw() {
        let cli = Cli::try_parse_from([
            "recstore", "account", "withdraw", "--id", "123456789", "--pin", "1234", "--amount",
            "500",
        ])
        .unwrap();
        assert_eq!(cli.config, PathBuf::from(DEFAULT_CONFIG_PATH));
        match cli.command {
            Command::Account(AccountCommand::Withdraw {
                credentials,
                amount,
            }) => {
                assert_eq!(credentials.id, "123456789");
                assert_eq!(amount, 500.0);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_global_config_flag() {
        let cli =
            Cli::try_parse_from(["recstore", "student", "list", "--config", "/etc/rs.json"])
                .unwrap();
        assert_eq!(cli.config, PathBuf::from("/etc/rs.json"));
    }

    #[test]
    fn test_parse_repeated_marks() {
        let cli = Cli::try_parse_from([
            "recstore", "student", "add", "--roll", "R1", "--name", "Asha", "--grade", "12",
            "--email", "asha@school.edu", "--phone", "9876543210", "--mark", "Maths=95",
            "--mark", "English=85",
        ])
        .unwrap();
        match cli.command {
            Command::Student(StudentCommand::Add { marks, score, .. }) => {
                assert_eq!(score, None);
                assert_eq!(
                    marks,
                    vec![SubjectMark::new("Maths", 95.0), SubjectMark::new("English", 85.0)]
                );
            }
            other => panic!("unexpected command: {:?}", other),
        }

        assert!(Cli::try_parse_from([
            "recstore", "student", "add", "--roll", "R1", "--name", "Asha", "--grade", "12",
            "--email", "asha@school.edu", "--phone", "9876543210", "--mark", "Maths",
        ])
        .is_err());
    }
}
