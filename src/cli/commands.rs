//! CLI command implementations
//!
//! Each invocation loads the config, opens the table it needs, performs one
//! operation and prints one JSON response. Account commands authenticate,
//! act, then log out.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde_json::{json, Value};
use tracing::debug;

use super::args::{AccountCommand, Cli, Command, Credentials, StudentCommand};
use super::config::Config;
use super::errors::{CliError, CliResult};
use super::io::write_response;
use crate::accounts::{format_amount, AccountResult, Accounts};
use crate::session::SessionToken;
use crate::store::{FileStore, Layout};
use crate::students::{EditableField, Student, Students, SubjectMark};
use crate::table::Table;

/// Table holding bank accounts
pub const ACCOUNTS_TABLE: &str = "accounts";

/// Table holding students
pub const STUDENTS_TABLE: &str = "students";

/// Main CLI entry point
///
/// Parses arguments and dispatches to the appropriate command.
/// This is the only function that main.rs should call.
pub fn run() -> CliResult<()> {
    run_command(Cli::parse_args())
}

/// Run the appropriate command based on CLI args
pub fn run_command(cli: Cli) -> CliResult<()> {
    let response = match cli.command {
        Command::Init { data_dir } => init(&cli.config, &data_dir)?,
        Command::Account(cmd) => account(&Config::load(&cli.config)?, cmd)?,
        Command::Student(cmd) => student(&Config::load(&cli.config)?, cmd)?,
    };
    write_response(response)
}

/// Write a default config and create the data directory.
///
/// Refuses to overwrite an existing config file.
pub fn init(config_path: &Path, data_dir: &Path) -> CliResult<Value> {
    let config = Config::with_data_dir(data_dir.to_string_lossy());
    config.validate()?;
    config.write_new(config_path)?;

    fs::create_dir_all(config.data_path()).map_err(|e| {
        CliError::config_error(format!(
            "Failed to create directory {:?}: {}",
            config.data_path(),
            e
        ))
    })?;

    Ok(json!({
        "initialized": true,
        "config": config_path.to_string_lossy(),
        "data_dir": config.data_dir,
    }))
}

fn open_table(config: &Config, name: &str, layout: Layout) -> CliResult<Arc<Table>> {
    let store = FileStore::open(config.data_path(), name, layout)?;
    let table = Table::open(store, config.table_options())?;
    debug!(table = %name, records = table.len(), "table ready");
    Ok(Arc::new(table))
}

/// Opens the accounts table configured by `config`.
pub fn open_accounts(config: &Config) -> CliResult<Accounts> {
    let table = open_table(config, ACCOUNTS_TABLE, config.account_layout())?;
    Ok(Accounts::new(
        table,
        config.secret_policy(),
        config.cash_policy(),
    ))
}

/// Opens the students table. Students always live in one file.
pub fn open_students(config: &Config) -> CliResult<Students> {
    Ok(Students::new(open_table(
        config,
        STUDENTS_TABLE,
        Layout::PerTable,
    )?))
}

/// Runs `op` inside a session for `credentials`, logging out afterwards
/// whether or not `op` succeeded.
fn with_session<T>(
    accounts: &Accounts,
    credentials: &Credentials,
    op: impl FnOnce(&SessionToken) -> AccountResult<T>,
) -> CliResult<T> {
    let token = accounts.login(&credentials.id, &credentials.pin)?;
    let result = op(&token);
    accounts.logout(&token)?;
    Ok(result?)
}

pub fn account(config: &Config, cmd: AccountCommand) -> CliResult<Value> {
    let accounts = open_accounts(config)?;

    match cmd {
        AccountCommand::Open {
            credentials,
            balance,
        } => {
            accounts.open(&credentials.id, &credentials.pin, balance)?;
            Ok(json!({ "opened": credentials.id, "balance": format_amount(balance) }))
        }
        AccountCommand::Balance { credentials } => {
            let balance = with_session(&accounts, &credentials, |t| accounts.balance(t))?;
            Ok(json!({ "account": credentials.id, "balance": format_amount(balance) }))
        }
        AccountCommand::Deposit {
            credentials,
            amount,
        } => {
            let balance =
                with_session(&accounts, &credentials, |t| accounts.deposit(t, amount))?;
            Ok(json!({
                "account": credentials.id,
                "deposited": format_amount(amount),
                "balance": format_amount(balance),
            }))
        }
        AccountCommand::Withdraw {
            credentials,
            amount,
        } => {
            let balance =
                with_session(&accounts, &credentials, |t| accounts.withdraw(t, amount))?;
            Ok(json!({
                "account": credentials.id,
                "withdrawn": format_amount(amount),
                "balance": format_amount(balance),
            }))
        }
        AccountCommand::History { credentials } => {
            let history = with_session(&accounts, &credentials, |t| accounts.history(t))?;
            let entries: Vec<String> = history.iter().map(ToString::to_string).collect();
            Ok(json!({ "account": credentials.id, "history": entries }))
        }
        AccountCommand::ChangePin {
            credentials,
            new_pin,
        } => {
            with_session(&accounts, &credentials, |t| {
                accounts.change_pin(t, &credentials.pin, &new_pin)
            })?;
            Ok(json!({ "account": credentials.id, "pin_changed": true }))
        }
        AccountCommand::Seed => {
            let created = accounts.ensure_sample_accounts()?;
            Ok(json!({ "created": created, "accounts": accounts.account_ids() }))
        }
    }
}

pub fn student(config: &Config, cmd: StudentCommand) -> CliResult<Value> {
    let students = open_students(config)?;

    match cmd {
        StudentCommand::Add {
            roll,
            name,
            grade,
            email,
            phone,
            score,
            marks,
        } => {
            let mut student = Student::new(
                roll.trim(),
                name.trim(),
                grade.trim(),
                email.trim(),
                phone.trim(),
            );
            if marks.is_empty() {
                student.score = score;
            } else if score.is_some() {
                return Err(CliError::invalid_input(
                    "--score cannot be combined with --mark; the score is the average of the marks",
                ));
            } else {
                student = student.with_marks(marks);
            }
            students.add(&student)?;
            Ok(json!({ "added": student }))
        }
        StudentCommand::Remove { roll } => {
            let removed = students.remove(&roll)?;
            Ok(json!({ "removed": removed }))
        }
        StudentCommand::Show { roll } => Ok(json!({ "student": students.find(&roll)? })),
        StudentCommand::Edit { roll, field, value } => {
            let field: EditableField = field.parse()?;
            let student = students.edit(&roll, field, &value)?;
            Ok(json!({ "updated": student }))
        }
        StudentCommand::Mark {
            roll,
            subject,
            mark,
        } => {
            let student = students.record_mark(&roll, &SubjectMark::new(subject.trim(), mark))?;
            Ok(json!({ "updated": student, "total": student.total() }))
        }
        StudentCommand::List => {
            let list = students.list()?;
            Ok(json!({ "total": list.len(), "students": list }))
        }
        StudentCommand::Rank => {
            let ranking = students.rank()?;
            let top_score = ranking.first().and_then(|r| r.student.score);
            let ranked: Vec<Value> = ranking
                .into_iter()
                .enumerate()
                .map(|(i, r)| {
                    json!({
                        "rank": i + 1,
                        "roll_number": r.student.roll_number,
                        "name": r.student.name,
                        "marks": r.student.marks,
                        "total": r.student.total(),
                        "score": r.student.score,
                        "grade": r.band.map(|b| b.letter),
                        "comment": r.band.map(|b| b.comment),
                        "top": r.top,
                    })
                })
                .collect();
            Ok(json!({ "top_score": top_score, "ranking": ranked }))
        }
    }
}
