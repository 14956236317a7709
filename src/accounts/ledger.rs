//! Account ledger
//!
//! Bank accounts as records: a hashed `pin`, a numeric `balance`, and the
//! audit log as transaction history. Money moves only through an
//! authenticated session.

use std::sync::Arc;

use tracing::info;

use super::errors::{AccountError, AccountResult};
use super::policy::{format_amount, CashPolicy};
use crate::codec::{AuditEntry, Record};
use crate::session::{
    hash_secret, AuthError, SecretPolicy, SessionGuard, SessionToken, SECRET_FIELD,
};
use crate::table::{Order, Table, TableError};

/// Field holding the balance
pub const BALANCE_FIELD: &str = "balance";

/// Demo accounts created by [`Accounts::ensure_sample_accounts`]
pub const SAMPLE_ACCOUNTS: [(&str, &str, f64); 2] = [
    ("123456789", "1234", 10000.00),
    ("987654321", "4321", 5000.00),
];

/// Bank accounts over one table
#[derive(Debug)]
pub struct Accounts {
    guard: SessionGuard,
    cash: CashPolicy,
}

impl Accounts {
    pub fn new(table: Arc<Table>, secret: SecretPolicy, cash: CashPolicy) -> Self {
        Self {
            guard: SessionGuard::new(table, secret),
            cash,
        }
    }

    pub fn guard(&self) -> &SessionGuard {
        &self.guard
    }

    pub fn cash_policy(&self) -> CashPolicy {
        self.cash
    }

    fn table(&self) -> &Table {
        self.guard.table()
    }

    /// Opens a new account.
    ///
    /// # Errors
    ///
    /// `Validation` for a bad id or PIN, `InvalidAmount` for a negative or
    /// non-finite balance, `Table(DuplicateId)` if the account exists.
    pub fn open(&self, id: &str, pin: &str, initial_balance: f64) -> AccountResult<()> {
        self.guard.policy().validate(pin)?;
        if !initial_balance.is_finite() || initial_balance < 0.0 {
            return Err(AccountError::InvalidAmount(
                "initial balance must not be negative".to_string(),
            ));
        }

        let mut record = Record::new(id)?
            .with(SECRET_FIELD, hash_secret(pin)?)?
            .with(BALANCE_FIELD, initial_balance)?;
        if self.table().audit_enabled() {
            record.append_audit(AuditEntry::new(
                self.table().now(),
                format!(
                    "Account opened with initial balance: {}",
                    format_amount(initial_balance)
                ),
            ));
        }

        self.table().insert(record)?;
        info!(account = %id, "account opened");
        Ok(())
    }

    /// Creates the demo accounts that do not exist yet. Returns how many
    /// were created.
    pub fn ensure_sample_accounts(&self) -> AccountResult<usize> {
        let mut created = 0;
        for (id, pin, balance) in SAMPLE_ACCOUNTS {
            if self.table().contains(id) {
                continue;
            }
            match self.open(id, pin, balance) {
                Ok(()) => created += 1,
                Err(AccountError::Table(TableError::DuplicateId(_))) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(created)
    }

    pub fn login(&self, id: &str, pin: &str) -> AccountResult<SessionToken> {
        Ok(self.guard.authenticate(id, pin)?)
    }

    pub fn logout(&self, token: &SessionToken) -> AccountResult<()> {
        Ok(self.guard.logout(token)?)
    }

    pub fn balance(&self, token: &SessionToken) -> AccountResult<f64> {
        let record = self.guard.require_active(token)?.record()?;
        balance_of(&record)
    }

    /// Deposits `amount`, returning the new balance.
    pub fn deposit(&self, token: &SessionToken, amount: f64) -> AccountResult<f64> {
        self.cash.check_deposit(amount)?;
        let session = self.guard.require_active(token)?;

        let record = session.update(|record| -> AccountResult<String> {
            let balance = balance_of(record)?;
            record.set(BALANCE_FIELD, balance + amount)?;
            Ok(format!("Deposit: {}", format_amount(amount)))
        })?;

        info!(account = %session.id(), amount, "deposit");
        balance_of(&record)
    }

    /// Withdraws `amount`, returning the new balance.
    ///
    /// The balance check happens under the table's writer lock, so two
    /// withdrawals can never both pass against the same balance.
    pub fn withdraw(&self, token: &SessionToken, amount: f64) -> AccountResult<f64> {
        self.cash.check_withdrawal(amount)?;
        let session = self.guard.require_active(token)?;

        let record = session.update(|record| -> AccountResult<String> {
            let balance = balance_of(record)?;
            if amount > balance {
                return Err(AccountError::InsufficientFunds { available: balance });
            }
            record.set(BALANCE_FIELD, balance - amount)?;
            Ok(format!("Withdrawal: {}", format_amount(amount)))
        })?;

        info!(account = %session.id(), amount, "withdrawal");
        balance_of(&record)
    }

    /// Transaction history, oldest first.
    pub fn history(&self, token: &SessionToken) -> AccountResult<Vec<AuditEntry>> {
        let record = self.guard.require_active(token)?.record()?;
        Ok(record.audit().to_vec())
    }

    /// Changes the PIN after re-checking the current one.
    pub fn change_pin(
        &self,
        token: &SessionToken,
        current_pin: &str,
        new_pin: &str,
    ) -> AccountResult<()> {
        if !self.guard.verify_secret(token, current_pin)? {
            return Err(AuthError::InvalidCredentials.into());
        }
        self.guard.change_secret(token, new_pin)?;
        Ok(())
    }

    /// Account numbers, in identifier order.
    pub fn account_ids(&self) -> Vec<String> {
        self.table()
            .list_all(Order::ById)
            .iter()
            .map(|record| record.id().to_string())
            .collect()
    }
}

fn balance_of(record: &Record) -> AccountResult<f64> {
    record
        .number(BALANCE_FIELD)
        .ok_or_else(|| AccountError::MissingBalance(record.id().to_string()))
}
