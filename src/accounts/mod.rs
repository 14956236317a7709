//! Accounts
//!
//! ATM-style bank accounts: one record per account, PIN-gated sessions, and
//! the record's audit log as the transaction history.

mod errors;
mod ledger;
mod policy;

pub use errors::{AccountError, AccountResult};
pub use ledger::{Accounts, BALANCE_FIELD, SAMPLE_ACCOUNTS};
pub use policy::{format_amount, CashPolicy, CURRENCY};
