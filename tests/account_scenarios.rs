//! Account Scenario Tests
//!
//! End-to-end ATM flows over a per-record table:
//! - Balance arithmetic and history wording
//! - Refused withdrawals leave no trace
//! - Concurrent withdrawals never overdraw

use std::fs;
use std::sync::Arc;
use std::thread;

use chrono::{Duration, NaiveDate};
use recstore::accounts::{AccountError, Accounts, CashPolicy};
use recstore::clock::FixedClock;
use recstore::session::SecretPolicy;
use recstore::store::{FileStore, Layout};
use recstore::table::{Table, TableOptions};
use tempfile::TempDir;

fn start() -> FixedClock {
    FixedClock::new(
        NaiveDate::from_ymd_opt(2026, 10, 18)
            .and_then(|d| d.and_hms_opt(9, 15, 0))
            .unwrap(),
    )
}

fn open(tmp: &TempDir, clock: &FixedClock) -> Accounts {
    let store = FileStore::open(tmp.path(), "accounts", Layout::PerRecord).unwrap();
    let table = Table::open(
        store,
        TableOptions {
            audit: true,
            clock: Arc::new(clock.clone()),
        },
    )
    .unwrap();
    Accounts::new(Arc::new(table), SecretPolicy::default(), CashPolicy::default())
}

#[test]
fn test_withdraw_then_deposit() {
    let tmp = TempDir::new().unwrap();
    let clock = start();
    {
        let accounts = open(&tmp, &clock);
        accounts.ensure_sample_accounts().unwrap();

        let token = accounts.login("123456789", "1234").unwrap();
        clock.advance(Duration::seconds(30));
        assert_eq!(accounts.withdraw(&token, 500.0).unwrap(), 9500.0);
        clock.advance(Duration::seconds(30));
        assert_eq!(accounts.deposit(&token, 1500.0).unwrap(), 11000.0);
        accounts.logout(&token).unwrap();
    }

    let accounts = open(&tmp, &clock);
    let token = accounts.login("123456789", "1234").unwrap();
    assert_eq!(accounts.balance(&token).unwrap(), 11000.0);

    let history: Vec<String> = accounts
        .history(&token)
        .unwrap()
        .iter()
        .map(ToString::to_string)
        .collect();
    assert_eq!(
        history,
        vec![
            "18-10-2026 09:15:00 - Account opened with initial balance: ₹10,000.00",
            "18-10-2026 09:15:30 - Withdrawal: ₹500.00",
            "18-10-2026 09:16:00 - Deposit: ₹1,500.00",
        ]
    );

    let file = fs::read_to_string(tmp.path().join("accounts/123456789.rec")).unwrap();
    assert!(file.contains("balance: 11000\n"));
    assert!(file.contains("18-10-2026 09:16:00 - Deposit: ₹1,500.00\n"));
}

#[test]
fn test_refused_withdrawal_leaves_no_trace() {
    let tmp = TempDir::new().unwrap();
    let clock = start();
    let accounts = open(&tmp, &clock);
    accounts.ensure_sample_accounts().unwrap();
    let before = fs::read(tmp.path().join("accounts/987654321.rec")).unwrap();

    let token = accounts.login("987654321", "4321").unwrap();
    match accounts.withdraw(&token, 15000.0) {
        Err(AccountError::InsufficientFunds { available }) => assert_eq!(available, 5000.0),
        other => panic!("expected insufficient funds, got {:?}", other),
    }

    assert_eq!(accounts.balance(&token).unwrap(), 5000.0);
    assert_eq!(accounts.history(&token).unwrap().len(), 1);
    assert_eq!(
        fs::read(tmp.path().join("accounts/987654321.rec")).unwrap(),
        before
    );
}

#[test]
fn test_concurrent_withdrawals_never_overdraw() {
    let tmp = TempDir::new().unwrap();
    let clock = start();
    let accounts = Arc::new(open(&tmp, &clock));
    accounts.ensure_sample_accounts().unwrap();
    let token = accounts.login("123456789", "1234").unwrap();

    let handles: Vec<_> = (0..30)
        .map(|_| {
            let accounts = Arc::clone(&accounts);
            thread::spawn(move || accounts.withdraw(&token, 500.0).is_ok())
        })
        .collect();
    let succeeded = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|ok| *ok)
        .count();

    assert_eq!(succeeded, 20);
    assert_eq!(accounts.balance(&token).unwrap(), 0.0);
    assert_eq!(accounts.history(&token).unwrap().len(), 21);
}

#[test]
fn test_custom_cash_policy() {
    let tmp = TempDir::new().unwrap();
    let store = FileStore::open(tmp.path(), "accounts", Layout::PerTable).unwrap();
    let table = Arc::new(Table::open(store, TableOptions::default()).unwrap());
    let accounts = Accounts::new(
        table,
        SecretPolicy::default(),
        CashPolicy {
            minimum: 20.0,
            multiple: 20.0,
        },
    );
    accounts.open("42", "0042", 100.0).unwrap();

    let token = accounts.login("42", "0042").unwrap();
    assert_eq!(accounts.withdraw(&token, 40.0).unwrap(), 60.0);
    assert!(matches!(
        accounts.withdraw(&token, 30.0),
        Err(AccountError::InvalidAmount(_))
    ));
}
