//! Session Guard Tests
//!
//! Tests for invariants:
//! - One active session per guard
//! - Unknown id and wrong secret are indistinguishable
//! - Secrets are stored hashed, and a changed secret survives a restart

use std::fs;
use std::sync::Arc;

use recstore::codec::Record;
use recstore::session::{
    hash_secret, AuthError, GuardError, SecretPolicy, SessionGuard, SECRET_FIELD,
};
use recstore::store::{FileStore, Layout};
use recstore::table::{Table, TableOptions};
use tempfile::TempDir;

fn open_guard(tmp: &TempDir) -> SessionGuard {
    let store = FileStore::open(tmp.path(), "accounts", Layout::PerRecord).unwrap();
    let table = Table::open(store, TableOptions::default()).unwrap();
    SessionGuard::new(Arc::new(table), SecretPolicy::default())
}

fn seed(tmp: &TempDir) {
    let guard = open_guard(tmp);
    for (id, pin) in [("123456789", "1234"), ("987654321", "4321")] {
        let record = Record::new(id)
            .unwrap()
            .with(SECRET_FIELD, hash_secret(pin).unwrap())
            .unwrap();
        guard.table().insert(record).unwrap();
    }
}

#[test]
fn test_one_session_at_a_time() {
    let tmp = TempDir::new().unwrap();
    seed(&tmp);
    let guard = open_guard(&tmp);

    let first = guard.authenticate("123456789", "1234").unwrap();
    assert_eq!(
        guard.authenticate("987654321", "4321"),
        Err(AuthError::SessionAlreadyActive)
    );

    guard.logout(&first).unwrap();
    let second = guard.authenticate("987654321", "4321").unwrap();
    assert_ne!(first, second);
    assert_eq!(guard.require_active(&second).unwrap().id(), "987654321");
    assert!(guard.require_active(&first).is_err());
}

#[test]
fn test_failures_are_indistinguishable() {
    let tmp = TempDir::new().unwrap();
    seed(&tmp);
    let guard = open_guard(&tmp);

    let unknown = guard.authenticate("555555555", "1234").unwrap_err();
    let wrong = guard.authenticate("123456789", "4321").unwrap_err();
    assert_eq!(unknown, wrong);
    assert_eq!(unknown.to_string(), "Invalid credentials");
}

#[test]
fn test_secret_never_stored_in_clear() {
    let tmp = TempDir::new().unwrap();
    seed(&tmp);

    let on_disk = fs::read_to_string(tmp.path().join("accounts/123456789.rec")).unwrap();
    assert!(on_disk.contains("$argon2id$"));
    assert!(!on_disk.contains("pin: \"1234\""));
}

#[test]
fn test_changed_secret_survives_restart() {
    let tmp = TempDir::new().unwrap();
    seed(&tmp);
    {
        let guard = open_guard(&tmp);
        let token = guard.authenticate("123456789", "1234").unwrap();
        guard.change_secret(&token, "9999").unwrap();
        guard.logout(&token).unwrap();
    }

    let guard = open_guard(&tmp);
    assert_eq!(
        guard.authenticate("123456789", "1234"),
        Err(AuthError::InvalidCredentials)
    );
    let token = guard.authenticate("123456789", "9999").unwrap();
    let record = guard.require_active(&token).unwrap().record().unwrap();
    let audit: Vec<&str> = record.audit().iter().map(|e| e.description()).collect();
    assert_eq!(audit, vec!["PIN changed"]);
}

#[test]
fn test_policy_length_is_configurable() {
    let tmp = TempDir::new().unwrap();
    seed(&tmp);
    let store = FileStore::open(tmp.path(), "accounts", Layout::PerRecord).unwrap();
    let table = Arc::new(Table::open(store, TableOptions::default()).unwrap());
    let guard = SessionGuard::new(table, SecretPolicy::new(6));

    let token = guard.authenticate("123456789", "1234").unwrap();
    assert!(matches!(
        guard.change_secret(&token, "5678"),
        Err(GuardError::Validation(_))
    ));
    guard.change_secret(&token, "567890").unwrap();
    assert!(guard.verify_secret(&token, "567890").unwrap());
}
