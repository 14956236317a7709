//! # Session Guard
//!
//! Gatekeeper for record-scoped mutations: a caller proves knowledge of a
//! record's secret once and receives a token; every later mutation presents
//! the token.
//!
//! ## Invariants
//! - At most one active session per guard
//! - Unknown id and wrong secret are indistinguishable, in result and cost
//! - Logout invalidates the token immediately

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{info, warn};
use uuid::Uuid;

use super::crypto::{constant_time_eq, dummy_hash, hash_secret, verify_secret, SecretPolicy};
use super::errors::{AuthError, AuthResult, GuardResult};
use crate::codec::Record;
use crate::table::{Table, TableError, TableResult};

/// Field holding the secret hash
pub const SECRET_FIELD: &str = "pin";

/// Audit description written on a secret change
pub const SECRET_CHANGED_AUDIT: &str = "PIN changed";

/// Opaque proof of authentication
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct SessionToken(Uuid);

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken(..)")
    }
}

#[derive(Debug)]
struct Active {
    token: SessionToken,
    id: String,
}

/// Single-session guard over one table
pub struct SessionGuard {
    table: Arc<Table>,
    policy: SecretPolicy,
    active: Mutex<Option<Active>>,
}

impl SessionGuard {
    pub fn new(table: Arc<Table>, policy: SecretPolicy) -> Self {
        Self {
            table,
            policy,
            active: Mutex::new(None),
        }
    }

    pub fn table(&self) -> &Arc<Table> {
        &self.table
    }

    pub fn policy(&self) -> SecretPolicy {
        self.policy
    }

    pub fn is_active(&self) -> bool {
        self.lock_active().is_some()
    }

    /// Authenticates `id` with `secret`.
    ///
    /// # Errors
    ///
    /// `SessionAlreadyActive` while another session is open (checked before
    /// any credential work); `InvalidCredentials` for an unknown id, a record
    /// without a secret, or a wrong secret.
    pub fn authenticate(&self, id: &str, secret: &str) -> AuthResult<SessionToken> {
        let mut active = self.lock_active();
        if active.is_some() {
            return Err(AuthError::SessionAlreadyActive);
        }

        let stored = self
            .table
            .find_by_id(id)
            .ok()
            .and_then(|record| record.text(SECRET_FIELD).map(str::to_string));

        let verified = match stored {
            Some(hash) => verify_secret(secret, &hash).unwrap_or(false),
            None => {
                // Same work as a real check, result discarded.
                let _ = verify_secret(secret, dummy_hash());
                false
            }
        };

        if !verified {
            warn!(table = %self.table.name(), id = %id, "authentication failed");
            return Err(AuthError::InvalidCredentials);
        }

        let token = SessionToken(Uuid::new_v4());
        *active = Some(Active {
            token,
            id: id.to_string(),
        });
        info!(table = %self.table.name(), id = %id, "session started");
        Ok(token)
    }

    /// Resolves `token` to the active session.
    pub fn require_active(&self, token: &SessionToken) -> AuthResult<ActiveSession<'_>> {
        let id = self.active_id(token)?;
        Ok(ActiveSession {
            guard: self,
            token: *token,
            id,
        })
    }

    /// Checks `secret` against the active record's stored secret.
    pub fn verify_secret(&self, token: &SessionToken, secret: &str) -> GuardResult<bool> {
        let session = self.require_active(token)?;
        let record = session.record()?;
        let hash = record
            .text(SECRET_FIELD)
            .ok_or(AuthError::InvalidCredentials)?;
        Ok(verify_secret(secret, hash)?)
    }

    /// Replaces the active record's secret.
    ///
    /// The new secret must satisfy the policy; the record gains a
    /// `PIN changed` audit entry.
    pub fn change_secret(&self, token: &SessionToken, new_secret: &str) -> GuardResult<()> {
        let session = self.require_active(token)?;
        self.policy.validate(new_secret)?;
        let hash = hash_secret(new_secret)?;

        session.update(|record| -> GuardResult<String> {
            record.set(SECRET_FIELD, hash).map_err(TableError::from)?;
            Ok(SECRET_CHANGED_AUDIT.to_string())
        })?;
        info!(table = %self.table.name(), id = %session.id(), "secret changed");
        Ok(())
    }

    /// Ends the session. The token is useless afterwards.
    pub fn logout(&self, token: &SessionToken) -> AuthResult<()> {
        let mut active = self.lock_active();
        match active.as_ref() {
            Some(current) if tokens_match(&current.token, token) => {
                info!(table = %self.table.name(), id = %current.id, "session ended");
                *active = None;
                Ok(())
            }
            _ => Err(AuthError::NoActiveSession),
        }
    }

    fn active_id(&self, token: &SessionToken) -> AuthResult<String> {
        matching_id(&self.lock_active(), token).map(str::to_string)
    }

    fn lock_active(&self) -> MutexGuard<'_, Option<Active>> {
        self.active.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl fmt::Debug for SessionGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionGuard")
            .field("table", &self.table.name())
            .field("active", &self.is_active())
            .finish()
    }
}

fn tokens_match(a: &SessionToken, b: &SessionToken) -> bool {
    constant_time_eq(a.0.as_bytes(), b.0.as_bytes())
}

fn matching_id<'a>(active: &'a Option<Active>, token: &SessionToken) -> AuthResult<&'a str> {
    match active {
        Some(current) if tokens_match(&current.token, token) => Ok(&current.id),
        _ => Err(AuthError::NoActiveSession),
    }
}

/// Handle to the authenticated record.
///
/// Every call re-checks the token, so a handle kept past logout fails with
/// `NoActiveSession`.
pub struct ActiveSession<'a> {
    guard: &'a SessionGuard,
    token: SessionToken,
    id: String,
}

impl<'a> ActiveSession<'a> {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Snapshot of the authenticated record.
    pub fn record(&self) -> GuardResult<Record> {
        self.guard.active_id(&self.token)?;
        Ok(self.guard.table.find_by_id(&self.id)?)
    }

    /// Mutates the authenticated record through the table.
    ///
    /// The session stays locked until the commit finishes, so a concurrent
    /// logout waits for it. The mutator must not call back into the guard.
    pub fn update<F, E>(&self, mutator: F) -> Result<Record, E>
    where
        F: FnOnce(&mut Record) -> Result<String, E>,
        E: From<TableError> + From<AuthError>,
    {
        let active = self.guard.lock_active();
        matching_id(&active, &self.token)?;
        self.guard.table.update(&self.id, mutator)
    }

    /// Mutation shortcut for callers that only produce table errors.
    pub fn update_fields<F>(&self, mutator: F) -> GuardResult<Record>
    where
        F: FnOnce(&mut Record) -> TableResult<String>,
    {
        self.update(|record| mutator(record).map_err(Into::into))
    }
}

impl fmt::Debug for ActiveSession<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActiveSession").field("id", &self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::GuardError;
    use crate::store::{FileStore, Layout};
    use crate::table::TableOptions;
    use crate::validation::ValidationError;
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;
    use tempfile::TempDir;

    fn guard(tmp: &TempDir) -> SessionGuard {
        let store = FileStore::open(tmp.path(), "accounts", Layout::PerRecord).unwrap();
        let table = Table::open(store, TableOptions::default()).unwrap();
        let record = Record::new("123456789")
            .unwrap()
            .with(SECRET_FIELD, hash_secret("1234").unwrap())
            .unwrap();
        table.insert(record).unwrap();
        SessionGuard::new(Arc::new(table), SecretPolicy::default())
    }

    #[test]
    fn test_authenticate_and_logout() {
        let tmp = TempDir::new().unwrap();
        let guard = guard(&tmp);

        let token = guard.authenticate("123456789", "1234").unwrap();
        assert!(guard.is_active());
        assert_eq!(guard.require_active(&token).unwrap().id(), "123456789");

        guard.logout(&token).unwrap();
        assert!(!guard.is_active());
        assert_eq!(
            guard.require_active(&token).unwrap_err(),
            AuthError::NoActiveSession
        );
        assert_eq!(guard.logout(&token), Err(AuthError::NoActiveSession));
    }

    #[test]
    fn test_unknown_and_wrong_are_the_same_error() {
        let tmp = TempDir::new().unwrap();
        let guard = guard(&tmp);

        assert_eq!(
            guard.authenticate("000000000", "1234"),
            Err(AuthError::InvalidCredentials)
        );
        assert_eq!(
            guard.authenticate("123456789", "9999"),
            Err(AuthError::InvalidCredentials)
        );
        assert!(!guard.is_active());
    }

    #[test]
    fn test_second_authenticate_is_refused() {
        let tmp = TempDir::new().unwrap();
        let guard = guard(&tmp);

        let _token = guard.authenticate("123456789", "1234").unwrap();
        assert_eq!(
            guard.authenticate("123456789", "1234"),
            Err(AuthError::SessionAlreadyActive)
        );
    }

    #[test]
    fn test_forged_token_rejected() {
        let tmp = TempDir::new().unwrap();
        let guard = guard(&tmp);
        let _token = guard.authenticate("123456789", "1234").unwrap();

        let forged = SessionToken(Uuid::new_v4());
        assert_eq!(
            guard.require_active(&forged).unwrap_err(),
            AuthError::NoActiveSession
        );
    }

    #[test]
    fn test_logout_waits_for_inflight_update() {
        let tmp = TempDir::new().unwrap();
        let guard = guard(&tmp);
        let token = guard.authenticate("123456789", "1234").unwrap();
        let (started_tx, started_rx) = mpsc::channel();

        thread::scope(|s| {
            let guard = &guard;
            let updater = s.spawn(move || -> GuardResult<Record> {
                guard.require_active(&token)?.update_fields(|record| {
                    started_tx.send(()).unwrap();
                    thread::sleep(Duration::from_millis(100));
                    record.set("balance", 1.0)?;
                    Ok("slow change".to_string())
                })
            });

            started_rx.recv().unwrap();
            guard.logout(&token).unwrap();
            let record = guard.table().find_by_id("123456789").unwrap();
            assert_eq!(record.number("balance"), Some(1.0));
            assert!(updater.join().unwrap().is_ok());
        });

        assert_eq!(
            guard.require_active(&token).unwrap_err(),
            AuthError::NoActiveSession
        );
    }

    #[test]
    fn test_change_secret() {
        let tmp = TempDir::new().unwrap();
        let guard = guard(&tmp);
        let token = guard.authenticate("123456789", "1234").unwrap();

        guard.change_secret(&token, "0420").unwrap();
        assert!(guard.verify_secret(&token, "0420").unwrap());
        assert!(!guard.verify_secret(&token, "1234").unwrap());

        let record = guard.require_active(&token).unwrap().record().unwrap();
        assert_eq!(record.audit().len(), 1);
        assert_eq!(record.audit()[0].description(), SECRET_CHANGED_AUDIT);

        guard.logout(&token).unwrap();
        assert!(guard.authenticate("123456789", "0420").is_ok());
    }

    #[test]
    fn test_change_secret_rejects_bad_format() {
        let tmp = TempDir::new().unwrap();
        let guard = guard(&tmp);
        let token = guard.authenticate("123456789", "1234").unwrap();

        let err = guard.change_secret(&token, "12ab").unwrap_err();
        assert!(matches!(err, GuardError::Validation(ValidationError::BadFormat(_))));
        assert!(guard.verify_secret(&token, "1234").unwrap());

        let record = guard.require_active(&token).unwrap().record().unwrap();
        assert!(record.audit().is_empty());
    }

    #[test]
    fn test_stale_handle_fails_after_logout() {
        let tmp = TempDir::new().unwrap();
        let guard = guard(&tmp);
        let token = guard.authenticate("123456789", "1234").unwrap();
        let session = guard.require_active(&token).unwrap();

        guard.logout(&token).unwrap();
        let err = session
            .update_fields(|r| {
                r.set("balance", 1.0)?;
                Ok("should not happen".to_string())
            })
            .unwrap_err();
        assert!(matches!(err, GuardError::Auth(AuthError::NoActiveSession)));
    }
}
