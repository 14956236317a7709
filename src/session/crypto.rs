//! # Secret Hashing
//!
//! Secrets are stored only as Argon2id PHC strings and compared in
//! constant time.

use std::sync::OnceLock;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use subtle::ConstantTimeEq;

use super::errors::{AuthError, AuthResult};
use crate::validation::{ValidationError, ValidationResult};

/// Secret format requirements
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SecretPolicy {
    /// Exact number of ASCII digits
    pub length: usize,
}

impl Default for SecretPolicy {
    fn default() -> Self {
        Self { length: 4 }
    }
}

impl SecretPolicy {
    pub fn new(length: usize) -> Self {
        Self { length }
    }

    /// Validate a secret against this policy
    pub fn validate(&self, secret: &str) -> ValidationResult<()> {
        if secret.len() == self.length && secret.bytes().all(|b| b.is_ascii_digit()) {
            Ok(())
        } else {
            Err(ValidationError::bad_format(format!(
                "PIN must be exactly {} digits",
                self.length
            )))
        }
    }
}

/// Hash a secret using Argon2id
pub fn hash_secret(secret: &str) -> AuthResult<String> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(secret.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::HashingFailed)
}

/// Verify a secret against its stored hash
pub fn verify_secret(secret: &str, hash: &str) -> AuthResult<bool> {
    let parsed = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;

    Ok(Argon2::default()
        .verify_password(secret.as_bytes(), &parsed)
        .is_ok())
}

/// Hash verified against when the identity is unknown, so both failure
/// paths cost the same.
pub(crate) fn dummy_hash() -> &'static str {
    static DUMMY: OnceLock<String> = OnceLock::new();
    DUMMY.get_or_init(|| hash_secret("dummy-secret").unwrap_or_default())
}

/// Constant-time comparison of two byte slices
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.ct_eq(b).into()
}
