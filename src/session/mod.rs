//! Session Guard
//!
//! One authenticated identity at a time, proven by a record's hashed secret.

mod crypto;
mod errors;
mod guard;

pub use crypto::{constant_time_eq, hash_secret, verify_secret, SecretPolicy};
pub use errors::{AuthError, AuthResult, GuardError, GuardResult};
pub use guard::{ActiveSession, SessionGuard, SessionToken, SECRET_CHANGED_AUDIT, SECRET_FIELD};
