//! recstore - a small, crash-consistent embedded record store
//!
//! Records are keyed text documents with an append-only audit log. A
//! [`table::Table`] keeps them in memory and commits every mutation to its
//! [`store::FileStore`] before the mutation becomes visible. On top sit a
//! PIN-gated [`session::SessionGuard`], ATM-style [`accounts`] and a
//! [`students`] registry.

pub mod accounts;
pub mod cli;
pub mod clock;
pub mod codec;
pub mod crash_point;
pub mod session;
pub mod store;
pub mod students;
pub mod table;
pub mod validation;
