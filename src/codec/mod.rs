//! Record Codec
//!
//! Pure, stateless conversion between records and their durable text form.
//!
//! # Design Principles
//!
//! - One field per line, `key: value`, human-diffable
//! - Deterministic: the same record always encodes to the same bytes
//! - `decode(encode(r)) == r` for every well-formed record
//! - Collections carry a format version and a CRC32 trailer so that a file
//!   cut short or damaged is reported, never half-loaded

mod checksum;
mod errors;
mod framing;
mod record;
mod text;

pub use checksum::{compute_checksum, format_checksum, parse_checksum};
pub use errors::{DecodeError, DecodeErrorKind, DecodeResult};
pub use framing::{decode_collection, encode_collection, FORMAT_VERSION};
pub use record::{AuditEntry, FieldValue, Record, AUDIT_KEY, ID_KEY, TIMESTAMP_FORMAT};
pub use text::{decode, encode};
