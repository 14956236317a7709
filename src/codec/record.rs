//! Record types: identifier, typed fields and the per-record audit trail.
//!
//! # Invariants
//!
//! - The identifier is fixed at construction; there is no setter.
//! - Field names follow `validate_field_name` and never collide with `id`
//!   or the `audit` section marker.
//! - Numbers are finite.
//! - The audit trail is append-only and chronological.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{NaiveDateTime, Timelike};

use crate::validation::{validate_field_name, validate_record_id, ValidationError, ValidationResult};

/// Reserved key holding the record identifier.
pub const ID_KEY: &str = "id";

/// Reserved key introducing the audit section.
pub const AUDIT_KEY: &str = "audit";

/// Audit timestamp format: `DD-MM-YYYY HH:MM:SS`.
pub const TIMESTAMP_FORMAT: &str = "%d-%m-%Y %H:%M:%S";

/// A single field value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Number(f64),
    /// Ordered sequence of strings (tags, subject lists, ...)
    List(Vec<String>),
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            FieldValue::List(items) => Some(items),
            _ => None,
        }
    }

    /// Short name of the value kind, for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            FieldValue::Text(_) => "text",
            FieldValue::Number(_) => "number",
            FieldValue::List(_) => "list",
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Number(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Number(value as f64)
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(value: Vec<String>) -> Self {
        FieldValue::List(value)
    }
}

/// One timestamped line of a record's audit trail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEntry {
    timestamp: NaiveDateTime,
    description: String,
}

impl AuditEntry {
    /// Creates an entry. Sub-second precision is dropped and line breaks in
    /// the description are folded to spaces, so every entry encodes as one
    /// line.
    pub fn new(timestamp: NaiveDateTime, description: impl Into<String>) -> Self {
        let description = description
            .into()
            .chars()
            .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
            .collect();
        Self {
            timestamp: timestamp.with_nanosecond(0).unwrap_or(timestamp),
            description,
        }
    }

    pub fn timestamp(&self) -> NaiveDateTime {
        self.timestamp
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

impl fmt::Display for AuditEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - {}",
            self.timestamp.format(TIMESTAMP_FORMAT),
            self.description
        )
    }
}

/// An addressable entity: identifier, named fields, audit trail.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    id: String,
    fields: BTreeMap<String, FieldValue>,
    audit: Vec<AuditEntry>,
}

impl Record {
    /// Creates an empty record.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::BadFormat` if the identifier is empty,
    /// padded with whitespace, or contains control characters.
    pub fn new(id: impl Into<String>) -> ValidationResult<Self> {
        let id = id.into();
        validate_record_id(&id)?;
        Ok(Self {
            id,
            fields: BTreeMap::new(),
            audit: Vec::new(),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(FieldValue::as_text)
    }

    pub fn number(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(FieldValue::as_number)
    }

    pub fn list(&self, key: &str) -> Option<&[String]> {
        self.get(key).and_then(FieldValue::as_list)
    }

    /// Sets a field, returning the previous value.
    pub fn set(
        &mut self,
        key: &str,
        value: impl Into<FieldValue>,
    ) -> ValidationResult<Option<FieldValue>> {
        validate_field_name(key)?;
        if key == ID_KEY || key == AUDIT_KEY {
            return Err(ValidationError::bad_format(format!(
                "'{}' is a reserved field name",
                key
            )));
        }

        let value = value.into();
        if let FieldValue::Number(n) = value {
            if !n.is_finite() {
                return Err(ValidationError::bad_format(format!(
                    "field '{}' must be a finite number",
                    key
                )));
            }
        }

        Ok(self.fields.insert(key.to_string(), value))
    }

    /// Builder form of [`Record::set`].
    pub fn with(mut self, key: &str, value: impl Into<FieldValue>) -> ValidationResult<Self> {
        self.set(key, value)?;
        Ok(self)
    }

    pub fn remove(&mut self, key: &str) -> Option<FieldValue> {
        self.fields.remove(key)
    }

    /// Fields in key order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    pub fn audit(&self) -> &[AuditEntry] {
        &self.audit
    }

    /// Appends to the audit trail.
    ///
    /// An entry stamped earlier than the current last entry (wall clock
    /// stepped backwards) is re-stamped with the last entry's time.
    pub fn append_audit(&mut self, entry: AuditEntry) {
        let entry = match self.audit.last() {
            Some(last) if entry.timestamp < last.timestamp => AuditEntry {
                timestamp: last.timestamp,
                description: entry.description,
            },
            _ => entry,
        };
        self.audit.push(entry);
    }

    /// Appends a decoded entry verbatim. Ordering is checked by the decoder.
    pub(crate) fn push_decoded_audit(&mut self, entry: AuditEntry) {
        self.audit.push(entry);
    }
}
