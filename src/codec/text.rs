//! Line-oriented text encoding of a single record.
//!
//! ```text
//! id: "123456789"
//! balance: 9500
//! pin: "$argon2id$v=19$..."
//! audit:
//! 18-10-2026 09:30:00 - Account opened with initial balance: ₹10,000.00
//! 18-10-2026 09:31:12 - Withdrawal: ₹500.00
//! ```
//!
//! Text and list values are JSON literals, numbers are bare. Fields are
//! written in key order so the same record always encodes to the same bytes.

use chrono::NaiveDateTime;

use super::errors::{DecodeError, DecodeResult};
use super::record::{AuditEntry, FieldValue, Record, AUDIT_KEY, ID_KEY, TIMESTAMP_FORMAT};

/// Length of a `DD-MM-YYYY HH:MM:SS` timestamp.
const TIMESTAMP_LEN: usize = 19;

const AUDIT_SEPARATOR: &str = " - ";

/// Encodes a record. Deterministic and infallible.
pub fn encode(record: &Record) -> Vec<u8> {
    let mut out = String::with_capacity(64 + record.field_count() * 32);

    out.push_str(ID_KEY);
    out.push_str(": ");
    out.push_str(&encode_text(record.id()));
    out.push('\n');

    for (key, value) in record.fields() {
        out.push_str(key);
        out.push_str(": ");
        out.push_str(&encode_value(value));
        out.push('\n');
    }

    if !record.audit().is_empty() {
        out.push_str(AUDIT_KEY);
        out.push_str(":\n");
        for entry in record.audit() {
            out.push_str(&entry.to_string());
            out.push('\n');
        }
    }

    out.into_bytes()
}

fn encode_value(value: &FieldValue) -> String {
    match value {
        FieldValue::Text(s) => encode_text(s),
        FieldValue::Number(n) => format!("{}", n),
        FieldValue::List(items) => {
            serde_json::to_string(items).unwrap_or_else(|_| "[]".to_string())
        }
    }
}

fn encode_text(s: &str) -> String {
    // Serializing a &str to JSON cannot fail.
    serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_string())
}

/// Decodes a record.
///
/// Blank lines are ignored, so trailing newlines are harmless.
///
/// # Errors
///
/// - `TruncatedInput` if the input is empty or whitespace only
/// - `MalformedField` if `id` is missing, a line is not `key: value`, a key
///   repeats, a value is not a literal or finite number, or an audit line is
///   malformed or out of order
pub fn decode(bytes: &[u8]) -> DecodeResult<Record> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| DecodeError::malformed(format!("input is not valid UTF-8: {}", e)))?;

    if text.trim().is_empty() {
        return Err(DecodeError::truncated("empty record"));
    }

    let mut id: Option<String> = None;
    let mut fields: Vec<(String, FieldValue, usize)> = Vec::new();
    let mut audit: Vec<AuditEntry> = Vec::new();
    let mut in_audit = false;

    for (index, raw) in text.lines().enumerate() {
        let line_no = index + 1;
        let line = raw.trim_end_matches('\r');

        if line.trim().is_empty() {
            continue;
        }

        if in_audit {
            let entry = decode_audit_line(line).map_err(|e| e.at_line(line_no))?;
            if let Some(last) = audit.last() {
                if entry.timestamp() < last.timestamp() {
                    return Err(DecodeError::malformed("audit entries out of order")
                        .at_line(line_no));
                }
            }
            audit.push(entry);
            continue;
        }

        let (key, value) = line.split_once(':').ok_or_else(|| {
            DecodeError::malformed(format!("expected 'key: value', found '{}'", line))
                .at_line(line_no)
        })?;
        let key = key.trim();
        let value = value.trim();

        if key == AUDIT_KEY && value.is_empty() {
            in_audit = true;
            continue;
        }

        if key == ID_KEY {
            if id.is_some() {
                return Err(DecodeError::malformed("duplicate 'id'").at_line(line_no));
            }
            let parsed: String = serde_json::from_str(value).map_err(|_| {
                DecodeError::malformed("'id' must be a quoted string").at_line(line_no)
            })?;
            id = Some(parsed);
            continue;
        }

        if fields.iter().any(|(k, _, _)| k == key) {
            return Err(
                DecodeError::malformed(format!("duplicate field '{}'", key)).at_line(line_no)
            );
        }

        let value = decode_value(key, value).map_err(|e| e.at_line(line_no))?;
        fields.push((key.to_string(), value, line_no));
    }

    let id = id.ok_or_else(|| DecodeError::malformed("missing required field 'id'"))?;
    let mut record = Record::new(id)
        .map_err(|e| DecodeError::malformed(format!("invalid 'id': {}", e)))?;

    for (key, value, line_no) in fields {
        record
            .set(&key, value)
            .map_err(|e| DecodeError::malformed(e.to_string()).at_line(line_no))?;
    }
    for entry in audit {
        record.push_decoded_audit(entry);
    }

    Ok(record)
}

fn decode_value(key: &str, value: &str) -> DecodeResult<FieldValue> {
    if value.starts_with('"') {
        return serde_json::from_str::<String>(value)
            .map(FieldValue::Text)
            .map_err(|e| DecodeError::malformed(format!("field '{}': bad string: {}", key, e)));
    }

    if value.starts_with('[') {
        return serde_json::from_str::<Vec<String>>(value)
            .map(FieldValue::List)
            .map_err(|e| DecodeError::malformed(format!("field '{}': bad list: {}", key, e)));
    }

    match value.parse::<f64>() {
        Ok(n) if n.is_finite() => Ok(FieldValue::Number(n)),
        _ => Err(DecodeError::malformed(format!(
            "field '{}': '{}' is not a number",
            key, value
        ))),
    }
}

fn decode_audit_line(line: &str) -> DecodeResult<AuditEntry> {
    let stamp = line
        .get(..TIMESTAMP_LEN)
        .ok_or_else(|| DecodeError::malformed("audit line too short"))?;
    let timestamp = NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT)
        .map_err(|e| DecodeError::malformed(format!("bad audit timestamp '{}': {}", stamp, e)))?;
    let description = line[TIMESTAMP_LEN..]
        .strip_prefix(AUDIT_SEPARATOR)
        .ok_or_else(|| DecodeError::malformed("audit line missing ' - ' separator"))?;

    Ok(AuditEntry::new(timestamp, description))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::DecodeErrorKind;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 18)
            .and_then(|d| d.and_hms_opt(h, m, s))
            .unwrap()
    }

    fn account() -> Record {
        let mut record = Record::new("123456789")
            .unwrap()
            .with("balance", 9500.0)
            .unwrap()
            .with("pin", "$argon2id$v=19$m=19456,t=2,p=1$abc$def")
            .unwrap()
            .with("tags", vec!["savings".to_string(), "has: colon".to_string()])
            .unwrap();
        record.append_audit(AuditEntry::new(at(9, 30, 0), "Account opened"));
        record.append_audit(AuditEntry::new(at(9, 31, 12), "Withdrawal: 500.00"));
        record
    }

    #[test]
    fn test_encode_layout() {
        let text = String::from_utf8(encode(&account())).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "id: \"123456789\"");
        assert_eq!(lines[1], "balance: 9500");
        assert!(lines[2].starts_with("pin: \"$argon2id$"));
        assert_eq!(lines[3], "tags: [\"savings\",\"has: colon\"]");
        assert_eq!(lines[4], "audit:");
        assert_eq!(lines[5], "18-10-2026 09:30:00 - Account opened");
        assert_eq!(lines[6], "18-10-2026 09:31:12 - Withdrawal: 500.00");
    }

    #[test]
    fn test_round_trip() {
        let record = account();
        assert_eq!(decode(&encode(&record)).unwrap(), record);
    }

    #[test]
    fn test_round_trip_awkward_values() {
        let record = Record::new("weird id: \"quoted\"")
            .unwrap()
            .with("note", "multi\nline\ttext with \"quotes\"")
            .unwrap()
            .with("empty", "")
            .unwrap()
            .with("ratio", 0.1 + 0.2)
            .unwrap()
            .with("negative", -42.5)
            .unwrap()
            .with("none", Vec::<String>::new())
            .unwrap();
        assert_eq!(decode(&encode(&record)).unwrap(), record);
    }

    #[test]
    fn test_encode_is_deterministic() {
        let a = Record::new("x").unwrap().with("b", 1.0).unwrap().with("a", 2.0).unwrap();
        let b = Record::new("x").unwrap().with("a", 2.0).unwrap().with("b", 1.0).unwrap();
        assert_eq!(encode(&a), encode(&b));
    }

    #[test]
    fn test_trailing_blank_lines_tolerated() {
        let mut bytes = encode(&account());
        bytes.extend_from_slice(b"\n\n   \n");
        assert_eq!(decode(&bytes).unwrap(), account());
    }

    #[test]
    fn test_crlf_tolerated() {
        let bytes = b"id: \"r1\"\r\nscore: 95\r\n";
        let record = decode(bytes).unwrap();
        assert_eq!(record.number("score"), Some(95.0));
    }

    #[test]
    fn test_empty_input_is_truncated() {
        assert_eq!(decode(b"").unwrap_err().kind(), DecodeErrorKind::TruncatedInput);
        assert_eq!(decode(b"\n \n").unwrap_err().kind(), DecodeErrorKind::TruncatedInput);
    }

    #[test]
    fn test_missing_id_is_malformed() {
        let err = decode(b"balance: 100\n").unwrap_err();
        assert_eq!(err.kind(), DecodeErrorKind::MalformedField);
        assert!(err.message().contains("id"));
    }

    #[test]
    fn test_unparseable_number_is_malformed() {
        let err = decode(b"id: \"r1\"\nbalance: ten thousand\n").unwrap_err();
        assert_eq!(err.kind(), DecodeErrorKind::MalformedField);
        assert_eq!(err.line(), Some(2));
    }

    #[test]
    fn test_non_finite_number_is_malformed() {
        let err = decode(b"id: \"r1\"\nbalance: NaN\n").unwrap_err();
        assert_eq!(err.kind(), DecodeErrorKind::MalformedField);
        let err = decode(b"id: \"r1\"\nbalance: inf\n").unwrap_err();
        assert_eq!(err.kind(), DecodeErrorKind::MalformedField);
    }

    #[test]
    fn test_duplicate_field_is_malformed() {
        let err = decode(b"id: \"r1\"\na: 1\na: 2\n").unwrap_err();
        assert_eq!(err.kind(), DecodeErrorKind::MalformedField);
        assert_eq!(err.line(), Some(3));
    }

    #[test]
    fn test_line_without_colon_is_malformed() {
        let err = decode(b"id: \"r1\"\njust text\n").unwrap_err();
        assert_eq!(err.kind(), DecodeErrorKind::MalformedField);
    }

    #[test]
    fn test_bad_audit_line_is_malformed() {
        let err = decode(b"id: \"r1\"\naudit:\nyesterday - something\n").unwrap_err();
        assert_eq!(err.kind(), DecodeErrorKind::MalformedField);
        assert_eq!(err.line(), Some(3));
    }

    #[test]
    fn test_out_of_order_audit_is_malformed() {
        let input = b"id: \"r1\"\naudit:\n18-10-2026 10:00:00 - b\n18-10-2026 09:00:00 - a\n";
        let err = decode(input).unwrap_err();
        assert_eq!(err.kind(), DecodeErrorKind::MalformedField);
        assert_eq!(err.line(), Some(4));
    }

    #[test]
    fn test_audit_entry_with_empty_description() {
        let mut record = Record::new("r1").unwrap();
        record.append_audit(AuditEntry::new(at(8, 0, 0), ""));
        assert_eq!(decode(&encode(&record)).unwrap(), record);
    }
}
