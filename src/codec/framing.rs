//! Versioned collection framing
//!
//! A collection file wraps zero or more encoded records:
//!
//! ```text
//! %recstore 1
//! id: "a"
//! score: 70
//! %%
//! id: "b"
//! score: 95
//! %end crc32:1c291ca3
//! ```
//!
//! The trailer checksum covers every byte before the trailer line. A file
//! without a trailer was cut short.

use std::collections::HashSet;

use super::checksum::{compute_checksum, format_checksum, parse_checksum};
use super::errors::{DecodeError, DecodeErrorKind, DecodeResult};
use super::record::Record;
use super::text::{decode, encode};

/// Current on-disk format version.
pub const FORMAT_VERSION: u32 = 1;

const HEADER_PREFIX: &str = "%recstore ";
const RECORD_SEPARATOR: &str = "%%";
const TRAILER_PREFIX: &str = "%end ";

/// Encodes a collection with header, separators and checksum trailer.
pub fn encode_collection(records: &[Record]) -> Vec<u8> {
    let mut out = Vec::with_capacity(32 + records.len() * 128);
    out.extend_from_slice(format!("{}{}\n", HEADER_PREFIX, FORMAT_VERSION).as_bytes());

    for (i, record) in records.iter().enumerate() {
        if i > 0 {
            out.extend_from_slice(RECORD_SEPARATOR.as_bytes());
            out.push(b'\n');
        }
        out.extend_from_slice(&encode(record));
    }

    let checksum = compute_checksum(&out);
    out.extend_from_slice(
        format!("{}{}\n", TRAILER_PREFIX, format_checksum(checksum)).as_bytes(),
    );
    out
}

/// Decodes a collection, verifying version, trailer and checksum.
///
/// # Errors
///
/// - `TruncatedInput` for empty input or a missing trailer
/// - `UnsupportedVersion` for an unknown format version
/// - `ChecksumMismatch` when content and trailer disagree
/// - `MalformedField` for a missing header, an empty record, a duplicate
///   record id, or any record-level decode failure (with the line number in
///   the whole file)
pub fn decode_collection(bytes: &[u8]) -> DecodeResult<Vec<Record>> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| DecodeError::malformed(format!("input is not valid UTF-8: {}", e)))?;

    if text.trim().is_empty() {
        return Err(DecodeError::truncated("empty collection file"));
    }

    let header_end = text.find('\n').unwrap_or(text.len());
    let header = text[..header_end].trim_end_matches('\r');
    let version = header
        .strip_prefix(HEADER_PREFIX)
        .ok_or_else(|| DecodeError::malformed("missing '%recstore' header").at_line(1))?;
    let version: u32 = version
        .trim()
        .parse()
        .map_err(|_| DecodeError::malformed("unreadable format version").at_line(1))?;
    if version != FORMAT_VERSION {
        return Err(DecodeError::new(
            DecodeErrorKind::UnsupportedVersion,
            format!(
                "format version {} is not supported (expected {})",
                version, FORMAT_VERSION
            ),
        )
        .at_line(1));
    }

    let trimmed = text.trim_end();
    let trailer_start = trimmed.rfind('\n').map(|i| i + 1).unwrap_or(0);
    if trailer_start <= header_end {
        return Err(DecodeError::truncated("missing '%end' trailer"));
    }
    let trailer = trimmed[trailer_start..].trim_end_matches('\r');
    let expected = trailer
        .strip_prefix(TRAILER_PREFIX)
        .ok_or_else(|| DecodeError::truncated("missing '%end' trailer"))?;
    let expected = parse_checksum(expected.trim())
        .ok_or_else(|| DecodeError::truncated("incomplete '%end' trailer"))?;

    let actual = compute_checksum(&bytes[..trailer_start]);
    if actual != expected {
        return Err(DecodeError::new(
            DecodeErrorKind::ChecksumMismatch,
            format!(
                "content checksum {} does not match trailer {}",
                format_checksum(actual),
                format_checksum(expected)
            ),
        ));
    }

    let body_start = (header_end + 1).min(trailer_start);
    let body = &text[body_start..trailer_start];

    let mut records = Vec::new();
    let mut seen = HashSet::new();
    for (chunk, first_line) in split_records(body, 2) {
        if chunk.trim().is_empty() {
            return Err(DecodeError::malformed("empty record").at_line(first_line));
        }
        let record = decode(chunk.as_bytes()).map_err(|e| {
            // Record-level truncation inside a checksummed file is a shape error.
            let e = if e.kind() == DecodeErrorKind::TruncatedInput {
                DecodeError::malformed(e.message().to_string())
            } else {
                e
            };
            e.offset_lines(first_line)
        })?;
        if !seen.insert(record.id().to_string()) {
            return Err(DecodeError::malformed(format!(
                "duplicate record id '{}'",
                record.id()
            ))
            .at_line(first_line));
        }
        records.push(record);
    }

    Ok(records)
}

/// Splits the body on separator lines, returning each chunk with the file
/// line it starts on. An empty body has no chunks.
fn split_records(body: &str, first_line: usize) -> Vec<(String, usize)> {
    if body.trim().is_empty() {
        return Vec::new();
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut start = first_line;

    for (i, line) in body.lines().enumerate() {
        if line.trim_end_matches('\r') == RECORD_SEPARATOR {
            chunks.push((std::mem::take(&mut current), start));
            start = first_line + i + 1;
        } else {
            current.push_str(line);
            current.push('\n');
        }
    }
    chunks.push((current, start));
    chunks
}
