//! Decode error types
//!
//! Every decode failure names its kind and, when known, the 1-based line of
//! the input that caused it.

use std::fmt;

/// Why a byte stream could not be decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeErrorKind {
    /// A required field is missing or a line/value is unparseable
    MalformedField,
    /// The stream is empty or was cut short
    TruncatedInput,
    /// The collection header names a format version this build cannot read
    UnsupportedVersion,
    /// The collection trailer checksum does not match the content
    ChecksumMismatch,
}

impl DecodeErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecodeErrorKind::MalformedField => "MALFORMED_FIELD",
            DecodeErrorKind::TruncatedInput => "TRUNCATED_INPUT",
            DecodeErrorKind::UnsupportedVersion => "UNSUPPORTED_VERSION",
            DecodeErrorKind::ChecksumMismatch => "CHECKSUM_MISMATCH",
        }
    }
}

impl fmt::Display for DecodeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Decode failure with kind, message and optional line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeError {
    kind: DecodeErrorKind,
    message: String,
    line: Option<usize>,
}

impl DecodeError {
    pub fn new(kind: DecodeErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            line: None,
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(DecodeErrorKind::MalformedField, message)
    }

    pub fn truncated(message: impl Into<String>) -> Self {
        Self::new(DecodeErrorKind::TruncatedInput, message)
    }

    /// Attaches a line number.
    pub fn at_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    /// Shifts a line number reported relative to an embedded chunk so that it
    /// is relative to the enclosing input. `first_line` is the line the chunk
    /// starts at.
    pub(crate) fn offset_lines(mut self, first_line: usize) -> Self {
        self.line = self.line.map(|l| l + first_line - 1);
        self
    }

    pub fn kind(&self) -> DecodeErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn line(&self) -> Option<usize> {
        self.line
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)?;
        if let Some(line) = self.line {
            write!(f, " (line {})", line)?;
        }
        Ok(())
    }
}

impl std::error::Error for DecodeError {}

/// Result type for decoding
pub type DecodeResult<T> = Result<T, DecodeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_kind_and_line() {
        let err = DecodeError::malformed("balance is not a number").at_line(3);
        let display = err.to_string();
        assert!(display.contains("MALFORMED_FIELD"));
        assert!(display.contains("balance is not a number"));
        assert!(display.contains("line 3"));
    }

    #[test]
    fn test_offset_lines() {
        let err = DecodeError::malformed("x").at_line(2).offset_lines(10);
        assert_eq!(err.line(), Some(11));

        let err = DecodeError::truncated("empty").offset_lines(10);
        assert_eq!(err.line(), None);
    }
}
