//! Input validation errors shared by records, secrets and domain fields.
//!
//! Validation failures are always recoverable: the caller re-prompts or
//! aborts the operation, and nothing has been mutated.

use thiserror::Error;

/// Result type for validation checks
pub type ValidationResult<T> = Result<T, ValidationError>;

/// A value was rejected before any state changed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The value does not have the required shape
    #[error("Invalid format: {0}")]
    BadFormat(String),
}

impl ValidationError {
    pub fn bad_format(message: impl Into<String>) -> Self {
        ValidationError::BadFormat(message.into())
    }
}

/// Checks a field name: non-empty ASCII alphanumerics, `_`, `-` or `.`.
pub fn validate_field_name(name: &str) -> ValidationResult<()> {
    if name.is_empty() {
        return Err(ValidationError::bad_format("field name must not be empty"));
    }

    if let Some(c) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.')))
    {
        return Err(ValidationError::bad_format(format!(
            "field name '{}' contains invalid character {:?}",
            name, c
        )));
    }

    Ok(())
}

/// Checks a record identifier: non-empty, no surrounding whitespace, no
/// control characters.
pub fn validate_record_id(id: &str) -> ValidationResult<()> {
    if id.is_empty() {
        return Err(ValidationError::bad_format("identifier must not be empty"));
    }
    if id.trim() != id {
        return Err(ValidationError::bad_format(
            "identifier must not start or end with whitespace",
        ));
    }
    if id.chars().any(|c| c.is_control()) {
        return Err(ValidationError::bad_format(
            "identifier must not contain control characters",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_names() {
        assert!(validate_field_name("balance").is_ok());
        assert!(validate_field_name("first_name").is_ok());
        assert!(validate_field_name("v1.score-avg").is_ok());

        assert!(validate_field_name("").is_err());
        assert!(validate_field_name("two words").is_err());
        assert!(validate_field_name("key:value").is_err());
        assert!(validate_field_name("%header").is_err());
    }

    #[test]
    fn test_record_ids() {
        assert!(validate_record_id("123456789").is_ok());
        assert!(validate_record_id("roll 42").is_ok());

        assert!(validate_record_id("").is_err());
        assert!(validate_record_id(" padded").is_err());
        assert!(validate_record_id("line\nbreak").is_err());
    }

    #[test]
    fn test_error_message() {
        let err = ValidationError::bad_format("PIN must be 4 digits");
        assert_eq!(err.to_string(), "Invalid format: PIN must be 4 digits");
    }
}
