//! Validation error types

use std::fmt;

/// Validation error for request bodies and domain values
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Field is empty when it shouldn't be
    Empty { field: &'static str },

    /// Required field is missing from the request
    Missing { field: &'static str },

    /// Field exceeds maximum length
    TooLong { field: &'static str, max: usize },

    /// Value doesn't match the required format
    InvalidFormat { field: &'static str, reason: String },

    /// Invalid enum variant
    InvalidVariant {
        field: &'static str,
        value: String,
        allowed: &'static [&'static str],
    },

    /// Numeric value outside the accepted range
    OutOfRange { field: &'static str, reason: String },

    /// Two fields contradict each other
    Conflict { reason: String },

    /// Update body did not carry any writable field
    NoFieldsToUpdate,
}

impl ValidationError {
    pub fn invalid_format(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidFormat {
            field,
            reason: reason.into(),
        }
    }

    pub fn out_of_range(field: &'static str, reason: impl Into<String>) -> Self {
        Self::OutOfRange {
            field,
            reason: reason.into(),
        }
    }

    pub fn conflict(reason: impl Into<String>) -> Self {
        Self::Conflict {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty { field } => write!(f, "{} cannot be empty", field),
            Self::Missing { field } => write!(f, "{} is required", field),
            Self::TooLong { field, max } => {
                write!(f, "{} exceeds maximum length of {} characters", field, max)
            }
            Self::InvalidFormat { field, reason } => write!(f, "{}: {}", field, reason),
            Self::InvalidVariant {
                field,
                value,
                allowed,
            } => write!(
                f,
                "invalid {} value: '{}' (expected one of: {})",
                field,
                value,
                allowed.join(", ")
            ),
            Self::OutOfRange { field, reason } => write!(f, "{} {}", field, reason),
            Self::Conflict { reason } => f.write_str(reason),
            Self::NoFieldsToUpdate => f.write_str("no fields to update"),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Trim a required text field, rejecting blanks and overlong values.
pub fn required_text(
    field: &'static str,
    value: &str,
    max: usize,
) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Empty { field });
    }
    if trimmed.chars().count() > max {
        return Err(ValidationError::TooLong { field, max });
    }
    Ok(trimmed.to_owned())
}

/// Trim an optional text field; blank strings collapse to `None`.
pub fn optional_text(
    field: &'static str,
    value: Option<&str>,
    max: usize,
) -> Result<Option<String>, ValidationError> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) if v.chars().count() > max => Err(ValidationError::TooLong { field, max }),
        Some(v) => Ok(Some(v.to_owned())),
    }
}
