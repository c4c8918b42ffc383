//! Domain model for the clinic registry.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//! - Enforce field-level domain rules before anything reaches SQL.
//!
//! # Invariants
//! - Doctors and patients share person attributes by composition; there is
//!   no person supertype anywhere in the system.
//! - Every mutating struct exposes `validate()`, and repositories call it
//!   before persistence.

use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod catalog;
pub mod consultation;
pub mod person;
pub mod prescription;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern must compile"));

/// Domain rule violation detected before persistence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required text field is empty or whitespace-only.
    EmptyField { field: &'static str },
    /// A bounded text field exceeds its maximum length.
    FieldTooLong { field: &'static str, max: usize },
    /// The email address does not have a plausible mailbox@domain shape.
    InvalidEmail(String),
    /// A numeric identifier (civil ID, license, SSN) must be positive.
    NonPositiveIdentifier { field: &'static str },
    /// A prescription must carry at least one item.
    NoItems,
    /// A medication item quantity must be at least 1.
    NonPositiveQuantity { quantity: i64 },
    /// A consultation must have at least one participating doctor.
    NoParticipants,
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyField { field } => write!(f, "{field} must not be empty"),
            Self::FieldTooLong { field, max } => {
                write!(f, "{field} must be at most {max} characters")
            }
            Self::InvalidEmail(value) => write!(f, "invalid email address: {value}"),
            Self::NonPositiveIdentifier { field } => write!(f, "{field} must be positive"),
            Self::NoItems => write!(f, "a prescription requires at least one item"),
            Self::NonPositiveQuantity { quantity } => {
                write!(f, "item quantity must be at least 1, got {quantity}")
            }
            Self::NoParticipants => {
                write!(f, "a consultation requires at least one participating doctor")
            }
        }
    }
}

impl Error for ValidationError {}

pub(crate) fn require_nonempty(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::EmptyField { field });
    }
    Ok(())
}

pub(crate) fn require_max_len(
    field: &'static str,
    value: &str,
    max: usize,
) -> Result<(), ValidationError> {
    if value.chars().count() > max {
        return Err(ValidationError::FieldTooLong { field, max });
    }
    Ok(())
}

pub(crate) fn require_email(value: &str) -> Result<(), ValidationError> {
    require_nonempty("email", value)?;
    require_max_len("email", value, 254)?;
    if !EMAIL_RE.is_match(value) {
        return Err(ValidationError::InvalidEmail(value.to_string()));
    }
    Ok(())
}

pub(crate) fn require_positive(field: &'static str, value: i64) -> Result<(), ValidationError> {
    if value <= 0 {
        return Err(ValidationError::NonPositiveIdentifier { field });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{require_email, require_max_len, ValidationError};

    #[test]
    fn email_shape_is_checked() {
        require_email("ana.silva@example.org").expect("plain address should pass");
        assert!(matches!(
            require_email("not-an-email"),
            Err(ValidationError::InvalidEmail(_))
        ));
        assert!(matches!(
            require_email("two words@example.org"),
            Err(ValidationError::InvalidEmail(_))
        ));
    }

    #[test]
    fn max_len_counts_characters_not_bytes() {
        let value = "é".repeat(10);
        require_max_len("address", &value, 10).expect("10 chars should fit in 10");
        assert!(require_max_len("address", &value, 9).is_err());
    }
}
