//! # Validation Module
//!
//! Field-level validation used by the workflows before business logic runs.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Validation Layers                                 │
//! │                                                                         │
//! │  Layer 1: HTTP handler (axum)                                           │
//! │  ├── Type validation (deserialization)                                  │
//! │  └── Shape of the request body                                          │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE + pricing                                         │
//! │  └── Business rule validation (amounts, reasons, currency)              │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                             │
//! │  ├── NOT NULL / CHECK constraints                                       │
//! │  ├── UNIQUE constraints (receipt number, one open shift, one return)    │
//! │  └── Foreign key constraints                                            │
//! │                                                                         │
//! │  Defense in depth: multiple layers catch different errors               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::{ValidationError, ValidationResult};

/// Maximum length for free-text reason fields.
const MAX_REASON_LEN: usize = 500;

/// Validates a monetary amount that must be strictly positive
/// (cash drawer operations, received cash).
pub fn validate_positive_amount(field: &str, cents: i64) -> ValidationResult<()> {
    if cents <= 0 {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Validates a monetary amount that may be zero but not negative
/// (opening cash, closing cash).
pub fn validate_non_negative_amount(field: &str, cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Validates a required free-text reason (cash drawer ops, returns).
///
/// ## Rules
/// - Must not be empty after trimming
/// - Must be at most 500 characters
pub fn validate_reason(reason: &str) -> ValidationResult<()> {
    let reason = reason.trim();

    if reason.is_empty() {
        return Err(ValidationError::Required {
            field: "reason".to_string(),
        });
    }
    if reason.len() > MAX_REASON_LEN {
        return Err(ValidationError::TooLong {
            field: "reason".to_string(),
            max: MAX_REASON_LEN,
        });
    }

    Ok(())
}

/// Validates an ISO-4217-shaped currency code ("USD", "EUR", ...).
///
/// The gateway boundary requires one; we check shape, not membership in the
/// full ISO table.
pub fn validate_currency(code: &str) -> ValidationResult<()> {
    if code.len() != 3 || !code.chars().all(|c| c.is_ascii_uppercase()) {
        return Err(ValidationError::InvalidFormat {
            field: "currency".to_string(),
            reason: "must be a 3-letter uppercase ISO code".to_string(),
        });
    }
    Ok(())
}

/// Validates an expected shift duration in hours.
pub fn validate_expected_hours(hours: f64) -> ValidationResult<()> {
    if !(hours > 0.0 && hours <= 24.0) {
        return Err(ValidationError::OutOfRange {
            field: "expected_duration_hours".to_string(),
            min: 1,
            max: 24,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amounts() {
        assert!(validate_positive_amount("amount", 1).is_ok());
        assert!(validate_positive_amount("amount", 0).is_err());
        assert!(validate_positive_amount("amount", -5).is_err());

        assert!(validate_non_negative_amount("opening_cash", 0).is_ok());
        assert!(validate_non_negative_amount("opening_cash", -1).is_err());
    }

    #[test]
    fn reasons() {
        assert!(validate_reason("till count at handover").is_ok());
        assert!(validate_reason("   ").is_err());
        assert!(validate_reason(&"x".repeat(501)).is_err());
    }

    #[test]
    fn currency_codes() {
        assert!(validate_currency("USD").is_ok());
        assert!(validate_currency("usd").is_err());
        assert!(validate_currency("US").is_err());
        assert!(validate_currency("DOLLARS").is_err());
    }

    #[test]
    fn expected_hours_range() {
        assert!(validate_expected_hours(8.0).is_ok());
        assert!(validate_expected_hours(0.0).is_err());
        assert!(validate_expected_hours(25.0).is_err());
    }
}
