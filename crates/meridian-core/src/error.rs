//! # Error Types
//!
//! Validation error types for meridian-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Error Types                                    │
//! │                                                                         │
//! │  meridian-core (this file)                                              │
//! │  └── ValidationError  - Input/business-rule validation failures         │
//! │                                                                         │
//! │  meridian-db (separate crate)                                           │
//! │  └── DbError          - Database operation failures                     │
//! │                                                                         │
//! │  meridian-engine (separate crate)                                       │
//! │  └── EngineError      - Workflow taxonomy (Declined, Conflict, ...)     │
//! │                                                                         │
//! │  apps/server                                                            │
//! │  └── ApiError         - What HTTP callers see (status + code + msg)     │
//! │                                                                         │
//! │  Flow: ValidationError → EngineError → ApiError → caller                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (field, limit, value)
//! 3. Errors are enum variants, never String

use thiserror::Error;

/// Input validation errors.
///
/// These occur when a request doesn't meet requirements; they map to 4xx at
/// the API boundary and are never retried.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Invalid format (e.g., currency code, uuid).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in the allowed set (e.g., a disabled payment method).
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },

    /// Cart has no lines.
    #[error("Cart must contain at least one line")]
    EmptyCart,

    /// Cart has exceeded the maximum allowed lines.
    #[error("Cart cannot have more than {max} lines")]
    CartTooLarge { max: usize },

    /// Line quantity exceeds the maximum allowed.
    #[error("Quantity {requested} exceeds maximum allowed ({max})")]
    QuantityTooLarge { requested: i64, max: i64 },

    /// A line discount exceeds the line's gross amount.
    #[error("Line discount {discount_cents} exceeds line amount {line_cents}")]
    DiscountExceedsLine { discount_cents: i64, line_cents: i64 },
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;
