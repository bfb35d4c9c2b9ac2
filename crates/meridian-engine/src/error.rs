//! # Engine Error Taxonomy
//!
//! The workflow-level error classes, straight from the failure modes of the
//! commit pipeline:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Declined            gateway refused; no side effects; retryable by     │
//! │                      re-entering payment                                │
//! │  GatewayUnavailable  timeout/transport failure; decline-equivalent,     │
//! │                      the caller never gets an ambiguous "maybe"         │
//! │  Validation          bad cart / missing field; 4xx, never retried       │
//! │  InsufficientStock   guarded decrement refused (transfers)              │
//! │  NotFound            referenced entity missing                          │
//! │  Conflict            invariant held against the request (shift already  │
//! │                      open, sale already returned, no open shift)        │
//! │  Forbidden           actor lacks the role for the operation             │
//! │  PartialCommit       sale persisted but a side-effect step failed and   │
//! │                      stayed failed after retry; carries sale id + step  │
//! │                      for reconciliation                                 │
//! │  Db                  storage failure                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use meridian_core::ValidationError;
use meridian_db::DbError;

/// Workflow errors.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The gateway refused the charge. The reason is the gateway's,
    /// verbatim. No sale was created.
    #[error("Payment declined: {reason}")]
    Declined { reason: String },

    /// The gateway call timed out or failed in transport. Treated as a
    /// decline-equivalent: no sale was created and the caller may retry.
    #[error("Payment outcome unknown: {reason}")]
    GatewayUnavailable { reason: String },

    /// Bad request content.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A guarded stock decrement was refused.
    #[error("Insufficient stock for product {product_id}: available {available}, requested {requested}")]
    InsufficientStock {
        product_id: String,
        available: i64,
        requested: i64,
    },

    /// Referenced entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// The request lost against an engine invariant.
    #[error("Conflict: {message}")]
    Conflict { message: String },

    /// The acting employee lacks the role for this operation.
    #[error("Forbidden: {message}")]
    Forbidden { message: String },

    /// The sale is committed but a side-effect step is still failed after a
    /// retry pass. Carries enough context for reconciliation.
    #[error("Sale {sale_id} committed but step '{step}' failed: {message}")]
    PartialCommit {
        sale_id: String,
        step: String,
        message: String,
    },

    /// Storage failure.
    #[error(transparent)]
    Db(#[from] DbError),
}

impl EngineError {
    /// Creates a NotFound error.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        EngineError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates a Conflict error.
    pub fn conflict(message: impl Into<String>) -> Self {
        EngineError::Conflict {
            message: message.into(),
        }
    }

    /// Creates a Forbidden error.
    pub fn forbidden(message: impl Into<String>) -> Self {
        EngineError::Forbidden {
            message: message.into(),
        }
    }
}

/// Result type for workflow operations.
pub type EngineResult<T> = Result<T, EngineError>;
