//! # API Error Type
//!
//! Unified error type for HTTP handlers.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                   Error Flow at the HTTP Boundary                       │
//! │                                                                         │
//! │  EngineError                         HTTP response                      │
//! │  ───────────                         ─────────────                      │
//! │  Declined            ──────────────► 402 { code: PAYMENT_DECLINED }     │
//! │  GatewayUnavailable  ──────────────► 502 { code: GATEWAY_UNAVAILABLE }  │
//! │  Validation          ──────────────► 400 { code: VALIDATION_ERROR }     │
//! │  NotFound            ──────────────► 404 { code: NOT_FOUND }            │
//! │  Conflict            ──────────────► 409 { code: CONFLICT }             │
//! │  InsufficientStock   ──────────────► 409 { code: INSUFFICIENT_STOCK }   │
//! │  Forbidden           ──────────────► 403 { code: FORBIDDEN }            │
//! │  PartialCommit       ──────────────► 500 { code: PARTIAL_COMMIT }       │
//! │  Db                  ──────────────► 500 { code: DATABASE_ERROR }       │
//! │                                                                         │
//! │  The caller of /sales always receives either a committed sale or one    │
//! │  of these explicit reasons - never an ambiguous "maybe".                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use meridian_db::DbError;
use meridian_engine::EngineError;

/// API error serialized to HTTP callers.
///
/// ```json
/// { "code": "PAYMENT_DECLINED", "message": "Payment declined: card expired" }
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Resource not found (404)
    NotFound,

    /// Input validation failed (400)
    ValidationError,

    /// Gateway refused the charge (402)
    PaymentDeclined,

    /// Gateway unreachable or timed out (502)
    GatewayUnavailable,

    /// Engine invariant held against the request (409)
    Conflict,

    /// Guarded stock decrement refused (409)
    InsufficientStock,

    /// Actor lacks the role for the operation (403)
    Forbidden,

    /// Sale committed but a side-effect step failed (500)
    PartialCommit,

    /// Database operation failed (500)
    DatabaseError,
}

impl ErrorCode {
    fn status(self) -> StatusCode {
        match self {
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::ValidationError => StatusCode::BAD_REQUEST,
            ErrorCode::PaymentDeclined => StatusCode::PAYMENT_REQUIRED,
            ErrorCode::GatewayUnavailable => StatusCode::BAD_GATEWAY,
            ErrorCode::Conflict | ErrorCode::InsufficientStock => StatusCode::CONFLICT,
            ErrorCode::Forbidden => StatusCode::FORBIDDEN,
            ErrorCode::PartialCommit | ErrorCode::DatabaseError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }
}

/// Converts engine errors to API errors.
impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match &err {
            EngineError::Declined { .. } => ApiError::new(ErrorCode::PaymentDeclined, err.to_string()),
            EngineError::GatewayUnavailable { .. } => {
                ApiError::new(ErrorCode::GatewayUnavailable, err.to_string())
            }
            EngineError::Validation(_) => ApiError::new(ErrorCode::ValidationError, err.to_string()),
            EngineError::InsufficientStock { .. } => {
                ApiError::new(ErrorCode::InsufficientStock, err.to_string())
            }
            EngineError::NotFound { .. } => ApiError::new(ErrorCode::NotFound, err.to_string()),
            EngineError::Conflict { .. } => ApiError::new(ErrorCode::Conflict, err.to_string()),
            EngineError::Forbidden { .. } => ApiError::new(ErrorCode::Forbidden, err.to_string()),
            EngineError::PartialCommit { .. } => {
                ApiError::new(ErrorCode::PartialCommit, err.to_string())
            }
            EngineError::Db(db_err) => {
                // Log the actual error but return a generic message
                tracing::error!("Database error behind a request: {}", db_err);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        }
    }
}

/// Converts raw database errors (handlers that read without the engine).
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => {
                ApiError::new(ErrorCode::NotFound, format!("{entity} not found: {id}"))
            }
            other => {
                tracing::error!("Database error behind a request: {}", other);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.code.status();
        (status, Json(self)).into_response()
    }
}
