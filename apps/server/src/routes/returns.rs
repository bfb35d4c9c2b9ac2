//! # Return Routes

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use tracing::debug;

use crate::error::ApiError;
use crate::SharedState;
use meridian_engine::{ProcessedReturn, ReturnRequest};

/// `POST /returns` - process a return against an original sale.
pub async fn create_return(
    State(state): State<SharedState>,
    Json(req): Json<ReturnRequest>,
) -> Result<(StatusCode, Json<ProcessedReturn>), ApiError> {
    debug!(original_sale_id = %req.original_sale_id, "create_return");

    let processed = state.engine.returns.process(&req).await?;
    Ok((StatusCode::CREATED, Json(processed)))
}
