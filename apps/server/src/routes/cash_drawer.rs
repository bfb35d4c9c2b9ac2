//! # Cash Drawer Routes

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use tracing::debug;

use crate::error::ApiError;
use crate::SharedState;
use meridian_core::CashDrawerOperation;
use meridian_engine::CashOpRequest;

/// `POST /cash-drawer` - record a deposit/withdrawal/count against the
/// acting employee's open shift. 409 when no shift is open.
pub async fn record_operation(
    State(state): State<SharedState>,
    Json(req): Json<CashOpRequest>,
) -> Result<(StatusCode, Json<CashDrawerOperation>), ApiError> {
    debug!(shift_id = %req.shift_id, op_type = ?req.op_type, "cash_drawer_operation");

    let op = state.engine.shifts.record_cash_operation(&req).await?;
    Ok((StatusCode::CREATED, Json(op)))
}
