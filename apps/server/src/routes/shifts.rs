//! # Shift Routes

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use tracing::debug;

use crate::error::ApiError;
use crate::SharedState;
use meridian_core::Shift;
use meridian_engine::{CloseShiftRequest, OpenShiftRequest, ShiftSummary};

/// Body for `PUT /shifts/:id/close` and the `PUT /shifts/:id` override.
/// The shift id comes from the path.
#[derive(Debug, Clone, Deserialize)]
pub struct CloseShiftBody {
    pub closing_cash_cents: i64,
    pub actor_id: String,
}

/// `POST /shifts` - open a shift.
pub async fn open_shift(
    State(state): State<SharedState>,
    Json(req): Json<OpenShiftRequest>,
) -> Result<(StatusCode, Json<Shift>), ApiError> {
    debug!(employee_id = %req.employee_id, "open_shift");

    let shift = state.engine.shifts.open(&req).await?;
    Ok((StatusCode::CREATED, Json(shift)))
}

/// `GET /shifts/:id` - shift with derived duration figures.
pub async fn get_shift(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<ShiftSummary>, ApiError> {
    let summary = state.engine.shifts.summary(&id).await?;
    Ok(Json(summary))
}

/// `PUT /shifts/:id/close` (owner) and `PUT /shifts/:id` (administrative
/// override). The engine requires the admin role whenever the actor is not
/// the shift owner, and records who closed either way.
pub async fn close_shift(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(body): Json<CloseShiftBody>,
) -> Result<Json<ShiftSummary>, ApiError> {
    debug!(shift_id = %id, actor_id = %body.actor_id, "close_shift");

    let summary = state
        .engine
        .shifts
        .close(&CloseShiftRequest {
            shift_id: id,
            closing_cash_cents: body.closing_cash_cents,
            actor_id: body.actor_id,
        })
        .await?;
    Ok(Json(summary))
}
