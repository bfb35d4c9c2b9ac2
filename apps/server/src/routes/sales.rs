//! # Sale Routes

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use tracing::debug;

use crate::error::{ApiError, ErrorCode};
use crate::SharedState;
use meridian_core::{CommitStepRecord, Sale, SaleItem};
use meridian_engine::{CheckoutRequest, CommittedSale};

/// A sale with its line items, as returned by `GET /sales/:id`.
#[derive(Debug, Clone, Serialize)]
pub struct SaleDetail {
    pub sale: Sale,
    pub items: Vec<SaleItem>,
}

/// `POST /sales` - commit a cart.
pub async fn create_sale(
    State(state): State<SharedState>,
    Json(req): Json<CheckoutRequest>,
) -> Result<(StatusCode, Json<CommittedSale>), ApiError> {
    debug!(branch_id = %req.branch_id, lines = req.lines.len(), "create_sale");

    let committed = state.engine.sales.commit(&req).await?;
    let status = if committed.replayed {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((status, Json(committed)))
}

/// `GET /sales/:id` - sale with items.
pub async fn get_sale(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<SaleDetail>, ApiError> {
    let sale = state
        .db
        .sales()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::new(ErrorCode::NotFound, format!("Sale not found: {id}")))?;
    let items = state.db.sales().get_items(&id).await?;

    Ok(Json(SaleDetail { sale, items }))
}

/// `POST /sales/:id/retry-steps` - re-run incomplete commit steps.
pub async fn retry_steps(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<CommitStepRecord>>, ApiError> {
    let steps = state.engine.sales.retry_side_effects(&id).await?;
    Ok(Json(steps))
}
