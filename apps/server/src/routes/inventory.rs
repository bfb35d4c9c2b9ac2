//! # Inventory & Stock Count Routes

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ApiError;
use crate::SharedState;
use meridian_core::{InventoryMovement, InventoryRecord, StockCount};

/// Body for `POST /inventory/receivings`.
#[derive(Debug, Clone, Deserialize)]
pub struct ReceiveBody {
    pub branch_id: String,
    pub product_id: String,
    pub quantity: i64,
    pub employee_id: String,
    /// Purchase order or delivery note reference.
    pub reference: String,
}

/// Body for `POST /inventory/transfers`.
#[derive(Debug, Clone, Deserialize)]
pub struct TransferBody {
    pub product_id: String,
    pub from_branch_id: String,
    pub to_branch_id: String,
    pub quantity: i64,
    pub employee_id: String,
}

/// Both legs of a completed transfer.
#[derive(Debug, Clone, Serialize)]
pub struct TransferDetail {
    pub outgoing: InventoryMovement,
    pub incoming: InventoryMovement,
}

/// Body for `POST /stock-counts`.
#[derive(Debug, Clone, Deserialize)]
pub struct CountBody {
    pub branch_id: String,
    pub product_id: String,
    pub counted_quantity: i64,
    pub employee_id: String,
}

/// Body for count approval/rejection.
#[derive(Debug, Clone, Deserialize)]
pub struct ResolveCountBody {
    pub approver_id: String,
}

/// `GET /inventory/:branch_id` - cached quantity view for a branch.
pub async fn branch_inventory(
    State(state): State<SharedState>,
    Path(branch_id): Path<String>,
) -> Result<Json<Vec<InventoryRecord>>, ApiError> {
    let records = state.db.inventory().records_for_branch(&branch_id).await?;
    Ok(Json(records))
}

/// `GET /inventory/:branch_id/low-stock` - the oversell/low-stock signal.
pub async fn low_stock(
    State(state): State<SharedState>,
    Path(branch_id): Path<String>,
) -> Result<Json<Vec<InventoryRecord>>, ApiError> {
    let records = state.db.inventory().low_stock(&branch_id).await?;
    Ok(Json(records))
}

/// `POST /inventory/receivings` - receive purchased stock.
pub async fn receive_stock(
    State(state): State<SharedState>,
    Json(body): Json<ReceiveBody>,
) -> Result<(StatusCode, Json<InventoryMovement>), ApiError> {
    debug!(product_id = %body.product_id, quantity = body.quantity, "receive_stock");

    let movement = state
        .engine
        .stock
        .receive(
            &body.branch_id,
            &body.product_id,
            body.quantity,
            &body.employee_id,
            &body.reference,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(movement)))
}

/// `POST /inventory/transfers` - move stock between branches.
pub async fn transfer_stock(
    State(state): State<SharedState>,
    Json(body): Json<TransferBody>,
) -> Result<(StatusCode, Json<TransferDetail>), ApiError> {
    debug!(
        product_id = %body.product_id,
        from = %body.from_branch_id,
        to = %body.to_branch_id,
        "transfer_stock"
    );

    let (outgoing, incoming) = state
        .engine
        .stock
        .transfer(
            &body.product_id,
            &body.from_branch_id,
            &body.to_branch_id,
            body.quantity,
            &body.employee_id,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(TransferDetail { outgoing, incoming })))
}

/// `POST /stock-counts` - record a pending physical count.
pub async fn record_count(
    State(state): State<SharedState>,
    Json(body): Json<CountBody>,
) -> Result<(StatusCode, Json<StockCount>), ApiError> {
    let count = state
        .engine
        .stock
        .record_count(
            &body.branch_id,
            &body.product_id,
            body.counted_quantity,
            &body.employee_id,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(count)))
}

/// `PUT /stock-counts/:id/approve` - apply the count's discrepancy.
pub async fn approve_count(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(body): Json<ResolveCountBody>,
) -> Result<Json<Option<InventoryMovement>>, ApiError> {
    let movement = state.engine.stock.approve_count(&id, &body.approver_id).await?;
    Ok(Json(movement))
}

/// `PUT /stock-counts/:id/reject` - close the count with no effect.
pub async fn reject_count(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(body): Json<ResolveCountBody>,
) -> Result<StatusCode, ApiError> {
    state.engine.stock.reject_count(&id, &body.approver_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
