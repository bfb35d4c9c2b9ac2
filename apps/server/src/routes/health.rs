//! # Health Route

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};

use crate::SharedState;

/// `GET /health` - liveness plus a database round-trip.
pub async fn health(State(state): State<SharedState>) -> (StatusCode, Json<Value>) {
    let db_healthy = state.db.health_check().await;
    let status = if db_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(json!({
            "status": if db_healthy { "ok" } else { "degraded" },
            "database": db_healthy,
        })),
    )
}
