//! # HTTP Routes
//!
//! Thin handlers: deserialize, call the engine, serialize. No business
//! logic lives here.

pub mod cash_drawer;
pub mod health;
pub mod inventory;
pub mod returns;
pub mod sales;
pub mod shifts;

use axum::routing::{get, post, put};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::SharedState;

/// Builds the full application router.
pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        // Sales
        .route("/sales", post(sales::create_sale))
        .route("/sales/:id", get(sales::get_sale))
        .route("/sales/:id/retry-steps", post(sales::retry_steps))
        // Returns
        .route("/returns", post(returns::create_return))
        // Shifts & cash drawer
        .route("/shifts", post(shifts::open_shift))
        // PUT /shifts/:id is the administrative override path; the engine
        // enforces the admin role when the actor is not the owner.
        .route("/shifts/:id", get(shifts::get_shift).put(shifts::close_shift))
        .route("/shifts/:id/close", put(shifts::close_shift))
        .route("/cash-drawer", post(cash_drawer::record_operation))
        // Inventory
        .route("/inventory/:branch_id", get(inventory::branch_inventory))
        .route("/inventory/:branch_id/low-stock", get(inventory::low_stock))
        .route("/inventory/receivings", post(inventory::receive_stock))
        .route("/inventory/transfers", post(inventory::transfer_stock))
        // Stock counts
        .route("/stock-counts", post(inventory::record_count))
        .route("/stock-counts/:id/approve", put(inventory::approve_count))
        .route("/stock-counts/:id/reject", put(inventory::reject_count))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
