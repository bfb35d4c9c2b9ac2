//! # Return/Refund Workflow
//!
//! The mirror of the sale commit: reverses the sale's inventory movements,
//! flips the original sale to refunded (exactly once), and persists a return
//! with its items.
//!
//! ## Forgery Resistance
//! The workflow re-reads the original sale's items from storage and reverses
//! the sale's OWN movements. Client-supplied item lists are never trusted,
//! so a caller cannot inflate a return beyond what was actually sold.
//!
//! ## Exactly Once
//! The conditional `completed → refunded` flip is the gate: it is a single
//! atomic statement, and the loser of a concurrent double-return sees zero
//! affected rows. The unique constraint on `returns.original_sale_id` is the
//! storage-layer backstop.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use crate::notify::Notifier;
use meridian_core::validation::validate_reason;
use meridian_core::{
    ActivityEntry, MovementType, NotificationEvent, ReturnItem, ReturnRecord, ReturnType,
};
use meridian_db::{Database, MovementRequest};

/// A return submission. Note the absence of an item list: items come from
/// the original sale, never from the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReturnRequest {
    pub original_sale_id: String,
    pub employee_id: String,
    pub reason: String,
    pub return_type: ReturnType,
}

/// A processed return with its rebuilt items.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessedReturn {
    pub record: ReturnRecord,
    pub items: Vec<ReturnItem>,
}

/// The return/refund workflow.
pub struct ReturnWorkflow {
    db: Database,
    notifier: Notifier,
}

impl ReturnWorkflow {
    /// Creates the workflow over its collaborators.
    pub fn new(db: Database, notifier: Notifier) -> Self {
        ReturnWorkflow { db, notifier }
    }

    /// Processes a return against one original sale.
    ///
    /// ## Errors
    /// - `NotFound` when the sale or employee doesn't exist
    /// - `Conflict` when the sale was already returned
    pub async fn process(&self, req: &ReturnRequest) -> EngineResult<ProcessedReturn> {
        validate_reason(&req.reason)?;

        let employee = self
            .db
            .employees()
            .get_by_id(&req.employee_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Employee", &req.employee_id))?;
        let sale = self
            .db
            .sales()
            .get_by_id(&req.original_sale_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Sale", &req.original_sale_id))?;

        // The gate: claim the sale, exactly once.
        if !self.db.sales().mark_refunded(&sale.id).await? {
            return Err(EngineError::conflict(format!(
                "sale {} has already been returned",
                sale.id
            )));
        }

        let now = Utc::now();
        let return_id = Uuid::new_v4().to_string();

        // Reverse the sale's own movements: the exact negation, so the
        // ledger sums back to its pre-sale state for every touched pair.
        let original_movements = self
            .db
            .inventory()
            .movements_for_reference("sale", &sale.id)
            .await?;
        for movement in &original_movements {
            self.db
                .inventory()
                .apply_movement(&MovementRequest {
                    product_id: movement.product_id.clone(),
                    branch_id: movement.branch_id.clone(),
                    movement_type: MovementType::Return,
                    quantity: -movement.quantity,
                    reference_type: "return".to_string(),
                    reference_id: return_id.clone(),
                    employee_id: employee.id.clone(),
                })
                .await?;
        }

        // Rebuild items from the sale's persisted lines.
        let sale_items = self.db.sales().get_items(&sale.id).await?;
        let items: Vec<ReturnItem> = sale_items
            .iter()
            .map(|item| ReturnItem {
                id: Uuid::new_v4().to_string(),
                return_id: return_id.clone(),
                product_id: item.product_id.clone(),
                name_snapshot: item.name_snapshot.clone(),
                quantity: item.quantity,
                unit_price_cents: item.unit_price_cents,
                total_cents: item.total_cents,
                created_at: now,
            })
            .collect();

        let record = ReturnRecord {
            id: return_id.clone(),
            original_sale_id: sale.id.clone(),
            branch_id: sale.branch_id.clone(),
            employee_id: employee.id.clone(),
            reason: req.reason.trim().to_string(),
            return_type: req.return_type,
            total_cents: sale.total_cents,
            created_at: now,
        };
        self.db.returns().insert_return(&record, &items).await?;

        info!(
            return_id = %return_id,
            original_sale_id = %sale.id,
            total_cents = record.total_cents,
            "Return processed"
        );

        self.db
            .activity()
            .log(&ActivityEntry {
                id: format!("return:{return_id}:activity"),
                branch_id: sale.branch_id.clone(),
                employee_id: employee.id.clone(),
                action: "return_processed".to_string(),
                entity_type: "return".to_string(),
                entity_id: return_id.clone(),
                details: Some(format!("reverses sale {}", sale.receipt_number)),
                created_at: now,
            })
            .await?;
        self.notifier
            .fan_out_best_effort(
                &sale.branch_id,
                NotificationEvent::ReturnProcessed,
                &json!({
                    "return_id": return_id,
                    "original_sale_id": sale.id,
                    "total_cents": record.total_cents,
                    "return_type": req.return_type,
                }),
            )
            .await;

        Ok(ProcessedReturn { record, items })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
