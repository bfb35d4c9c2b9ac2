//! # Stock Operations
//!
//! Purchase receiving, warehouse transfer, and physical stock counts. All of
//! them write through the inventory movement ledger; none mutate the record
//! cache directly.
//!
//! ## Stock Counts Are Two-Phase
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  record_count()   stores counted vs system quantity, status pending     │
//! │       │           (NO inventory effect)                                 │
//! │       ▼                                                                 │
//! │  approve_count()  manager/admin only; applies ONE `count` movement of   │
//! │       │           (counted − system) when a discrepancy exists          │
//! │       ▼                                                                 │
//! │  reject_count()   closes the count with no effect                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use meridian_core::validation::validate_positive_amount;
use meridian_core::{CountStatus, InventoryMovement, MovementType, Role, StockCount};
use meridian_db::{Database, MovementRequest};

/// Receiving, transfer, and stock count operations.
pub struct StockService {
    db: Database,
}

impl StockService {
    /// Creates the service.
    pub fn new(db: Database) -> Self {
        StockService { db }
    }

    /// Receives purchased stock into a branch.
    pub async fn receive(
        &self,
        branch_id: &str,
        product_id: &str,
        quantity: i64,
        employee_id: &str,
        reference: &str,
    ) -> EngineResult<InventoryMovement> {
        validate_positive_amount("quantity", quantity)?;
        self.tracked_product(product_id).await?;

        let movement = self
            .db
            .inventory()
            .apply_movement(&MovementRequest {
                product_id: product_id.to_string(),
                branch_id: branch_id.to_string(),
                movement_type: MovementType::Receiving,
                quantity,
                reference_type: "receiving".to_string(),
                reference_id: reference.to_string(),
                employee_id: employee_id.to_string(),
            })
            .await?;

        info!(product_id, branch_id, quantity, "Stock received");
        Ok(movement)
    }

    /// Moves stock between branches: a guarded decrement at the source, an
    /// increment at the destination, both in the ledger under one transfer
    /// reference.
    ///
    /// ## Errors
    /// `InsufficientStock` when the source cannot cover the quantity. Unlike
    /// the sale path, a warehouse cannot ship stock it does not have.
    pub async fn transfer(
        &self,
        product_id: &str,
        from_branch_id: &str,
        to_branch_id: &str,
        quantity: i64,
        employee_id: &str,
    ) -> EngineResult<(InventoryMovement, InventoryMovement)> {
        validate_positive_amount("quantity", quantity)?;
        self.tracked_product(product_id).await?;

        let transfer_id = Uuid::new_v4().to_string();

        let out = self
            .db
            .inventory()
            .apply_movement_checked(&MovementRequest {
                product_id: product_id.to_string(),
                branch_id: from_branch_id.to_string(),
                movement_type: MovementType::Transfer,
                quantity: -quantity,
                reference_type: "transfer".to_string(),
                reference_id: transfer_id.clone(),
                employee_id: employee_id.to_string(),
            })
            .await?;

        let out = match out {
            Some(movement) => movement,
            None => {
                let available = self
                    .db
                    .inventory()
                    .get_record(product_id, from_branch_id)
                    .await?
                    .map(|r| r.quantity)
                    .unwrap_or(0);
                return Err(EngineError::InsufficientStock {
                    product_id: product_id.to_string(),
                    available,
                    requested: quantity,
                });
            }
        };

        let incoming = self
            .db
            .inventory()
            .apply_movement(&MovementRequest {
                product_id: product_id.to_string(),
                branch_id: to_branch_id.to_string(),
                movement_type: MovementType::Transfer,
                quantity,
                reference_type: "transfer".to_string(),
                reference_id: transfer_id,
                employee_id: employee_id.to_string(),
            })
            .await?;

        info!(
            product_id,
            from_branch_id, to_branch_id, quantity, "Stock transferred"
        );
        Ok((out, incoming))
    }

    /// Records a physical count against the system quantity. Pending counts
    /// have no inventory effect.
    pub async fn record_count(
        &self,
        branch_id: &str,
        product_id: &str,
        counted_quantity: i64,
        employee_id: &str,
    ) -> EngineResult<StockCount> {
        if counted_quantity < 0 {
            return Err(meridian_core::ValidationError::MustNotBeNegative {
                field: "counted_quantity".to_string(),
            }
            .into());
        }
        self.tracked_product(product_id).await?;

        let system_quantity = self
            .db
            .inventory()
            .get_record(product_id, branch_id)
            .await?
            .map(|r| r.quantity)
            .unwrap_or(0);

        let count = StockCount {
            id: Uuid::new_v4().to_string(),
            product_id: product_id.to_string(),
            branch_id: branch_id.to_string(),
            counted_quantity,
            system_quantity,
            status: CountStatus::Pending,
            counted_by: employee_id.to_string(),
            approved_by: None,
            created_at: Utc::now(),
            resolved_at: None,
        };
        self.db.inventory().insert_stock_count(&count).await?;

        info!(
            count_id = %count.id,
            product_id,
            counted_quantity,
            system_quantity,
            "Stock count recorded"
        );
        Ok(count)
    }

    /// Approves a pending count. When a discrepancy exists, applies a single
    /// `count` movement of `counted − system`; a clean count applies nothing.
    pub async fn approve_count(
        &self,
        count_id: &str,
        approver_id: &str,
    ) -> EngineResult<Option<InventoryMovement>> {
        let count = self.resolvable_count(count_id, approver_id).await?;

        if !self
            .db
            .inventory()
            .resolve_stock_count(count_id, CountStatus::Approved, approver_id)
            .await?
        {
            return Err(EngineError::conflict(format!(
                "stock count {count_id} is already resolved"
            )));
        }

        if count.discrepancy() == 0 {
            info!(count_id, "Stock count approved with no discrepancy");
            return Ok(None);
        }

        let movement = self
            .db
            .inventory()
            .apply_movement(&MovementRequest {
                product_id: count.product_id.clone(),
                branch_id: count.branch_id.clone(),
                movement_type: MovementType::Count,
                quantity: count.discrepancy(),
                reference_type: "stock_count".to_string(),
                reference_id: count.id.clone(),
                employee_id: approver_id.to_string(),
            })
            .await?;

        info!(
            count_id,
            discrepancy = count.discrepancy(),
            "Stock count approved, adjustment applied"
        );
        Ok(Some(movement))
    }

    /// Rejects a pending count. No inventory effect, ever.
    pub async fn reject_count(&self, count_id: &str, approver_id: &str) -> EngineResult<()> {
        self.resolvable_count(count_id, approver_id).await?;

        if !self
            .db
            .inventory()
            .resolve_stock_count(count_id, CountStatus::Rejected, approver_id)
            .await?
        {
            return Err(EngineError::conflict(format!(
                "stock count {count_id} is already resolved"
            )));
        }

        info!(count_id, "Stock count rejected");
        Ok(())
    }

    async fn resolvable_count(
        &self,
        count_id: &str,
        approver_id: &str,
    ) -> EngineResult<StockCount> {
        let count = self
            .db
            .inventory()
            .get_stock_count(count_id)
            .await?
            .ok_or_else(|| EngineError::not_found("StockCount", count_id))?;

        let approver = self
            .db
            .employees()
            .get_by_id(approver_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Employee", approver_id))?;
        if approver.role == Role::Cashier {
            return Err(EngineError::forbidden(
                "stock count approval requires a manager or administrator",
            ));
        }

        Ok(count)
    }

    async fn tracked_product(&self, product_id: &str) -> EngineResult<()> {
        let product = self
            .db
            .products()
            .get_by_id(product_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Product", product_id))?;
        if !product.track_inventory {
            return Err(EngineError::conflict(format!(
                "product {product_id} does not track inventory"
            )));
        }
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{test_engine, ADMIN, BRANCH, CASHIER, PRODUCT_TRACKED};

    const OTHER_BRANCH: &str = "branch-2";

    async fn seed_other_branch(db: &meridian_db::Database) {
        db.branches()
            .insert(&meridian_core::Branch {
                id: OTHER_BRANCH.into(),
                name: "Uptown".into(),
                tax_rate_bps: 500,
                created_at: Utc::now(),
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn receiving_builds_stock_through_the_ledger() {
        let (engine, db) = test_engine().await;

        engine
            .stock
            .receive(BRANCH, PRODUCT_TRACKED, 12, ADMIN, "po-77")
            .await
            .unwrap();

        let record = db
            .inventory()
            .get_record(PRODUCT_TRACKED, BRANCH)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.quantity, 12);
        assert_eq!(
            db.inventory().sum_movements(PRODUCT_TRACKED, BRANCH).await.unwrap(),
            12
        );
    }

    #[tokio::test]
    async fn transfer_is_guarded_at_the_source() {
        let (engine, db) = test_engine().await;
        seed_other_branch(&db).await;

        engine
            .stock
            .receive(BRANCH, PRODUCT_TRACKED, 5, ADMIN, "po-1")
            .await
            .unwrap();

        // cannot ship 8 out of 5
        let err = engine
            .stock
            .transfer(PRODUCT_TRACKED, BRANCH, OTHER_BRANCH, 8, ADMIN)
            .await
            .unwrap_err();
        match err {
            EngineError::InsufficientStock {
                available,
                requested,
                ..
            } => {
                assert_eq!(available, 5);
                assert_eq!(requested, 8);
            }
            other => panic!("expected InsufficientStock, got {other:?}"),
        }

        // shipping 3 works and both ledgers stay truthful
        engine
            .stock
            .transfer(PRODUCT_TRACKED, BRANCH, OTHER_BRANCH, 3, ADMIN)
            .await
            .unwrap();

        let source = db
            .inventory()
            .get_record(PRODUCT_TRACKED, BRANCH)
            .await
            .unwrap()
            .unwrap();
        let dest = db
            .inventory()
            .get_record(PRODUCT_TRACKED, OTHER_BRANCH)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(source.quantity, 2);
        assert_eq!(dest.quantity, 3);
        assert_eq!(
            db.inventory().sum_movements(PRODUCT_TRACKED, OTHER_BRANCH).await.unwrap(),
            3
        );
    }

    #[tokio::test]
    async fn pending_counts_have_no_effect_until_approved() {
        let (engine, db) = test_engine().await;

        engine
            .stock
            .receive(BRANCH, PRODUCT_TRACKED, 10, ADMIN, "po-1")
            .await
            .unwrap();

        // counted 7 against a system quantity of 10
        let count = engine
            .stock
            .record_count(BRANCH, PRODUCT_TRACKED, 7, CASHIER)
            .await
            .unwrap();
        assert_eq!(count.discrepancy(), -3);

        // still 10: pending counts are inert
        let record = db
            .inventory()
            .get_record(PRODUCT_TRACKED, BRANCH)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.quantity, 10);

        // approval applies the -3 adjustment
        let movement = engine
            .stock
            .approve_count(&count.id, ADMIN)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(movement.quantity, -3);

        let record = db
            .inventory()
            .get_record(PRODUCT_TRACKED, BRANCH)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.quantity, 7);
        assert_eq!(
            db.inventory().sum_movements(PRODUCT_TRACKED, BRANCH).await.unwrap(),
            7
        );
    }

    #[tokio::test]
    async fn count_approval_needs_rank_and_happens_once() {
        let (engine, _db) = test_engine().await;

        engine
            .stock
            .receive(BRANCH, PRODUCT_TRACKED, 10, ADMIN, "po-1")
            .await
            .unwrap();
        let count = engine
            .stock
            .record_count(BRANCH, PRODUCT_TRACKED, 9, CASHIER)
            .await
            .unwrap();

        // the counter can't approve their own count
        let err = engine.stock.approve_count(&count.id, CASHIER).await.unwrap_err();
        assert!(matches!(err, EngineError::Forbidden { .. }));

        engine.stock.approve_count(&count.id, ADMIN).await.unwrap();
        let err = engine.stock.approve_count(&count.id, ADMIN).await.unwrap_err();
        assert!(matches!(err, EngineError::Conflict { .. }));
    }

    #[tokio::test]
    async fn rejected_counts_never_touch_inventory() {
        let (engine, db) = test_engine().await;

        engine
            .stock
            .receive(BRANCH, PRODUCT_TRACKED, 10, ADMIN, "po-1")
            .await
            .unwrap();
        let count = engine
            .stock
            .record_count(BRANCH, PRODUCT_TRACKED, 2, CASHIER)
            .await
            .unwrap();

        engine.stock.reject_count(&count.id, ADMIN).await.unwrap();

        let record = db
            .inventory()
            .get_record(PRODUCT_TRACKED, BRANCH)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.quantity, 10);

        let stored = db.inventory().get_stock_count(&count.id).await.unwrap().unwrap();
        assert_eq!(stored.status, CountStatus::Rejected);
        assert_eq!(stored.approved_by.as_deref(), Some(ADMIN));
    }
}
