//! # Inventory Ledger Repository
//!
//! The append-only movement log plus its materialized per (product, branch)
//! quantity cache. This is the core of the whole engine.
//!
//! ## The One Rule
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │            ALL STOCK CHANGES GO THROUGH apply_movement()                │
//! │                                                                         │
//! │  sale ──────────┐                                                       │
//! │  return ────────┤      ┌───────────────────────────────────────────┐    │
//! │  receiving ─────┼────► │  ONE TRANSACTION                          │    │
//! │  transfer ──────┤      │  1. UPDATE records                        │    │
//! │  count ─────────┘      │     SET quantity = quantity + Δ  (atomic) │    │
//! │                        │  2. read back new quantity                │    │
//! │                        │  3. INSERT movement (prev, new, Δ)        │    │
//! │                        └───────────────────────────────────────────┘    │
//! │                                                                         │
//! │  INVARIANT (testable): record.quantity == Σ movements.quantity          │
//! │  for every (product, branch) pair, at every point in time.              │
//! │                                                                         │
//! │  The increment is a single SQL statement. Two terminals selling the     │
//! │  last unit concurrently both land their delta; there is no              │
//! │  read-modify-write window to lose an update in.                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use meridian_core::{CountStatus, InventoryMovement, InventoryRecord, MovementType, StockCount};

/// A request to apply one signed stock change.
#[derive(Debug, Clone)]
pub struct MovementRequest {
    pub product_id: String,
    pub branch_id: String,
    pub movement_type: MovementType,
    /// Signed delta: sales negative, returns/receiving positive.
    pub quantity: i64,
    pub reference_type: String,
    pub reference_id: String,
    pub employee_id: String,
}

/// Repository for the inventory movement ledger.
#[derive(Debug, Clone)]
pub struct InventoryRepository {
    pool: SqlitePool,
}

impl InventoryRepository {
    /// Creates a new InventoryRepository.
    pub fn new(pool: SqlitePool) -> Self {
        InventoryRepository { pool }
    }

    /// Applies a movement: atomic increment of the record plus the ledger
    /// append, in one transaction.
    ///
    /// Unseen (product, branch) pairs are upserted starting from zero, so
    /// the first receiving or the first (oversold) sale both work.
    /// Decrementing below zero is allowed here; oversell is a policy
    /// decision made upstream and stays observable through the low-stock
    /// view, not by corrupting the ledger.
    pub async fn apply_movement(&self, req: &MovementRequest) -> DbResult<InventoryMovement> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        // Atomic upsert-increment; `excluded` carries the candidate row.
        sqlx::query(
            "INSERT INTO inventory_records (product_id, branch_id, quantity, low_stock_threshold, reorder_point, updated_at)
             VALUES (?1, ?2, ?3, 0, 0, ?4)
             ON CONFLICT(product_id, branch_id) DO UPDATE SET
                quantity = inventory_records.quantity + excluded.quantity,
                updated_at = excluded.updated_at",
        )
        .bind(&req.product_id)
        .bind(&req.branch_id)
        .bind(req.quantity)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let new_quantity: i64 = sqlx::query_scalar(
            "SELECT quantity FROM inventory_records WHERE product_id = ?1 AND branch_id = ?2",
        )
        .bind(&req.product_id)
        .bind(&req.branch_id)
        .fetch_one(&mut *tx)
        .await?;

        let movement = self
            .insert_movement(&mut tx, req, new_quantity - req.quantity, new_quantity)
            .await?;

        tx.commit().await?;

        debug!(
            product_id = %req.product_id,
            branch_id = %req.branch_id,
            quantity = req.quantity,
            new_quantity,
            "Inventory movement applied"
        );

        Ok(movement)
    }

    /// Applies a movement only if it would not take the quantity negative.
    ///
    /// The guard lives in the WHERE clause of the decrement itself, so the
    /// check and the change are one atomic statement.
    ///
    /// ## Returns
    /// `None` when stock is insufficient (or the pair has no record yet and
    /// the delta is negative); the caller surfaces `InsufficientStock`.
    pub async fn apply_movement_checked(
        &self,
        req: &MovementRequest,
    ) -> DbResult<Option<InventoryMovement>> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            "UPDATE inventory_records SET
                quantity = quantity + ?3,
                updated_at = ?4
             WHERE product_id = ?1 AND branch_id = ?2 AND quantity + ?3 >= 0",
        )
        .bind(&req.product_id)
        .bind(&req.branch_id)
        .bind(req.quantity)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            // Positive deltas on an unseen pair are fine: create the record.
            if req.quantity >= 0 {
                sqlx::query(
                    "INSERT INTO inventory_records (product_id, branch_id, quantity, low_stock_threshold, reorder_point, updated_at)
                     VALUES (?1, ?2, ?3, 0, 0, ?4)",
                )
                .bind(&req.product_id)
                .bind(&req.branch_id)
                .bind(req.quantity)
                .bind(now)
                .execute(&mut *tx)
                .await?;
            } else {
                return Ok(None);
            }
        }

        let new_quantity: i64 = sqlx::query_scalar(
            "SELECT quantity FROM inventory_records WHERE product_id = ?1 AND branch_id = ?2",
        )
        .bind(&req.product_id)
        .bind(&req.branch_id)
        .fetch_one(&mut *tx)
        .await?;

        let movement = self
            .insert_movement(&mut tx, req, new_quantity - req.quantity, new_quantity)
            .await?;

        tx.commit().await?;

        Ok(Some(movement))
    }

    async fn insert_movement(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        req: &MovementRequest,
        previous_quantity: i64,
        new_quantity: i64,
    ) -> DbResult<InventoryMovement> {
        let movement = InventoryMovement {
            id: Uuid::new_v4().to_string(),
            product_id: req.product_id.clone(),
            branch_id: req.branch_id.clone(),
            movement_type: req.movement_type,
            quantity: req.quantity,
            previous_quantity,
            new_quantity,
            reference_type: req.reference_type.clone(),
            reference_id: req.reference_id.clone(),
            employee_id: req.employee_id.clone(),
            created_at: Utc::now(),
        };

        sqlx::query(
            "INSERT INTO inventory_movements (
                id, product_id, branch_id, movement_type, quantity,
                previous_quantity, new_quantity, reference_type, reference_id,
                employee_id, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        )
        .bind(&movement.id)
        .bind(&movement.product_id)
        .bind(&movement.branch_id)
        .bind(movement.movement_type)
        .bind(movement.quantity)
        .bind(movement.previous_quantity)
        .bind(movement.new_quantity)
        .bind(&movement.reference_type)
        .bind(&movement.reference_id)
        .bind(&movement.employee_id)
        .bind(movement.created_at)
        .execute(&mut **tx)
        .await?;

        Ok(movement)
    }

    /// Gets the cached record for a (product, branch) pair.
    pub async fn get_record(
        &self,
        product_id: &str,
        branch_id: &str,
    ) -> DbResult<Option<InventoryRecord>> {
        let record = sqlx::query_as::<_, InventoryRecord>(
            "SELECT product_id, branch_id, quantity, low_stock_threshold, reorder_point, updated_at
             FROM inventory_records
             WHERE product_id = ?1 AND branch_id = ?2",
        )
        .bind(product_id)
        .bind(branch_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    /// Running sum of the movement log for a pair.
    ///
    /// `get_record(..).quantity == sum_movements(..)` is THE core testable
    /// invariant of the engine.
    pub async fn sum_movements(&self, product_id: &str, branch_id: &str) -> DbResult<i64> {
        let sum: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(quantity), 0)
             FROM inventory_movements
             WHERE product_id = ?1 AND branch_id = ?2",
        )
        .bind(product_id)
        .bind(branch_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(sum)
    }

    /// Movements recorded against one reference (e.g. all movements of a
    /// sale, for the return workflow to reverse).
    pub async fn movements_for_reference(
        &self,
        reference_type: &str,
        reference_id: &str,
    ) -> DbResult<Vec<InventoryMovement>> {
        let movements = sqlx::query_as::<_, InventoryMovement>(
            "SELECT id, product_id, branch_id, movement_type, quantity,
                    previous_quantity, new_quantity, reference_type, reference_id,
                    employee_id, created_at
             FROM inventory_movements
             WHERE reference_type = ?1 AND reference_id = ?2
             ORDER BY created_at",
        )
        .bind(reference_type)
        .bind(reference_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(movements)
    }

    /// Records at or below their low-stock threshold for a branch.
    ///
    /// This is the observable downstream signal for oversell (quantities can
    /// go negative on the sale path by design).
    pub async fn low_stock(&self, branch_id: &str) -> DbResult<Vec<InventoryRecord>> {
        let records = sqlx::query_as::<_, InventoryRecord>(
            "SELECT product_id, branch_id, quantity, low_stock_threshold, reorder_point, updated_at
             FROM inventory_records
             WHERE branch_id = ?1 AND quantity <= low_stock_threshold
             ORDER BY quantity ASC",
        )
        .bind(branch_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    /// All records for a branch (the quantity view of the API).
    pub async fn records_for_branch(&self, branch_id: &str) -> DbResult<Vec<InventoryRecord>> {
        let records = sqlx::query_as::<_, InventoryRecord>(
            "SELECT product_id, branch_id, quantity, low_stock_threshold, reorder_point, updated_at
             FROM inventory_records
             WHERE branch_id = ?1
             ORDER BY product_id",
        )
        .bind(branch_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    // -------------------------------------------------------------------------
    // Stock counts
    // -------------------------------------------------------------------------

    /// Records a pending physical stock count. No inventory effect until
    /// approval.
    pub async fn insert_stock_count(&self, count: &StockCount) -> DbResult<()> {
        sqlx::query(
            "INSERT INTO stock_counts (
                id, product_id, branch_id, counted_quantity, system_quantity,
                status, counted_by, approved_by, created_at, resolved_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        )
        .bind(&count.id)
        .bind(&count.product_id)
        .bind(&count.branch_id)
        .bind(count.counted_quantity)
        .bind(count.system_quantity)
        .bind(count.status)
        .bind(&count.counted_by)
        .bind(&count.approved_by)
        .bind(count.created_at)
        .bind(count.resolved_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets a stock count by ID.
    pub async fn get_stock_count(&self, id: &str) -> DbResult<Option<StockCount>> {
        let count = sqlx::query_as::<_, StockCount>(
            "SELECT id, product_id, branch_id, counted_quantity, system_quantity,
                    status, counted_by, approved_by, created_at, resolved_at
             FROM stock_counts
             WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(count)
    }

    /// Resolves a pending count to approved or rejected, exactly once.
    ///
    /// ## Returns
    /// `true` when this call performed the transition.
    pub async fn resolve_stock_count(
        &self,
        id: &str,
        status: CountStatus,
        resolved_by: &str,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            "UPDATE stock_counts SET
                status = ?2,
                approved_by = ?3,
                resolved_at = ?4
             WHERE id = ?1 AND status = 'pending'",
        )
        .bind(id)
        .bind(status)
        .bind(resolved_by)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::testing::{seed_org, test_db, BRANCH, CASHIER, PRODUCT_TRACKED};
    use meridian_core::CountStatus;

    fn movement(movement_type: MovementType, quantity: i64, reference_id: &str) -> MovementRequest {
        MovementRequest {
            product_id: PRODUCT_TRACKED.to_string(),
            branch_id: BRANCH.to_string(),
            movement_type,
            quantity,
            reference_type: "test".to_string(),
            reference_id: reference_id.to_string(),
            employee_id: CASHIER.to_string(),
        }
    }

    #[tokio::test]
    async fn record_always_equals_movement_sum() {
        let db = test_db().await;
        seed_org(&db).await;
        let inventory = db.inventory();

        inventory
            .apply_movement(&movement(MovementType::Receiving, 10, "rcv-1"))
            .await
            .unwrap();
        inventory
            .apply_movement(&movement(MovementType::Sale, -3, "sale-1"))
            .await
            .unwrap();
        inventory
            .apply_movement(&movement(MovementType::Return, 1, "ret-1"))
            .await
            .unwrap();

        let record = inventory
            .get_record(PRODUCT_TRACKED, BRANCH)
            .await
            .unwrap()
            .unwrap();
        let sum = inventory.sum_movements(PRODUCT_TRACKED, BRANCH).await.unwrap();

        assert_eq!(record.quantity, 8);
        assert_eq!(record.quantity, sum);
    }

    #[tokio::test]
    async fn movement_carries_previous_and_new_quantity() {
        let db = test_db().await;
        seed_org(&db).await;
        let inventory = db.inventory();

        inventory
            .apply_movement(&movement(MovementType::Receiving, 3, "rcv-1"))
            .await
            .unwrap();
        let sale = inventory
            .apply_movement(&movement(MovementType::Sale, -3, "sale-1"))
            .await
            .unwrap();

        // selling the full stock of 3 lands on zero
        assert_eq!(sale.previous_quantity, 3);
        assert_eq!(sale.new_quantity, 0);
        assert_eq!(sale.quantity, -3);
    }

    #[tokio::test]
    async fn oversell_goes_negative_and_shows_in_low_stock() {
        let db = test_db().await;
        seed_org(&db).await;
        let inventory = db.inventory();

        inventory
            .apply_movement(&movement(MovementType::Sale, -2, "sale-1"))
            .await
            .unwrap();

        let record = inventory
            .get_record(PRODUCT_TRACKED, BRANCH)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.quantity, -2);

        let low = inventory.low_stock(BRANCH).await.unwrap();
        assert!(low.iter().any(|r| r.product_id == PRODUCT_TRACKED));
    }

    #[tokio::test]
    async fn checked_movement_refuses_insufficient_stock() {
        let db = test_db().await;
        seed_org(&db).await;
        let inventory = db.inventory();

        inventory
            .apply_movement(&movement(MovementType::Receiving, 2, "rcv-1"))
            .await
            .unwrap();

        let refused = inventory
            .apply_movement_checked(&movement(MovementType::Transfer, -5, "tr-1"))
            .await
            .unwrap();
        assert!(refused.is_none());

        let applied = inventory
            .apply_movement_checked(&movement(MovementType::Transfer, -2, "tr-2"))
            .await
            .unwrap();
        assert!(applied.is_some());

        let record = inventory
            .get_record(PRODUCT_TRACKED, BRANCH)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.quantity, 0);
    }

    #[tokio::test]
    async fn movement_log_is_append_only() {
        let db = test_db().await;
        seed_org(&db).await;
        let inventory = db.inventory();

        let m = inventory
            .apply_movement(&movement(MovementType::Receiving, 5, "rcv-1"))
            .await
            .unwrap();

        let update = sqlx::query("UPDATE inventory_movements SET quantity = 99 WHERE id = ?1")
            .bind(&m.id)
            .execute(db.pool())
            .await;
        assert!(update.is_err());

        let delete = sqlx::query("DELETE FROM inventory_movements WHERE id = ?1")
            .bind(&m.id)
            .execute(db.pool())
            .await;
        assert!(delete.is_err());
    }

    #[tokio::test]
    async fn stock_count_resolves_exactly_once() {
        let db = test_db().await;
        seed_org(&db).await;
        let inventory = db.inventory();

        let count = StockCount {
            id: "count-1".into(),
            product_id: PRODUCT_TRACKED.into(),
            branch_id: BRANCH.into(),
            counted_quantity: 7,
            system_quantity: 10,
            status: CountStatus::Pending,
            counted_by: CASHIER.into(),
            approved_by: None,
            created_at: Utc::now(),
            resolved_at: None,
        };
        inventory.insert_stock_count(&count).await.unwrap();

        let first = inventory
            .resolve_stock_count("count-1", CountStatus::Approved, "emp-admin")
            .await
            .unwrap();
        let second = inventory
            .resolve_stock_count("count-1", CountStatus::Approved, "emp-admin")
            .await
            .unwrap();

        assert!(first);
        assert!(!second);
    }
}
