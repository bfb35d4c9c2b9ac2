//! # Shift & Cash Drawer Repository
//!
//! The accountable cash window. Two invariants live here, both enforced
//! atomically at the storage layer:
//!
//! 1. At most one `open` shift per employee: conditional INSERT guarded by
//!    a `WHERE NOT EXISTS`, with a partial unique index as backstop. Never a
//!    prior SELECT: two terminals opening concurrently race the same
//!    statement and exactly one wins.
//! 2. Cash drawer operations require an open shift: the existence check is
//!    part of the INSERT itself, so a force-closed shift deterministically
//!    rejects late operations.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use meridian_core::{CashDrawerOperation, Shift};

const SHIFT_COLUMNS: &str = "id, employee_id, branch_id, start_time, end_time, \
     expected_duration_hours, opening_cash_cents, closing_cash_cents, \
     total_sales_cents, total_transactions, status, closed_by, created_at";

/// Repository for shift and cash drawer operations.
#[derive(Debug, Clone)]
pub struct ShiftRepository {
    pool: SqlitePool,
}

impl ShiftRepository {
    /// Creates a new ShiftRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ShiftRepository { pool }
    }

    /// Opens a shift if the employee has none open.
    ///
    /// ## Returns
    /// `true` when the shift was inserted; `false` when an open shift
    /// already existed (either observed by the NOT EXISTS guard or caught by
    /// the partial unique index under a perfectly timed race).
    pub async fn open(&self, shift: &Shift) -> DbResult<bool> {
        debug!(shift_id = %shift.id, employee_id = %shift.employee_id, "Opening shift");

        let result = sqlx::query(
            "INSERT INTO shifts (
                id, employee_id, branch_id, start_time, end_time,
                expected_duration_hours, opening_cash_cents, closing_cash_cents,
                total_sales_cents, total_transactions, status, closed_by, created_at
            )
            SELECT ?1, ?2, ?3, ?4, NULL, ?5, ?6, NULL, 0, 0, 'open', NULL, ?7
            WHERE NOT EXISTS (
                SELECT 1 FROM shifts WHERE employee_id = ?2 AND status = 'open'
            )",
        )
        .bind(&shift.id)
        .bind(&shift.employee_id)
        .bind(&shift.branch_id)
        .bind(shift.start_time)
        .bind(shift.expected_duration_hours)
        .bind(shift.opening_cash_cents)
        .bind(shift.created_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(r) => Ok(r.rows_affected() > 0),
            Err(e) => {
                let db_err: crate::DbError = e.into();
                if db_err.is_unique_violation() {
                    Ok(false)
                } else {
                    Err(db_err)
                }
            }
        }
    }

    /// Gets a shift by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Shift>> {
        let query = format!("SELECT {SHIFT_COLUMNS} FROM shifts WHERE id = ?1");
        let shift = sqlx::query_as::<_, Shift>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(shift)
    }

    /// Gets the open shift for an employee, if any.
    pub async fn get_open_for_employee(&self, employee_id: &str) -> DbResult<Option<Shift>> {
        let query = format!(
            "SELECT {SHIFT_COLUMNS} FROM shifts WHERE employee_id = ?1 AND status = 'open'"
        );
        let shift = sqlx::query_as::<_, Shift>(&query)
            .bind(employee_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(shift)
    }

    /// Closes an open shift, recording totals, closing cash, and who closed
    /// it (the owner, or an administrator on force-close).
    ///
    /// ## Returns
    /// `true` when this call performed the close; `false` when the shift was
    /// not open (already closed, or never existed).
    #[allow(clippy::too_many_arguments)]
    pub async fn close(
        &self,
        shift_id: &str,
        end_time: DateTime<Utc>,
        closing_cash_cents: i64,
        total_sales_cents: i64,
        total_transactions: i64,
        closed_by: &str,
    ) -> DbResult<bool> {
        debug!(shift_id = %shift_id, closed_by = %closed_by, "Closing shift");

        let result = sqlx::query(
            "UPDATE shifts SET
                status = 'closed',
                end_time = ?2,
                closing_cash_cents = ?3,
                total_sales_cents = ?4,
                total_transactions = ?5,
                closed_by = ?6
             WHERE id = ?1 AND status = 'open'",
        )
        .bind(shift_id)
        .bind(end_time)
        .bind(closing_cash_cents)
        .bind(total_sales_cents)
        .bind(total_transactions)
        .bind(closed_by)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Records a cash drawer operation against an OPEN shift.
    ///
    /// The open-shift requirement is part of the INSERT statement; there is
    /// no window between check and append.
    ///
    /// ## Returns
    /// `true` when recorded; `false` when the shift is not open.
    pub async fn insert_cash_operation(&self, op: &CashDrawerOperation) -> DbResult<bool> {
        let result = sqlx::query(
            "INSERT INTO cash_drawer_operations (
                id, shift_id, employee_id, op_type, amount_cents, reason, created_at
            )
            SELECT ?1, ?2, ?3, ?4, ?5, ?6, ?7
            WHERE EXISTS (
                SELECT 1 FROM shifts WHERE id = ?2 AND status = 'open'
            )",
        )
        .bind(&op.id)
        .bind(&op.shift_id)
        .bind(&op.employee_id)
        .bind(op.op_type)
        .bind(op.amount_cents)
        .bind(&op.reason)
        .bind(op.created_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// All drawer operations for a shift, oldest first.
    pub async fn operations_for_shift(&self, shift_id: &str) -> DbResult<Vec<CashDrawerOperation>> {
        let ops = sqlx::query_as::<_, CashDrawerOperation>(
            "SELECT id, shift_id, employee_id, op_type, amount_cents, reason, created_at
             FROM cash_drawer_operations
             WHERE shift_id = ?1
             ORDER BY created_at",
        )
        .bind(shift_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ops)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::testing::{seed_org, test_db, ADMIN, BRANCH, CASHIER};
    use meridian_core::{CashOpType, ShiftStatus};

    fn new_shift(id: &str, employee_id: &str) -> Shift {
        let now = Utc::now();
        Shift {
            id: id.to_string(),
            employee_id: employee_id.to_string(),
            branch_id: BRANCH.to_string(),
            start_time: now,
            end_time: None,
            expected_duration_hours: 8.0,
            opening_cash_cents: 20_000,
            closing_cash_cents: None,
            total_sales_cents: 0,
            total_transactions: 0,
            status: ShiftStatus::Open,
            closed_by: None,
            created_at: now,
        }
    }

    fn drawer_op(id: &str, shift_id: &str) -> CashDrawerOperation {
        CashDrawerOperation {
            id: id.to_string(),
            shift_id: shift_id.to_string(),
            employee_id: CASHIER.to_string(),
            op_type: CashOpType::Deposit,
            amount_cents: 5_000,
            reason: "till top-up".to_string(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn at_most_one_open_shift_per_employee() {
        let db = test_db().await;
        seed_org(&db).await;
        let shifts = db.shifts();

        assert!(shifts.open(&new_shift("sh-1", CASHIER)).await.unwrap());
        // second open attempt for the same employee loses
        assert!(!shifts.open(&new_shift("sh-2", CASHIER)).await.unwrap());
        // a different employee is unaffected
        assert!(shifts.open(&new_shift("sh-3", ADMIN)).await.unwrap());

        let open = shifts.get_open_for_employee(CASHIER).await.unwrap().unwrap();
        assert_eq!(open.id, "sh-1");
    }

    #[tokio::test]
    async fn close_is_conditional_and_records_closer() {
        let db = test_db().await;
        seed_org(&db).await;
        let shifts = db.shifts();

        shifts.open(&new_shift("sh-1", CASHIER)).await.unwrap();

        let closed = shifts
            .close("sh-1", Utc::now(), 25_000, 90_000, 12, ADMIN)
            .await
            .unwrap();
        assert!(closed);

        // double close is a no-op
        let again = shifts
            .close("sh-1", Utc::now(), 25_000, 90_000, 12, ADMIN)
            .await
            .unwrap();
        assert!(!again);

        let shift = shifts.get_by_id("sh-1").await.unwrap().unwrap();
        assert_eq!(shift.status, ShiftStatus::Closed);
        assert_eq!(shift.closed_by.as_deref(), Some(ADMIN));
        assert_eq!(shift.total_sales_cents, 90_000);

        // re-opening is possible after close
        assert!(shifts.open(&new_shift("sh-2", CASHIER)).await.unwrap());
    }

    #[tokio::test]
    async fn cash_operations_require_open_shift() {
        let db = test_db().await;
        seed_org(&db).await;
        let shifts = db.shifts();

        shifts.open(&new_shift("sh-1", CASHIER)).await.unwrap();
        assert!(shifts.insert_cash_operation(&drawer_op("op-1", "sh-1")).await.unwrap());

        shifts
            .close("sh-1", Utc::now(), 25_000, 0, 0, CASHIER)
            .await
            .unwrap();

        // the shift is closed: further drawer operations are rejected
        assert!(!shifts.insert_cash_operation(&drawer_op("op-2", "sh-1")).await.unwrap());

        let ops = shifts.operations_for_shift("sh-1").await.unwrap();
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].id, "op-1");
    }
}
