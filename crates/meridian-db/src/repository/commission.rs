//! # Commission Repository
//!
//! The employee commission side-ledger: one row per sale, at most.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use meridian_core::EmployeeCommission;

/// Repository for employee commission records.
#[derive(Debug, Clone)]
pub struct CommissionRepository {
    pool: SqlitePool,
}

impl CommissionRepository {
    /// Creates a new CommissionRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CommissionRepository { pool }
    }

    /// Inserts a commission record for a sale, once.
    ///
    /// `INSERT OR IGNORE` against the unique sale_id makes a commit-step
    /// retry a no-op instead of a double accrual.
    ///
    /// ## Returns
    /// `true` when the row was inserted by this call.
    pub async fn insert_once(&self, commission: &EmployeeCommission) -> DbResult<bool> {
        debug!(
            sale_id = %commission.sale_id,
            amount_cents = commission.amount_cents,
            "Recording commission"
        );

        let result = sqlx::query(
            "INSERT OR IGNORE INTO employee_commissions (
                id, employee_id, sale_id, rate_bps, amount_cents, status, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(&commission.id)
        .bind(&commission.employee_id)
        .bind(&commission.sale_id)
        .bind(commission.rate_bps)
        .bind(commission.amount_cents)
        .bind(commission.status)
        .bind(commission.created_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Gets the commission recorded for a sale, if any.
    pub async fn get_for_sale(&self, sale_id: &str) -> DbResult<Option<EmployeeCommission>> {
        let commission = sqlx::query_as::<_, EmployeeCommission>(
            "SELECT id, employee_id, sale_id, rate_bps, amount_cents, status, created_at
             FROM employee_commissions
             WHERE sale_id = ?1",
        )
        .bind(sale_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(commission)
    }
}
