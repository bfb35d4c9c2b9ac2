//! # Commit Step Ledger Repository
//!
//! The saga ledger behind the multi-step sale commit (spelled out in
//! meridian-engine). Pending rows are seeded together with the sale anchor
//! (see `SaleRepository::insert_committed`); this repository reads and
//! advances them.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  (sale_id, step)  status                                                │
//! │  ───────────────  ──────                                                │
//! │  s-123, inventory  done      ← ran, never runs again                    │
//! │  s-123, loyalty    skipped   ← sale had no customer                     │
//! │  s-123, commission failed    ← logged with context, retryable alone     │
//! │  s-123, notify     pending   ← still owed                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;

use crate::error::DbResult;
use meridian_core::{CommitStep, CommitStepRecord, StepStatus};

/// Repository for the per-sale commit step ledger and idempotency keys.
#[derive(Debug, Clone)]
pub struct WorkflowRepository {
    pool: SqlitePool,
}

impl WorkflowRepository {
    /// Creates a new WorkflowRepository.
    pub fn new(pool: SqlitePool) -> Self {
        WorkflowRepository { pool }
    }

    /// Steps for a sale that are still owed (pending or failed), in the
    /// fixed execution order.
    pub async fn incomplete_steps(&self, sale_id: &str) -> DbResult<Vec<CommitStepRecord>> {
        let steps = sqlx::query_as::<_, CommitStepRecord>(
            "SELECT sale_id, step, status, error, updated_at
             FROM sale_commit_steps
             WHERE sale_id = ?1 AND status IN ('pending', 'failed')
             ORDER BY CASE step
                 WHEN 'inventory' THEN 0
                 WHEN 'loyalty' THEN 1
                 WHEN 'commission' THEN 2
                 WHEN 'notify' THEN 3
             END",
        )
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(steps)
    }

    /// All step records for a sale (diagnostics and tests).
    pub async fn steps_for_sale(&self, sale_id: &str) -> DbResult<Vec<CommitStepRecord>> {
        let steps = sqlx::query_as::<_, CommitStepRecord>(
            "SELECT sale_id, step, status, error, updated_at
             FROM sale_commit_steps
             WHERE sale_id = ?1",
        )
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(steps)
    }

    /// Advances one step of one sale.
    pub async fn mark_step(
        &self,
        sale_id: &str,
        step: CommitStep,
        status: StepStatus,
        error: Option<&str>,
    ) -> DbResult<()> {
        sqlx::query(
            "UPDATE sale_commit_steps SET status = ?3, error = ?4, updated_at = ?5
             WHERE sale_id = ?1 AND step = ?2",
        )
        .bind(sale_id)
        .bind(step)
        .bind(status)
        .bind(error)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Resolves an idempotency key to the sale it committed, if seen before.
    pub async fn sale_for_idempotency_key(&self, key: &str) -> DbResult<Option<String>> {
        let sale_id: Option<String> =
            sqlx::query_scalar("SELECT sale_id FROM idempotency_keys WHERE key = ?1")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;

        Ok(sale_id)
    }
}
