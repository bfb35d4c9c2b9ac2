//! # Return Repository
//!
//! Persists returns and their items. The `original_sale_id` unique
//! constraint is the storage-layer half of the "one return per sale" rule;
//! the conditional status flip on the sale (see `SaleRepository`) is the
//! other half.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use meridian_core::{ReturnItem, ReturnRecord};

/// Repository for return database operations.
#[derive(Debug, Clone)]
pub struct ReturnRepository {
    pool: SqlitePool,
}

impl ReturnRepository {
    /// Creates a new ReturnRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ReturnRepository { pool }
    }

    /// Inserts a return and its items in one transaction.
    ///
    /// ## Errors
    /// `DbError::UniqueViolation` when a return already exists for the
    /// original sale.
    pub async fn insert_return(
        &self,
        record: &ReturnRecord,
        items: &[ReturnItem],
    ) -> DbResult<()> {
        debug!(
            return_id = %record.id,
            original_sale_id = %record.original_sale_id,
            "Persisting return"
        );

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO returns (
                id, original_sale_id, branch_id, employee_id, reason,
                return_type, total_cents, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )
        .bind(&record.id)
        .bind(&record.original_sale_id)
        .bind(&record.branch_id)
        .bind(&record.employee_id)
        .bind(&record.reason)
        .bind(record.return_type)
        .bind(record.total_cents)
        .bind(record.created_at)
        .execute(&mut *tx)
        .await?;

        for item in items {
            sqlx::query(
                "INSERT INTO return_items (
                    id, return_id, product_id, name_snapshot, quantity,
                    unit_price_cents, total_cents, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )
            .bind(&item.id)
            .bind(&item.return_id)
            .bind(&item.product_id)
            .bind(&item.name_snapshot)
            .bind(item.quantity)
            .bind(item.unit_price_cents)
            .bind(item.total_cents)
            .bind(item.created_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(())
    }

    /// Gets the return recorded against an original sale, if any.
    pub async fn get_for_sale(&self, original_sale_id: &str) -> DbResult<Option<ReturnRecord>> {
        let record = sqlx::query_as::<_, ReturnRecord>(
            "SELECT id, original_sale_id, branch_id, employee_id, reason,
                    return_type, total_cents, created_at
             FROM returns
             WHERE original_sale_id = ?1",
        )
        .bind(original_sale_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }
}
