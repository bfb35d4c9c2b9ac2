//! # Sale Repository
//!
//! Database operations for sales and sale items.
//!
//! ## Commit Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Sale Persistence                                     │
//! │                                                                         │
//! │  1. DURABLE ANCHOR (single transaction)                                 │
//! │     ├── INSERT sale header (status: completed)                          │
//! │     ├── INSERT all sale items                                           │
//! │     ├── INSERT pending commit-step rows (the saga ledger)               │
//! │     └── INSERT idempotency key mapping (when supplied)                  │
//! │                                                                         │
//! │  2. SIDE EFFECTS run outside this transaction, step by step,            │
//! │     checked off against the ledger (see meridian-engine)                │
//! │                                                                         │
//! │  3. (ON RETURN) status flips completed → refunded, exactly once,        │
//! │     via conditional UPDATE                                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use meridian_core::{CommitStep, Sale, SaleItem};

const SALE_COLUMNS: &str = "id, receipt_number, branch_id, employee_id, customer_id, \
     subtotal_cents, tax_cents, discount_cents, total_cents, payment_method, \
     payment_status, status, change_cents, authorization_id, created_at";

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Gets a sale by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Sale>> {
        let query = format!("SELECT {SALE_COLUMNS} FROM sales WHERE id = ?1");
        let sale = sqlx::query_as::<_, Sale>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(sale)
    }

    /// Gets all items for a sale.
    pub async fn get_items(&self, sale_id: &str) -> DbResult<Vec<SaleItem>> {
        let items = sqlx::query_as::<_, SaleItem>(
            "SELECT id, sale_id, product_id, name_snapshot, quantity, unit_price_cents,
                    discount_cents, total_cents, created_at
             FROM sale_items
             WHERE sale_id = ?1
             ORDER BY created_at",
        )
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Persists the durable anchor of a committed sale.
    ///
    /// Header, items, pending step-ledger rows, and the optional idempotency
    /// key all land in ONE transaction: after commit the sale exists with its
    /// side effects recorded as owed; before commit nothing exists at all.
    ///
    /// ## Errors
    /// `DbError::UniqueViolation` on a duplicate receipt number or
    /// idempotency key (the engine resolves the latter to the original sale).
    pub async fn insert_committed(
        &self,
        sale: &Sale,
        items: &[SaleItem],
        steps: &[CommitStep],
        idempotency_key: Option<&str>,
    ) -> DbResult<()> {
        debug!(id = %sale.id, receipt_number = %sale.receipt_number, "Persisting sale anchor");

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO sales (
                id, receipt_number, branch_id, employee_id, customer_id,
                subtotal_cents, tax_cents, discount_cents, total_cents,
                payment_method, payment_status, status, change_cents,
                authorization_id, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
        )
        .bind(&sale.id)
        .bind(&sale.receipt_number)
        .bind(&sale.branch_id)
        .bind(&sale.employee_id)
        .bind(&sale.customer_id)
        .bind(sale.subtotal_cents)
        .bind(sale.tax_cents)
        .bind(sale.discount_cents)
        .bind(sale.total_cents)
        .bind(sale.payment_method)
        .bind(sale.payment_status)
        .bind(sale.status)
        .bind(sale.change_cents)
        .bind(&sale.authorization_id)
        .bind(sale.created_at)
        .execute(&mut *tx)
        .await?;

        for item in items {
            sqlx::query(
                "INSERT INTO sale_items (
                    id, sale_id, product_id, name_snapshot, quantity,
                    unit_price_cents, discount_cents, total_cents, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )
            .bind(&item.id)
            .bind(&item.sale_id)
            .bind(&item.product_id)
            .bind(&item.name_snapshot)
            .bind(item.quantity)
            .bind(item.unit_price_cents)
            .bind(item.discount_cents)
            .bind(item.total_cents)
            .bind(item.created_at)
            .execute(&mut *tx)
            .await?;
        }

        for step in steps {
            sqlx::query(
                "INSERT INTO sale_commit_steps (sale_id, step, status, error, updated_at)
                 VALUES (?1, ?2, 'pending', NULL, ?3)",
            )
            .bind(&sale.id)
            .bind(*step)
            .bind(sale.created_at)
            .execute(&mut *tx)
            .await?;
        }

        if let Some(key) = idempotency_key {
            sqlx::query(
                "INSERT INTO idempotency_keys (key, sale_id, created_at) VALUES (?1, ?2, ?3)",
            )
            .bind(key)
            .bind(&sale.id)
            .bind(sale.created_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(())
    }

    /// Flips a sale to refunded, exactly once.
    ///
    /// Conditional update: only a `completed` sale can flip, so a second
    /// return attempt observes zero affected rows instead of silently
    /// re-flipping.
    ///
    /// ## Returns
    /// `true` when this call performed the flip.
    pub async fn mark_refunded(&self, sale_id: &str) -> DbResult<bool> {
        let result = sqlx::query(
            "UPDATE sales SET status = 'refunded', payment_status = 'refunded'
             WHERE id = ?1 AND status = 'completed'",
        )
        .bind(sale_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Totals for the sales attributed to an employee within a time window.
    ///
    /// Used at shift close to fill `total_transactions` / `total_sales`.
    pub async fn employee_window_totals(
        &self,
        employee_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DbResult<(i64, i64)> {
        let row: (i64, i64) = sqlx::query_as(
            "SELECT COUNT(*), COALESCE(SUM(total_cents), 0)
             FROM sales
             WHERE employee_id = ?1 AND created_at >= ?2 AND created_at <= ?3",
        )
        .bind(employee_id)
        .bind(from)
        .bind(to)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::testing::{seed_org, test_db, BRANCH, CASHIER, PRODUCT_TRACKED};
    use chrono::Duration;
    use meridian_core::{PaymentMethod, PaymentStatus, SaleStatus};

    fn sale(id: &str, total_cents: i64) -> Sale {
        Sale {
            id: id.to_string(),
            receipt_number: format!("RCP-{id}"),
            branch_id: BRANCH.to_string(),
            employee_id: CASHIER.to_string(),
            customer_id: None,
            subtotal_cents: total_cents,
            tax_cents: 0,
            discount_cents: 0,
            total_cents,
            payment_method: PaymentMethod::Cash,
            payment_status: PaymentStatus::Paid,
            status: SaleStatus::Completed,
            change_cents: 0,
            authorization_id: None,
            created_at: Utc::now(),
        }
    }

    fn item(id: &str, sale_id: &str, quantity: i64, unit_price_cents: i64) -> SaleItem {
        SaleItem {
            id: id.to_string(),
            sale_id: sale_id.to_string(),
            product_id: PRODUCT_TRACKED.to_string(),
            name_snapshot: "Cola 330ml".to_string(),
            quantity,
            unit_price_cents,
            discount_cents: 0,
            total_cents: unit_price_cents * quantity,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn anchor_persists_header_items_and_steps() {
        let db = test_db().await;
        seed_org(&db).await;
        let sales = db.sales();

        let s = sale("s-1", 900);
        let items = vec![item("i-1", "s-1", 2, 450)];
        sales
            .insert_committed(&s, &items, &CommitStep::ALL, Some("key-1"))
            .await
            .unwrap();

        let loaded = sales.get_by_id("s-1").await.unwrap().unwrap();
        assert_eq!(loaded.receipt_number, "RCP-s-1");
        assert_eq!(sales.get_items("s-1").await.unwrap().len(), 1);

        let pending = db.workflow().incomplete_steps("s-1").await.unwrap();
        assert_eq!(pending.len(), CommitStep::ALL.len());

        let mapped = db.workflow().sale_for_idempotency_key("key-1").await.unwrap();
        assert_eq!(mapped.as_deref(), Some("s-1"));
    }

    #[tokio::test]
    async fn duplicate_idempotency_key_is_a_unique_violation() {
        let db = test_db().await;
        seed_org(&db).await;
        let sales = db.sales();

        sales
            .insert_committed(&sale("s-1", 900), &[], &[], Some("key-1"))
            .await
            .unwrap();

        let err = sales
            .insert_committed(&sale("s-2", 500), &[], &[], Some("key-1"))
            .await
            .unwrap_err();
        assert!(err.is_unique_violation());

        // the losing transaction rolled back entirely: no orphan sale
        assert!(sales.get_by_id("s-2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn refund_flips_exactly_once() {
        let db = test_db().await;
        seed_org(&db).await;
        let sales = db.sales();

        sales
            .insert_committed(&sale("s-1", 900), &[], &[], None)
            .await
            .unwrap();

        assert!(sales.mark_refunded("s-1").await.unwrap());
        assert!(!sales.mark_refunded("s-1").await.unwrap());

        let loaded = sales.get_by_id("s-1").await.unwrap().unwrap();
        assert_eq!(loaded.status, SaleStatus::Refunded);
        assert_eq!(loaded.payment_status, PaymentStatus::Refunded);
    }

    #[tokio::test]
    async fn window_totals_cover_only_the_window() {
        let db = test_db().await;
        seed_org(&db).await;
        let sales = db.sales();

        let mut inside = sale("s-1", 945);
        inside.created_at = Utc::now();
        let mut outside = sale("s-2", 500);
        outside.created_at = Utc::now() - Duration::hours(30);

        sales.insert_committed(&inside, &[], &[], None).await.unwrap();
        sales.insert_committed(&outside, &[], &[], None).await.unwrap();

        let from = Utc::now() - Duration::hours(8);
        let to = Utc::now() + Duration::minutes(1);
        let (count, total) = sales
            .employee_window_totals(CASHIER, from, to)
            .await
            .unwrap();

        assert_eq!(count, 1);
        assert_eq!(total, 945);
    }
}
