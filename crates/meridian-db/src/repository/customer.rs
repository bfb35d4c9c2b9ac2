//! # Customer Repository
//!
//! Customer lookups plus the loyalty side-ledger accrual.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use meridian_core::Customer;

/// Repository for customer and loyalty operations.
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    /// Creates a new CustomerRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    /// Gets a customer by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Customer>> {
        let customer = sqlx::query_as::<_, Customer>(
            "SELECT id, name, phone, loyalty_points, total_spent_cents, visit_count, created_at
             FROM customers WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(customer)
    }

    /// Accrues loyalty for one committed sale.
    ///
    /// A single atomic increment: two terminals accruing for the same
    /// customer concurrently can never lose an update.
    ///
    /// ## Returns
    /// `true` if the customer existed and was updated.
    pub async fn accrue_loyalty(
        &self,
        customer_id: &str,
        points: i64,
        spent_cents: i64,
    ) -> DbResult<bool> {
        debug!(customer_id = %customer_id, points, spent_cents, "Accruing loyalty");

        let result = sqlx::query(
            "UPDATE customers SET
                loyalty_points = loyalty_points + ?2,
                total_spent_cents = total_spent_cents + ?3,
                visit_count = visit_count + 1
             WHERE id = ?1",
        )
        .bind(customer_id)
        .bind(points)
        .bind(spent_cents)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Inserts a customer (provisioning and test seeding).
    pub async fn insert(&self, customer: &Customer) -> DbResult<()> {
        sqlx::query(
            "INSERT INTO customers (id, name, phone, loyalty_points, total_spent_cents, visit_count, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(&customer.id)
        .bind(&customer.name)
        .bind(&customer.phone)
        .bind(customer.loyalty_points)
        .bind(customer.total_spent_cents)
        .bind(customer.visit_count)
        .bind(customer.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::repository::testing::{seed_org, test_db, CUSTOMER};

    #[tokio::test]
    async fn loyalty_accrual_is_an_atomic_increment() {
        let db = test_db().await;
        seed_org(&db).await;
        let customers = db.customers();

        assert!(customers.accrue_loyalty(CUSTOMER, 2, 2_835).await.unwrap());
        assert!(customers.accrue_loyalty(CUSTOMER, 1, 1_418).await.unwrap());

        let customer = customers.get_by_id(CUSTOMER).await.unwrap().unwrap();
        assert_eq!(customer.loyalty_points, 3);
        assert_eq!(customer.total_spent_cents, 4_253);
        assert_eq!(customer.visit_count, 2);
    }

    #[tokio::test]
    async fn accrual_against_unknown_customer_reports_false() {
        let db = test_db().await;
        seed_org(&db).await;

        let accrued = db
            .customers()
            .accrue_loyalty("cust-ghost", 1, 100)
            .await
            .unwrap();
        assert!(!accrued);
    }
}
