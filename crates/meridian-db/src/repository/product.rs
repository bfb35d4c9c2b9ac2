//! # Product Repository
//!
//! Catalog lookups for the commit and stock workflows. Product data is
//! snapshotted onto sale items at commit time, so reads here are the only
//! live reference the engine takes.

use sqlx::SqlitePool;

use crate::error::DbResult;
use meridian_core::Product;

const PRODUCT_COLUMNS: &str = "id, sku, name, price_cents, track_inventory, is_active, created_at";

/// Repository for product catalog lookups.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Gets an active product by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let query = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1 AND is_active = 1"
        );
        let product = sqlx::query_as::<_, Product>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Inserts a product (catalog provisioning and test seeding).
    pub async fn insert(&self, product: &Product) -> DbResult<()> {
        sqlx::query(
            "INSERT INTO products (id, sku, name, price_cents, track_inventory, is_active, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(&product.id)
        .bind(&product.sku)
        .bind(&product.name)
        .bind(product.price_cents)
        .bind(product.track_inventory)
        .bind(product.is_active)
        .bind(product.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
