//! # Branch Repository

use sqlx::SqlitePool;

use crate::error::DbResult;
use meridian_core::Branch;

/// Repository for branch lookups.
#[derive(Debug, Clone)]
pub struct BranchRepository {
    pool: SqlitePool,
}

impl BranchRepository {
    /// Creates a new BranchRepository.
    pub fn new(pool: SqlitePool) -> Self {
        BranchRepository { pool }
    }

    /// Gets a branch by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Branch>> {
        let branch = sqlx::query_as::<_, Branch>(
            "SELECT id, name, tax_rate_bps, created_at FROM branches WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(branch)
    }

    /// Inserts a branch (provisioning and test seeding).
    pub async fn insert(&self, branch: &Branch) -> DbResult<()> {
        sqlx::query(
            "INSERT INTO branches (id, name, tax_rate_bps, created_at) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(&branch.id)
        .bind(&branch.name)
        .bind(branch.tax_rate_bps)
        .bind(branch.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
