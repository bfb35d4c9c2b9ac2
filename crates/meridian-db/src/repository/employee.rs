//! # Employee Repository

use sqlx::SqlitePool;

use crate::error::DbResult;
use meridian_core::Employee;

const EMPLOYEE_COLUMNS: &str =
    "id, branch_id, name, role, commission_rate_bps, is_active, created_at";

/// Repository for employee lookups.
#[derive(Debug, Clone)]
pub struct EmployeeRepository {
    pool: SqlitePool,
}

impl EmployeeRepository {
    /// Creates a new EmployeeRepository.
    pub fn new(pool: SqlitePool) -> Self {
        EmployeeRepository { pool }
    }

    /// Gets an active employee by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Employee>> {
        let query = format!(
            "SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE id = ?1 AND is_active = 1"
        );
        let employee = sqlx::query_as::<_, Employee>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(employee)
    }

    /// Lists the active administrators of a branch.
    ///
    /// The notification fan-out targets exactly this set.
    pub async fn admins_for_branch(&self, branch_id: &str) -> DbResult<Vec<Employee>> {
        let query = format!(
            "SELECT {EMPLOYEE_COLUMNS} FROM employees
             WHERE branch_id = ?1 AND role = 'admin' AND is_active = 1
             ORDER BY name"
        );
        let admins = sqlx::query_as::<_, Employee>(&query)
            .bind(branch_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(admins)
    }

    /// Inserts an employee (provisioning and test seeding).
    pub async fn insert(&self, employee: &Employee) -> DbResult<()> {
        sqlx::query(
            "INSERT INTO employees (id, branch_id, name, role, commission_rate_bps, is_active, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(&employee.id)
        .bind(&employee.branch_id)
        .bind(&employee.name)
        .bind(employee.role)
        .bind(employee.commission_rate_bps)
        .bind(employee.is_active)
        .bind(employee.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
