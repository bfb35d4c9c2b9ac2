//! Shared fixtures for repository tests: an in-memory database with
//! migrations applied and a minimal seeded org (branch, employees, customer,
//! products).

use chrono::Utc;

use crate::pool::{Database, DbConfig};
use meridian_core::{Branch, Customer, Employee, Product, Role};

pub const BRANCH: &str = "branch-1";
pub const CASHIER: &str = "emp-cashier";
pub const ADMIN: &str = "emp-admin";
pub const CUSTOMER: &str = "cust-1";
pub const PRODUCT_TRACKED: &str = "prod-tracked";

/// Fresh in-memory database with migrations applied.
pub async fn test_db() -> Database {
    Database::new(DbConfig::in_memory()).await.unwrap()
}

/// Seeds a branch (5% tax), a commissioned cashier, an admin, a customer,
/// and an inventory-tracked product.
pub async fn seed_org(db: &Database) {
    let now = Utc::now();

    db.branches()
        .insert(&Branch {
            id: BRANCH.into(),
            name: "Downtown".into(),
            tax_rate_bps: 500,
            created_at: now,
        })
        .await
        .unwrap();

    db.employees()
        .insert(&Employee {
            id: CASHIER.into(),
            branch_id: BRANCH.into(),
            name: "Casey".into(),
            role: Role::Cashier,
            commission_rate_bps: 250,
            is_active: true,
            created_at: now,
        })
        .await
        .unwrap();

    db.employees()
        .insert(&Employee {
            id: ADMIN.into(),
            branch_id: BRANCH.into(),
            name: "Avery".into(),
            role: Role::Admin,
            commission_rate_bps: 0,
            is_active: true,
            created_at: now,
        })
        .await
        .unwrap();

    db.customers()
        .insert(&Customer {
            id: CUSTOMER.into(),
            name: "Jordan".into(),
            phone: None,
            loyalty_points: 0,
            total_spent_cents: 0,
            visit_count: 0,
            created_at: now,
        })
        .await
        .unwrap();

    db.products()
        .insert(&Product {
            id: PRODUCT_TRACKED.into(),
            sku: "COLA-330".into(),
            name: "Cola 330ml".into(),
            price_cents: 450,
            track_inventory: true,
            is_active: true,
            created_at: now,
        })
        .await
        .unwrap();
}
