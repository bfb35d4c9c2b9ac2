//! Shared fixtures for workflow tests: a seeded in-memory database, a mock
//! gateway with a scripted outcome, and fully wired engine services.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use crate::payment::{AuthorizationOutcome, ChargeRequest, GatewayConfig, PaymentGateway};
use crate::{Engine, EngineConfig};
use meridian_core::{Branch, Customer, Employee, MovementType, Product, Role};
use meridian_db::{Database, DbConfig, MovementRequest};

pub(crate) const BRANCH: &str = "branch-1";
pub(crate) const CASHIER: &str = "emp-cashier";
pub(crate) const CASHIER_TWO: &str = "emp-cashier-2";
pub(crate) const ADMIN: &str = "emp-admin";
pub(crate) const CUSTOMER: &str = "cust-1";
pub(crate) const PRODUCT_TRACKED: &str = "prod-tracked";
pub(crate) const PRODUCT_SERVICE: &str = "prod-service";

/// A gateway that always returns its scripted outcome.
pub(crate) struct MockGateway {
    outcome: AuthorizationOutcome,
}

impl MockGateway {
    pub(crate) fn new(outcome: AuthorizationOutcome) -> Self {
        MockGateway { outcome }
    }

    pub(crate) fn approved_outcome() -> AuthorizationOutcome {
        AuthorizationOutcome::Approved {
            authorization_id: "auth-test".to_string(),
        }
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    async fn authorize(&self, _request: &ChargeRequest) -> AuthorizationOutcome {
        self.outcome.clone()
    }
}

/// Fresh in-memory database seeded with a branch (5% tax), employees of each
/// role, a customer, and two products (tracked + service).
pub(crate) async fn seeded_db() -> Database {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
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

    for (id, name, role, commission_bps) in [
        (CASHIER, "Casey", Role::Cashier, 250u32),
        (CASHIER_TWO, "Charlie", Role::Cashier, 0),
        (ADMIN, "Avery", Role::Admin, 0),
    ] {
        db.employees()
            .insert(&Employee {
                id: id.into(),
                branch_id: BRANCH.into(),
                name: name.into(),
                role,
                commission_rate_bps: commission_bps,
                is_active: true,
                created_at: now,
            })
            .await
            .unwrap();
    }

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

    db.products()
        .insert(&Product {
            id: PRODUCT_SERVICE.into(),
            sku: "GIFTWRAP".into(),
            name: "Gift Wrapping".into(),
            price_cents: 200,
            track_inventory: false,
            is_active: true,
            created_at: now,
        })
        .await
        .unwrap();

    db
}

/// Engine over a seeded database and an always-approving gateway.
pub(crate) async fn test_engine() -> (Engine, Database) {
    engine_with_gateway(MockGateway::approved_outcome()).await
}

/// Engine over a seeded database and a gateway scripted to `outcome`.
pub(crate) async fn engine_with_gateway(outcome: AuthorizationOutcome) -> (Engine, Database) {
    let db = seeded_db().await;
    let engine = Engine::with_gateway(
        db.clone(),
        Arc::new(MockGateway::new(outcome)),
        EngineConfig {
            gateway: GatewayConfig::test(),
            ..EngineConfig::default()
        },
    )
    .unwrap();

    (engine, db)
}

/// Puts `quantity` units of the tracked product on the branch's shelf.
pub(crate) async fn seed_branch_stock(db: &Database, quantity: i64) {
    db.inventory()
        .apply_movement(&MovementRequest {
            product_id: PRODUCT_TRACKED.into(),
            branch_id: BRANCH.into(),
            movement_type: MovementType::Receiving,
            quantity,
            reference_type: "seed".into(),
            reference_id: "seed".into(),
            employee_id: ADMIN.into(),
        })
        .await
        .unwrap();
}
