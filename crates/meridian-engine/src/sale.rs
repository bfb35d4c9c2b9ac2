//! # Sale Commit Workflow
//!
//! Turns a cart into a durable, auditable financial and inventory event.
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   Authorizing ──(decline/unknown)──► Declined   (terminal, ZERO writes) │
//! │       │                                                                 │
//! │       ▼ approved                                                        │
//! │   Persisting ── sale header + items + pending step rows +               │
//! │       │         idempotency key, ONE transaction (the durable anchor)   │
//! │       ▼                                                                 │
//! │   Adjusting Inventory ── one `sale` movement per tracked line           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │   Accruing Side Effects ── loyalty, commission, activity + fan-out      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │   Committed                                                             │
//! │                                                                         │
//! │  Authorization happens-before any persistent write: a failed persist    │
//! │  can never leave an authorized-but-unrecorded charge... and a           │
//! │  persisted sale is never rolled back (commit-forward; the return        │
//! │  workflow is the only compensation).                                    │
//! │                                                                         │
//! │  A step failure after the anchor does NOT roll back prior steps: it is  │
//! │  logged with {sale_id, step}, marked failed in the ledger, and          │
//! │  retried independently - never by re-running the whole workflow,        │
//! │  which would double-accrue loyalty or double-decrement stock.           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use crate::notify::Notifier;
use crate::payment::{PaymentProcessor, Tender};
use meridian_core::{
    price_cart, ActivityEntry, CartLine, CommitStep, CommitStepRecord, Discount, DiscountPolicy,
    EmployeeCommission, CommissionStatus, Money, MovementType, NotificationEvent, PaymentStatus,
    Sale, SaleItem, SaleStatus, StepStatus, LOYALTY_CENTS_PER_POINT,
};
use meridian_db::{Database, MovementRequest};

// =============================================================================
// Request / Response Types
// =============================================================================

/// One cart line as submitted by a terminal. Prices are NOT taken from the
/// client; the workflow resolves them from the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutLine {
    pub product_id: String,
    pub quantity: i64,
    #[serde(default)]
    pub discount_cents: i64,
}

/// A checkout submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub branch_id: String,
    pub employee_id: String,
    #[serde(default)]
    pub customer_id: Option<String>,
    pub lines: Vec<CheckoutLine>,
    #[serde(default)]
    pub discount: Discount,
    pub tender: Tender,
    /// Caller-supplied idempotency key: a retried request with the same key
    /// returns the original sale instead of charging twice.
    #[serde(default)]
    pub idempotency_key: Option<String>,
}

/// A committed sale with its lines.
#[derive(Debug, Clone, Serialize)]
pub struct CommittedSale {
    pub sale: Sale,
    pub items: Vec<SaleItem>,
    /// True when an idempotency key replayed an earlier commit.
    pub replayed: bool,
}

// =============================================================================
// Workflow
// =============================================================================

/// The sale commit workflow.
pub struct SaleWorkflow {
    db: Database,
    payments: PaymentProcessor,
    notifier: Notifier,
    policy: DiscountPolicy,
}

impl SaleWorkflow {
    /// Creates the workflow over its collaborators.
    pub fn new(
        db: Database,
        payments: PaymentProcessor,
        notifier: Notifier,
        policy: DiscountPolicy,
    ) -> Self {
        SaleWorkflow {
            db,
            payments,
            notifier,
            policy,
        }
    }

    /// Commits a checkout: authorize, persist the anchor, run side effects.
    ///
    /// The caller always receives either a committed sale or a typed
    /// decline/validation error. Never an ambiguous outcome for the payment
    /// leg.
    pub async fn commit(&self, req: &CheckoutRequest) -> EngineResult<CommittedSale> {
        // Idempotent replay check before anything else.
        if let Some(key) = req.idempotency_key.as_deref() {
            if let Some(sale_id) = self.db.workflow().sale_for_idempotency_key(key).await? {
                info!(sale_id = %sale_id, key = %key, "Idempotency key replay");
                return self.load_committed(&sale_id, true).await;
            }
        }

        // Resolve the actors and the catalog; never trust client prices.
        let branch = self
            .db
            .branches()
            .get_by_id(&req.branch_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Branch", &req.branch_id))?;
        let employee = self
            .db
            .employees()
            .get_by_id(&req.employee_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Employee", &req.employee_id))?;
        if let Some(customer_id) = req.customer_id.as_deref() {
            self.db
                .customers()
                .get_by_id(customer_id)
                .await?
                .ok_or_else(|| EngineError::not_found("Customer", customer_id))?;
        }

        let mut cart_lines = Vec::with_capacity(req.lines.len());
        let mut snapshots = Vec::with_capacity(req.lines.len());
        for line in &req.lines {
            let product = self
                .db
                .products()
                .get_by_id(&line.product_id)
                .await?
                .ok_or_else(|| EngineError::not_found("Product", &line.product_id))?;
            cart_lines.push(CartLine {
                product_id: product.id.clone(),
                quantity: line.quantity,
                unit_price_cents: product.price_cents,
                discount_cents: line.discount_cents,
            });
            snapshots.push(product);
        }

        let priced = price_cart(
            &cart_lines,
            branch.tax_rate(),
            req.discount,
            employee.role,
            &self.policy,
        )?;

        // Authorize. This happens-before ANY persistent write.
        let tender_outcome = self
            .payments
            .collect(Money::from_cents(priced.total_cents), &req.tender, &branch.id)
            .await?;

        // Persist the durable anchor.
        let now = Utc::now();
        let sale_id = Uuid::new_v4().to_string();
        let sale = Sale {
            id: sale_id.clone(),
            receipt_number: generate_receipt_number(),
            branch_id: branch.id.clone(),
            employee_id: employee.id.clone(),
            customer_id: req.customer_id.clone(),
            subtotal_cents: priced.subtotal_cents,
            tax_cents: priced.tax_cents,
            discount_cents: priced.discount_cents,
            total_cents: priced.total_cents,
            payment_method: req.tender.method,
            payment_status: PaymentStatus::Paid,
            status: SaleStatus::Completed,
            change_cents: tender_outcome.change_cents,
            authorization_id: tender_outcome.authorization_id.clone(),
            created_at: now,
        };
        let items: Vec<SaleItem> = cart_lines
            .iter()
            .zip(&snapshots)
            .map(|(line, product)| SaleItem {
                id: Uuid::new_v4().to_string(),
                sale_id: sale_id.clone(),
                product_id: line.product_id.clone(),
                name_snapshot: product.name.clone(),
                quantity: line.quantity,
                unit_price_cents: line.unit_price_cents,
                discount_cents: line.discount_cents,
                total_cents: line.total_cents(),
                created_at: now,
            })
            .collect();

        let inserted = self
            .db
            .sales()
            .insert_committed(&sale, &items, &CommitStep::ALL, req.idempotency_key.as_deref())
            .await;

        if let Err(e) = inserted {
            // Two terminals racing the same idempotency key: the loser's
            // transaction rolled back whole; hand back the winner's sale.
            if e.is_unique_violation() {
                if let Some(key) = req.idempotency_key.as_deref() {
                    if let Some(winner) = self.db.workflow().sale_for_idempotency_key(key).await? {
                        warn!(sale_id = %winner, key = %key, "Lost idempotency race, replaying winner");
                        return self.load_committed(&winner, true).await;
                    }
                }
            }
            return Err(e.into());
        }

        info!(
            sale_id = %sale.id,
            receipt_number = %sale.receipt_number,
            total_cents = sale.total_cents,
            method = ?sale.payment_method,
            "Sale committed"
        );

        // Side effects. Failures are logged and ledgered, never unwound.
        for step in CommitStep::ALL {
            self.run_and_record_step(&sale, &items, step).await;
        }

        Ok(CommittedSale {
            sale,
            items,
            replayed: false,
        })
    }

    /// Re-runs only the incomplete (pending/failed) steps of a committed
    /// sale. This is the reconciliation path: never the whole workflow.
    pub async fn retry_side_effects(&self, sale_id: &str) -> EngineResult<Vec<CommitStepRecord>> {
        let sale = self
            .db
            .sales()
            .get_by_id(sale_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Sale", sale_id))?;
        let items = self.db.sales().get_items(sale_id).await?;

        let incomplete = self.db.workflow().incomplete_steps(sale_id).await?;
        for record in &incomplete {
            self.run_and_record_step(&sale, &items, record.step).await;
        }

        let after = self.db.workflow().steps_for_sale(sale_id).await?;
        if let Some(still_failed) = after.iter().find(|r| r.status == StepStatus::Failed) {
            return Err(EngineError::PartialCommit {
                sale_id: sale_id.to_string(),
                step: still_failed.step.as_str().to_string(),
                message: still_failed
                    .error
                    .clone()
                    .unwrap_or_else(|| "step failed".to_string()),
            });
        }

        Ok(after)
    }

    async fn load_committed(&self, sale_id: &str, replayed: bool) -> EngineResult<CommittedSale> {
        let sale = self
            .db
            .sales()
            .get_by_id(sale_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Sale", sale_id))?;
        let items = self.db.sales().get_items(sale_id).await?;
        Ok(CommittedSale {
            sale,
            items,
            replayed,
        })
    }

    /// Runs one step and records its outcome in the ledger. Never
    /// propagates step failure to the caller: the sale is already durable.
    async fn run_and_record_step(&self, sale: &Sale, items: &[SaleItem], step: CommitStep) {
        let outcome = self.run_step(sale, items, step).await;
        let (status, err_text) = match &outcome {
            Ok(status) => (*status, None),
            Err(e) => (StepStatus::Failed, Some(e.to_string())),
        };

        if let Some(ref message) = err_text {
            // The PartialCommitFailure class: enough context to reconcile.
            error!(
                sale_id = %sale.id,
                step = step.as_str(),
                error = %message,
                "Sale commit step failed; sale remains committed, step is retryable"
            );
        }

        if let Err(e) = self
            .db
            .workflow()
            .mark_step(&sale.id, step, status, err_text.as_deref())
            .await
        {
            error!(
                sale_id = %sale.id,
                step = step.as_str(),
                error = %e,
                "Failed to record step status in the commit ledger"
            );
        }
    }

    async fn run_step(
        &self,
        sale: &Sale,
        items: &[SaleItem],
        step: CommitStep,
    ) -> EngineResult<StepStatus> {
        match step {
            CommitStep::Inventory => self.step_inventory(sale, items).await,
            CommitStep::Loyalty => self.step_loyalty(sale).await,
            CommitStep::Commission => self.step_commission(sale).await,
            CommitStep::Notify => self.step_notify(sale).await,
        }
    }

    /// One `sale` movement of -quantity per inventory-tracked line.
    ///
    /// Idempotent per item: lines that already have a movement under this
    /// sale's reference are skipped, so a retry after a mid-step failure
    /// never double-decrements.
    async fn step_inventory(&self, sale: &Sale, items: &[SaleItem]) -> EngineResult<StepStatus> {
        let existing = self
            .db
            .inventory()
            .movements_for_reference("sale", &sale.id)
            .await?;

        let mut touched = false;
        for item in items {
            if existing.iter().any(|m| m.product_id == item.product_id) {
                touched = true;
                continue;
            }

            let product = match self.db.products().get_by_id(&item.product_id).await? {
                Some(product) => product,
                None => {
                    warn!(product_id = %item.product_id, "Product vanished before inventory step");
                    continue;
                }
            };
            if !product.track_inventory {
                continue;
            }

            // Oversell is allowed here: the movement ledger stays truthful
            // and low stock is the observable signal downstream.
            self.db
                .inventory()
                .apply_movement(&MovementRequest {
                    product_id: item.product_id.clone(),
                    branch_id: sale.branch_id.clone(),
                    movement_type: MovementType::Sale,
                    quantity: -item.quantity,
                    reference_type: "sale".to_string(),
                    reference_id: sale.id.clone(),
                    employee_id: sale.employee_id.clone(),
                })
                .await?;
            touched = true;
        }

        Ok(if touched { StepStatus::Done } else { StepStatus::Skipped })
    }

    /// Loyalty: floor(total / $10) points, +1 visit, total spent.
    async fn step_loyalty(&self, sale: &Sale) -> EngineResult<StepStatus> {
        let customer_id = match sale.customer_id.as_deref() {
            Some(id) => id,
            None => return Ok(StepStatus::Skipped),
        };

        let points = sale.total_cents / LOYALTY_CENTS_PER_POINT;
        let accrued = self
            .db
            .customers()
            .accrue_loyalty(customer_id, points, sale.total_cents)
            .await?;
        if !accrued {
            return Err(EngineError::not_found("Customer", customer_id));
        }

        Ok(StepStatus::Done)
    }

    /// Commission: total × rate, pending, at most once per sale.
    async fn step_commission(&self, sale: &Sale) -> EngineResult<StepStatus> {
        let employee = self
            .db
            .employees()
            .get_by_id(&sale.employee_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Employee", &sale.employee_id))?;

        let rate = match employee.commission_rate() {
            Some(rate) => rate,
            None => return Ok(StepStatus::Skipped),
        };

        let amount = sale.total().percent_of(rate);
        self.db
            .commissions()
            .insert_once(&EmployeeCommission {
                id: Uuid::new_v4().to_string(),
                employee_id: employee.id.clone(),
                sale_id: sale.id.clone(),
                rate_bps: rate.bps(),
                amount_cents: amount.cents(),
                status: CommissionStatus::Pending,
                created_at: Utc::now(),
            })
            .await?;

        Ok(StepStatus::Done)
    }

    /// Activity log entry plus `sale_completed` fan-out to branch admins.
    /// Deterministic ids keyed by the sale make a retry a no-op.
    async fn step_notify(&self, sale: &Sale) -> EngineResult<StepStatus> {
        self.db
            .activity()
            .log(&ActivityEntry {
                id: format!("sale:{}:activity", sale.id),
                branch_id: sale.branch_id.clone(),
                employee_id: sale.employee_id.clone(),
                action: "sale_completed".to_string(),
                entity_type: "sale".to_string(),
                entity_id: sale.id.clone(),
                details: Some(format!(
                    "receipt {} total {}",
                    sale.receipt_number,
                    sale.total()
                )),
                created_at: Utc::now(),
            })
            .await?;

        self.notifier
            .fan_out(
                &sale.branch_id,
                NotificationEvent::SaleCompleted,
                &json!({
                    "sale_id": sale.id,
                    "receipt_number": sale.receipt_number,
                    "total_cents": sale.total_cents,
                    "employee_id": sale.employee_id,
                }),
                Some(&format!("sale:{}", sale.id)),
            )
            .await?;

        Ok(StepStatus::Done)
    }
}

/// Generates a receipt number: time-based with a random suffix.
///
/// Format `YYMMDD-HHMMSS-NNNN`. Monotonic enough to avoid collision across
/// a branch's terminals; the UNIQUE index on receipt_number backstops it.
fn generate_receipt_number() -> String {
    let now = Utc::now();
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos();
    format!("{}-{:04}", now.format("%y%m%d-%H%M%S"), nanos % 10_000)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payment::AuthorizationOutcome;
    use crate::testing::{
        engine_with_gateway, seed_branch_stock, test_engine, ADMIN, BRANCH, CASHIER, CUSTOMER,
        PRODUCT_SERVICE, PRODUCT_TRACKED,
    };
    use meridian_core::PaymentMethod;

    fn cash_checkout(lines: Vec<CheckoutLine>, received_cents: i64) -> CheckoutRequest {
        CheckoutRequest {
            branch_id: BRANCH.to_string(),
            employee_id: CASHIER.to_string(),
            customer_id: None,
            lines,
            discount: Discount::None,
            tender: Tender {
                method: PaymentMethod::Cash,
                amount_received_cents: Some(received_cents),
                instrument_token: None,
            },
            idempotency_key: None,
        }
    }

    fn one_line(quantity: i64) -> Vec<CheckoutLine> {
        vec![CheckoutLine {
            product_id: PRODUCT_TRACKED.to_string(),
            quantity,
            discount_cents: 0,
        }]
    }

    #[tokio::test]
    async fn cash_sale_commits_with_expected_totals() {
        // 2 × $4.50 at the branch's 5% tax: 9.00 / 0.45 / 9.45
        let (engine, db) = test_engine().await;

        let committed = engine
            .sales
            .commit(&cash_checkout(one_line(2), 1_000))
            .await
            .unwrap();

        assert_eq!(committed.sale.subtotal_cents, 900);
        assert_eq!(committed.sale.tax_cents, 45);
        assert_eq!(committed.sale.total_cents, 945);
        assert_eq!(committed.sale.change_cents, 55);
        assert_eq!(committed.sale.status, SaleStatus::Completed);
        assert_eq!(committed.items.len(), 1);
        assert_eq!(committed.items[0].name_snapshot, "Cola 330ml");

        // balance property: Σ item totals + tax − discount == total
        let line_sum: i64 = committed.items.iter().map(|i| i.total_cents).sum();
        assert_eq!(
            line_sum + committed.sale.tax_cents - committed.sale.discount_cents,
            committed.sale.total_cents
        );

        // every step resolved
        let steps = db.workflow().incomplete_steps(&committed.sale.id).await.unwrap();
        assert!(steps.is_empty());
    }

    #[tokio::test]
    async fn selling_full_stock_lands_on_zero() {
        let (engine, db) = test_engine().await;
        seed_branch_stock(&db, 3).await;

        let committed = engine
            .sales
            .commit(&cash_checkout(one_line(3), 2_000))
            .await
            .unwrap();

        let record = db
            .inventory()
            .get_record(PRODUCT_TRACKED, BRANCH)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.quantity, 0);

        let movements = db
            .inventory()
            .movements_for_reference("sale", &committed.sale.id)
            .await
            .unwrap();
        assert_eq!(movements.len(), 1);
        assert_eq!(movements[0].quantity, -3);

        // the core invariant
        let sum = db.inventory().sum_movements(PRODUCT_TRACKED, BRANCH).await.unwrap();
        assert_eq!(record.quantity, sum);
    }

    #[tokio::test]
    async fn untracked_products_skip_the_ledger() {
        let (engine, db) = test_engine().await;

        let committed = engine
            .sales
            .commit(&cash_checkout(
                vec![CheckoutLine {
                    product_id: PRODUCT_SERVICE.to_string(),
                    quantity: 1,
                    discount_cents: 0,
                }],
                500,
            ))
            .await
            .unwrap();

        let movements = db
            .inventory()
            .movements_for_reference("sale", &committed.sale.id)
            .await
            .unwrap();
        assert!(movements.is_empty());

        let steps = db.workflow().steps_for_sale(&committed.sale.id).await.unwrap();
        let inventory = steps
            .iter()
            .find(|r| r.step == CommitStep::Inventory)
            .unwrap();
        assert_eq!(inventory.status, StepStatus::Skipped);
    }

    #[tokio::test]
    async fn loyalty_and_commission_accrue_once() {
        let (engine, db) = test_engine().await;

        let mut req = cash_checkout(one_line(6), 5_000); // 6 × 450 = 2700 + 135 tax = 2835
        req.customer_id = Some(CUSTOMER.to_string());
        let committed = engine.sales.commit(&req).await.unwrap();

        assert_eq!(committed.sale.total_cents, 2_835);

        let customer = db.customers().get_by_id(CUSTOMER).await.unwrap().unwrap();
        assert_eq!(customer.loyalty_points, 2); // floor(28.35 / 10)
        assert_eq!(customer.total_spent_cents, 2_835);
        assert_eq!(customer.visit_count, 1);

        let commission = db
            .commissions()
            .get_for_sale(&committed.sale.id)
            .await
            .unwrap()
            .unwrap();
        // 2.5% of 2835 = 70.875 → 71
        assert_eq!(commission.amount_cents, 71);
        assert_eq!(commission.employee_id, CASHIER);
    }

    #[tokio::test]
    async fn notify_step_reaches_branch_admins() {
        let (engine, db) = test_engine().await;

        engine
            .sales
            .commit(&cash_checkout(one_line(1), 500))
            .await
            .unwrap();

        let unread = db.activity().unread_for(ADMIN).await.unwrap();
        assert_eq!(unread.len(), 1);
        assert_eq!(unread[0].event, NotificationEvent::SaleCompleted);
    }

    #[tokio::test]
    async fn declined_card_creates_nothing() {
        let (engine, db) = engine_with_gateway(AuthorizationOutcome::Declined {
            reason: "card expired".to_string(),
        })
        .await;

        let mut req = cash_checkout(one_line(2), 0);
        req.tender = Tender {
            method: PaymentMethod::Card,
            amount_received_cents: None,
            instrument_token: Some("tok-1".to_string()),
        };

        let err = engine.sales.commit(&req).await.unwrap_err();
        match err {
            EngineError::Declined { reason } => assert_eq!(reason, "card expired"),
            other => panic!("expected Declined, got {other:?}"),
        }

        // zero side effects: no sale, no movements
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(count, 0);
        let sum = db.inventory().sum_movements(PRODUCT_TRACKED, BRANCH).await.unwrap();
        assert_eq!(sum, 0);
    }

    #[tokio::test]
    async fn approved_card_records_authorization() {
        let (engine, _db) = engine_with_gateway(AuthorizationOutcome::Approved {
            authorization_id: "auth-42".to_string(),
        })
        .await;

        let mut req = cash_checkout(one_line(1), 0);
        req.tender = Tender {
            method: PaymentMethod::Card,
            amount_received_cents: None,
            instrument_token: Some("tok-1".to_string()),
        };

        let committed = engine.sales.commit(&req).await.unwrap();
        assert_eq!(committed.sale.authorization_id.as_deref(), Some("auth-42"));
        assert_eq!(committed.sale.change_cents, 0);
    }

    #[tokio::test]
    async fn idempotency_key_replays_instead_of_recommitting() {
        let (engine, db) = test_engine().await;
        seed_branch_stock(&db, 10).await;

        let mut req = cash_checkout(one_line(2), 1_000);
        req.idempotency_key = Some("terminal-7:txn-123".to_string());

        let first = engine.sales.commit(&req).await.unwrap();
        let second = engine.sales.commit(&req).await.unwrap();

        assert_eq!(first.sale.id, second.sale.id);
        assert!(!first.replayed);
        assert!(second.replayed);

        // exactly one sale and one decrement
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(count, 1);
        let record = db
            .inventory()
            .get_record(PRODUCT_TRACKED, BRANCH)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.quantity, 8);
    }

    #[tokio::test]
    async fn cashier_discount_is_capped() {
        let (engine, _db) = test_engine().await;

        // $45 fixed requested on a 4500-cent cart by a cashier: capped to 10%
        let mut req = cash_checkout(one_line(10), 5_000);
        req.discount = Discount::Fixed(4_500);
        let committed = engine.sales.commit(&req).await.unwrap();

        assert_eq!(committed.sale.subtotal_cents, 4_500);
        assert_eq!(committed.sale.discount_cents, 450);
    }

    #[tokio::test]
    async fn retry_reruns_only_incomplete_steps() {
        let (engine, db) = test_engine().await;
        seed_branch_stock(&db, 10).await;

        let committed = engine
            .sales
            .commit(&cash_checkout(one_line(2), 1_000))
            .await
            .unwrap();
        let sale_id = committed.sale.id.clone();

        // Simulate a commission step that had failed mid-flight.
        db.workflow()
            .mark_step(&sale_id, CommitStep::Commission, StepStatus::Failed, Some("io error"))
            .await
            .unwrap();

        let after = engine.sales.retry_side_effects(&sale_id).await.unwrap();
        assert!(after.iter().all(|r| r.status != StepStatus::Failed
            && r.status != StepStatus::Pending));

        // idempotent re-run: still exactly one commission row, one decrement
        let commission_count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM employee_commissions WHERE sale_id = ?1")
                .bind(&sale_id)
                .fetch_one(db.pool())
                .await
                .unwrap();
        assert_eq!(commission_count, 1);
        let record = db
            .inventory()
            .get_record(PRODUCT_TRACKED, BRANCH)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.quantity, 8);
    }

    #[tokio::test]
    async fn unknown_cart_line_is_not_found() {
        let (engine, _db) = test_engine().await;

        let err = engine
            .sales
            .commit(&cash_checkout(
                vec![CheckoutLine {
                    product_id: "prod-ghost".to_string(),
                    quantity: 1,
                    discount_cents: 0,
                }],
                1_000,
            ))
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::NotFound { .. }));
    }
}
