//! # Shift & Cash Drawer Ledger
//!
//! Opens and closes the accountable cash window of an employee, and records
//! discrete drawer operations scoped to the active shift.
//!
//! ## Accountability Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  • At most one open shift per employee (atomic conditional insert)      │
//! │  • Closing computes totals from the sales in the window and records     │
//! │    WHO closed: the owner, or an administrator on force-close            │
//! │  • Force-close requires the admin role; the closing actor's identity    │
//! │    is recorded distinctly from the shift owner                          │
//! │  • A closed (incl. force-closed) shift rejects drawer operations        │
//! │  • Drawer operations are immutable appends with a mandatory reason      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use crate::notify::Notifier;
use meridian_core::validation::{
    validate_expected_hours, validate_non_negative_amount, validate_positive_amount,
    validate_reason,
};
use meridian_core::{
    CashDrawerOperation, CashOpType, NotificationEvent, Role, Shift, ShiftStatus,
};
use meridian_db::Database;

// =============================================================================
// Request / Response Types
// =============================================================================

/// A request to open a shift.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenShiftRequest {
    pub employee_id: String,
    pub opening_cash_cents: i64,
    /// Defaults to the deployment's configured hours when absent.
    #[serde(default)]
    pub expected_duration_hours: Option<f64>,
}

/// A request to close a shift. `actor_id` may differ from the shift owner
/// only for administrators (force-close).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloseShiftRequest {
    pub shift_id: String,
    pub closing_cash_cents: i64,
    pub actor_id: String,
}

/// A shift with its derived duration figures.
#[derive(Debug, Clone, Serialize)]
pub struct ShiftSummary {
    pub shift: Shift,
    pub elapsed_hours: f64,
    pub is_overtime: bool,
    /// min(elapsed/expected, 1.5), for UI progress bars.
    pub progress: f64,
}

/// A cash drawer operation request from the acting employee.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CashOpRequest {
    pub shift_id: String,
    pub employee_id: String,
    pub op_type: CashOpType,
    pub amount_cents: i64,
    pub reason: String,
}

// =============================================================================
// Ledger
// =============================================================================

/// The shift & cash drawer ledger.
pub struct ShiftLedger {
    db: Database,
    notifier: Notifier,
    default_hours: f64,
}

impl ShiftLedger {
    /// Creates the ledger over its collaborators.
    pub fn new(db: Database, notifier: Notifier, default_hours: f64) -> Self {
        ShiftLedger {
            db,
            notifier,
            default_hours,
        }
    }

    /// Opens a shift for an employee.
    ///
    /// ## Errors
    /// `Conflict` when the employee already has an open shift. The check and
    /// the insert are one atomic statement; two terminals racing this see
    /// exactly one winner.
    pub async fn open(&self, req: &OpenShiftRequest) -> EngineResult<Shift> {
        validate_non_negative_amount("opening_cash", req.opening_cash_cents)?;
        if let Some(hours) = req.expected_duration_hours {
            validate_expected_hours(hours)?;
        }

        let employee = self
            .db
            .employees()
            .get_by_id(&req.employee_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Employee", &req.employee_id))?;

        let now = Utc::now();
        let shift = Shift {
            id: Uuid::new_v4().to_string(),
            employee_id: employee.id.clone(),
            branch_id: employee.branch_id.clone(),
            start_time: now,
            end_time: None,
            expected_duration_hours: req.expected_duration_hours.unwrap_or(self.default_hours),
            opening_cash_cents: req.opening_cash_cents,
            closing_cash_cents: None,
            total_sales_cents: 0,
            total_transactions: 0,
            status: ShiftStatus::Open,
            closed_by: None,
            created_at: now,
        };

        if !self.db.shifts().open(&shift).await? {
            return Err(EngineError::conflict(format!(
                "employee {} already has an open shift",
                employee.id
            )));
        }

        info!(shift_id = %shift.id, employee_id = %employee.id, "Shift opened");

        self.notifier
            .fan_out_best_effort(
                &shift.branch_id,
                NotificationEvent::ShiftStarted,
                &json!({
                    "shift_id": shift.id,
                    "employee_id": employee.id,
                    "opening_cash_cents": shift.opening_cash_cents,
                }),
            )
            .await;

        Ok(shift)
    }

    /// Closes a shift, computing the window's sales totals and duration
    /// figures. The owner closes their own shift; an administrator may close
    /// anyone's (force-close), and the closing actor is recorded either way.
    pub async fn close(&self, req: &CloseShiftRequest) -> EngineResult<ShiftSummary> {
        validate_non_negative_amount("closing_cash", req.closing_cash_cents)?;

        let shift = self
            .db
            .shifts()
            .get_by_id(&req.shift_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Shift", &req.shift_id))?;
        let actor = self
            .db
            .employees()
            .get_by_id(&req.actor_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Employee", &req.actor_id))?;

        if actor.id != shift.employee_id && actor.role != Role::Admin {
            return Err(EngineError::forbidden(
                "only an administrator may close another employee's shift",
            ));
        }

        let now = Utc::now();
        let (total_transactions, total_sales_cents) = self
            .db
            .sales()
            .employee_window_totals(&shift.employee_id, shift.start_time, now)
            .await?;

        let closed = self
            .db
            .shifts()
            .close(
                &shift.id,
                now,
                req.closing_cash_cents,
                total_sales_cents,
                total_transactions,
                &actor.id,
            )
            .await?;
        if !closed {
            return Err(EngineError::conflict(format!(
                "shift {} is not open",
                shift.id
            )));
        }

        let shift = self
            .db
            .shifts()
            .get_by_id(&req.shift_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Shift", &req.shift_id))?;
        let summary = summarize(shift, now);

        info!(
            shift_id = %summary.shift.id,
            closed_by = %actor.id,
            total_sales_cents,
            is_overtime = summary.is_overtime,
            "Shift closed"
        );

        self.notifier
            .fan_out_best_effort(
                &summary.shift.branch_id,
                NotificationEvent::ShiftEnded,
                &json!({
                    "shift_id": summary.shift.id,
                    "employee_id": summary.shift.employee_id,
                    "closed_by": actor.id,
                    "total_sales_cents": total_sales_cents,
                    "is_overtime": summary.is_overtime,
                }),
            )
            .await;

        Ok(summary)
    }

    /// Current figures for one shift.
    pub async fn summary(&self, shift_id: &str) -> EngineResult<ShiftSummary> {
        let shift = self
            .db
            .shifts()
            .get_by_id(shift_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Shift", shift_id))?;
        let as_of = shift.end_time.unwrap_or_else(Utc::now);
        Ok(summarize(shift, as_of))
    }

    /// Records a deposit/withdrawal/count against the acting employee's OPEN
    /// shift. Rejected otherwise; the open check is part of the insert.
    pub async fn record_cash_operation(
        &self,
        req: &CashOpRequest,
    ) -> EngineResult<CashDrawerOperation> {
        validate_positive_amount("amount", req.amount_cents)?;
        validate_reason(&req.reason)?;

        let shift = self
            .db
            .shifts()
            .get_by_id(&req.shift_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Shift", &req.shift_id))?;
        if shift.employee_id != req.employee_id {
            return Err(EngineError::forbidden(
                "cash drawer operations must target the acting employee's own shift",
            ));
        }

        let op = CashDrawerOperation {
            id: Uuid::new_v4().to_string(),
            shift_id: req.shift_id.clone(),
            employee_id: req.employee_id.clone(),
            op_type: req.op_type,
            amount_cents: req.amount_cents,
            reason: req.reason.trim().to_string(),
            created_at: Utc::now(),
        };

        if !self.db.shifts().insert_cash_operation(&op).await? {
            return Err(EngineError::conflict(format!(
                "no open shift {} for employee {}",
                req.shift_id, req.employee_id
            )));
        }

        info!(
            shift_id = %op.shift_id,
            op_type = ?op.op_type,
            amount_cents = op.amount_cents,
            "Cash drawer operation recorded"
        );

        self.notifier
            .fan_out_best_effort(
                &shift.branch_id,
                NotificationEvent::CashOperation,
                &json!({
                    "shift_id": op.shift_id,
                    "employee_id": op.employee_id,
                    "op_type": op.op_type,
                    "amount_cents": op.amount_cents,
                }),
            )
            .await;

        Ok(op)
    }
}

fn summarize(shift: Shift, as_of: chrono::DateTime<Utc>) -> ShiftSummary {
    ShiftSummary {
        elapsed_hours: shift.elapsed_hours(as_of),
        is_overtime: shift.is_overtime(as_of),
        progress: shift.progress(as_of),
        shift,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payment::Tender;
    use crate::sale::{CheckoutLine, CheckoutRequest};
    use crate::testing::{test_engine, ADMIN, BRANCH, CASHIER, CASHIER_TWO, PRODUCT_TRACKED};
    use meridian_core::{Discount, PaymentMethod};

    fn open_request(employee_id: &str) -> OpenShiftRequest {
        OpenShiftRequest {
            employee_id: employee_id.to_string(),
            opening_cash_cents: 20_000,
            expected_duration_hours: None,
        }
    }

    fn deposit(shift_id: &str, employee_id: &str) -> CashOpRequest {
        CashOpRequest {
            shift_id: shift_id.to_string(),
            employee_id: employee_id.to_string(),
            op_type: CashOpType::Deposit,
            amount_cents: 5_000,
            reason: "till top-up".to_string(),
        }
    }

    #[tokio::test]
    async fn one_open_shift_per_employee() {
        let (engine, _db) = test_engine().await;

        engine.shifts.open(&open_request(CASHIER)).await.unwrap();
        let err = engine.shifts.open(&open_request(CASHIER)).await.unwrap_err();
        assert!(matches!(err, EngineError::Conflict { .. }));

        // another employee opens independently
        engine.shifts.open(&open_request(CASHIER_TWO)).await.unwrap();
    }

    #[tokio::test]
    async fn close_computes_window_totals() {
        let (engine, _db) = test_engine().await;

        let shift = engine.shifts.open(&open_request(CASHIER)).await.unwrap();

        // one sale during the window: 2 × 450 + 5% tax = 945
        engine
            .sales
            .commit(&CheckoutRequest {
                branch_id: BRANCH.to_string(),
                employee_id: CASHIER.to_string(),
                customer_id: None,
                lines: vec![CheckoutLine {
                    product_id: PRODUCT_TRACKED.to_string(),
                    quantity: 2,
                    discount_cents: 0,
                }],
                discount: Discount::None,
                tender: Tender {
                    method: PaymentMethod::Cash,
                    amount_received_cents: Some(1_000),
                    instrument_token: None,
                },
                idempotency_key: None,
            })
            .await
            .unwrap();

        let summary = engine
            .shifts
            .close(&CloseShiftRequest {
                shift_id: shift.id.clone(),
                closing_cash_cents: 20_945,
                actor_id: CASHIER.to_string(),
            })
            .await
            .unwrap();

        assert_eq!(summary.shift.status, ShiftStatus::Closed);
        assert_eq!(summary.shift.total_transactions, 1);
        assert_eq!(summary.shift.total_sales_cents, 945);
        assert_eq!(summary.shift.closed_by.as_deref(), Some(CASHIER));
        assert!(!summary.is_overtime);
        assert!(summary.shift.end_time.is_some());
    }

    #[tokio::test]
    async fn force_close_requires_admin_and_records_actor() {
        let (engine, _db) = test_engine().await;

        let shift = engine.shifts.open(&open_request(CASHIER)).await.unwrap();

        // a fellow cashier may not close someone else's shift
        let err = engine
            .shifts
            .close(&CloseShiftRequest {
                shift_id: shift.id.clone(),
                closing_cash_cents: 20_000,
                actor_id: CASHIER_TWO.to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Forbidden { .. }));

        // an admin may, and is recorded distinctly from the owner
        let summary = engine
            .shifts
            .close(&CloseShiftRequest {
                shift_id: shift.id.clone(),
                closing_cash_cents: 20_000,
                actor_id: ADMIN.to_string(),
            })
            .await
            .unwrap();
        assert_eq!(summary.shift.employee_id, CASHIER);
        assert_eq!(summary.shift.closed_by.as_deref(), Some(ADMIN));

        // the force-closed shift blocks further drawer operations
        let err = engine
            .shifts
            .record_cash_operation(&deposit(&shift.id, CASHIER))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Conflict { .. }));
    }

    #[tokio::test]
    async fn double_close_conflicts() {
        let (engine, _db) = test_engine().await;
        let shift = engine.shifts.open(&open_request(CASHIER)).await.unwrap();

        let close = CloseShiftRequest {
            shift_id: shift.id.clone(),
            closing_cash_cents: 20_000,
            actor_id: CASHIER.to_string(),
        };
        engine.shifts.close(&close).await.unwrap();
        let err = engine.shifts.close(&close).await.unwrap_err();
        assert!(matches!(err, EngineError::Conflict { .. }));
    }

    #[tokio::test]
    async fn cash_operations_need_an_open_shift_and_a_reason() {
        let (engine, db) = test_engine().await;
        let shift = engine.shifts.open(&open_request(CASHIER)).await.unwrap();

        let op = engine
            .shifts
            .record_cash_operation(&deposit(&shift.id, CASHIER))
            .await
            .unwrap();
        assert_eq!(op.amount_cents, 5_000);

        // missing reason is a validation error, not a silent append
        let mut bad = deposit(&shift.id, CASHIER);
        bad.reason = " ".to_string();
        let err = engine.shifts.record_cash_operation(&bad).await.unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));

        // someone else's shift is off limits
        let err = engine
            .shifts
            .record_cash_operation(&deposit(&shift.id, CASHIER_TWO))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Forbidden { .. }));

        let ops = db.shifts().operations_for_shift(&shift.id).await.unwrap();
        assert_eq!(ops.len(), 1);
    }

    #[tokio::test]
    async fn shift_events_reach_admins() {
        let (engine, db) = test_engine().await;

        let shift = engine.shifts.open(&open_request(CASHIER)).await.unwrap();
        engine
            .shifts
            .close(&CloseShiftRequest {
                shift_id: shift.id,
                closing_cash_cents: 20_000,
                actor_id: CASHIER.to_string(),
            })
            .await
            .unwrap();

        let unread = db.activity().unread_for(ADMIN).await.unwrap();
        let events: Vec<_> = unread.iter().map(|n| n.event).collect();
        assert!(events.contains(&NotificationEvent::ShiftStarted));
        assert!(events.contains(&NotificationEvent::ShiftEnded));
    }
}
