//! # Domain Types
//!
//! Core domain types for the Meridian POS transaction and inventory ledger.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Domain Types                                   │
//! │                                                                         │
//! │  Financial event          Inventory truth          Cash accountability  │
//! │  ───────────────          ───────────────          ──────────────────   │
//! │  Sale / SaleItem          InventoryMovement        Shift                │
//! │  ReturnRecord/Item        InventoryRecord          CashDrawerOperation  │
//! │  EmployeeCommission       StockCount                                    │
//! │                                                                         │
//! │  Side ledgers: Customer loyalty fields, ActivityEntry, Notification     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4 string - immutable, used for database relations
//! - Business ID where one exists: (receipt_number, sku) - human-readable
//!
//! ## Immutability Rules
//! - `InventoryMovement` rows are never updated or deleted (the audit trail)
//! - `Sale` is created once and mutated only to flip status to `Refunded`
//! - `SaleItem`, `ReturnItem`, `CashDrawerOperation` are immutable appends

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::{Money, Rate};
use crate::{DEFAULT_SHIFT_HOURS, SHIFT_PROGRESS_CEILING};

// =============================================================================
// Branch & People
// =============================================================================

/// A physical point-of-sale location scoping inventory, shifts, and tax rate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Branch {
    pub id: String,
    pub name: String,
    /// Branch-scoped sales tax in basis points (825 = 8.25%).
    pub tax_rate_bps: u32,
    pub created_at: DateTime<Utc>,
}

impl Branch {
    /// Returns the branch tax rate.
    #[inline]
    pub fn tax_rate(&self) -> Rate {
        Rate::from_bps(self.tax_rate_bps)
    }
}

/// Actor role, used for discount caps and administrative overrides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Cashier,
    Manager,
    Admin,
}

/// An employee operating terminals at a branch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Employee {
    pub id: String,
    pub branch_id: String,
    pub name: String,
    pub role: Role,
    /// Commission owed to this employee per sale, in basis points of the
    /// sale total. Zero means no commission record is created.
    pub commission_rate_bps: u32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Employee {
    /// Returns the commission rate, if any.
    pub fn commission_rate(&self) -> Option<Rate> {
        if self.commission_rate_bps == 0 {
            None
        } else {
            Some(Rate::from_bps(self.commission_rate_bps))
        }
    }
}

/// A customer with derived loyalty side-ledger fields.
///
/// `loyalty_points`, `total_spent_cents` and `visit_count` are updated exactly
/// once per committed sale by the loyalty step of the commit workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub phone: Option<String>,
    pub loyalty_points: i64,
    pub total_spent_cents: i64,
    pub visit_count: i64,
    pub created_at: DateTime<Utc>,
}

/// A product available for sale.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    pub id: String,
    /// Stock Keeping Unit - business identifier.
    pub sku: String,
    /// Display name, snapshotted onto sale items at commit time.
    pub name: String,
    /// Price in cents (smallest currency unit).
    pub price_cents: i64,
    /// Whether branch inventory is tracked for this product.
    /// Untracked products (e.g. services) never touch the movement ledger.
    pub track_inventory: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Product {
    /// Returns the price as a Money type.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }
}

// =============================================================================
// Sale
// =============================================================================

/// The status of a sale transaction.
///
/// A sale is created `Completed` (the commit workflow only persists after
/// payment authorization) and mutated exactly once, to `Refunded`, by the
/// return workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum SaleStatus {
    Completed,
    Refunded,
}

/// How the sale was tendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Physical cash; requires amount_received >= total, change returned.
    Cash,
    /// Card routed through the external authorization capability.
    Card,
    /// Operationally identical to card, tagged separately for reporting.
    Contactless,
    /// Mobile wallet routed through the external authorization capability.
    MobileWallet,
}

/// Settlement state of the payment leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Paid,
    Refunded,
}

/// A committed sale: the immutable financial header of a transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Sale {
    pub id: String,
    /// Unique, human-readable receipt number (time-based with random suffix).
    pub receipt_number: String,
    pub branch_id: String,
    pub employee_id: String,
    pub customer_id: Option<String>,
    pub subtotal_cents: i64,
    pub tax_cents: i64,
    pub discount_cents: i64,
    pub total_cents: i64,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub status: SaleStatus,
    /// Cash change returned to the customer (zero for card tenders).
    pub change_cents: i64,
    /// Gateway authorization id for card-family tenders.
    pub authorization_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Sale {
    /// Returns the sale total as Money.
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

/// A line item in a sale.
/// Uses the snapshot pattern to freeze product data at time of sale.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SaleItem {
    pub id: String,
    pub sale_id: String,
    pub product_id: String,
    /// Product name at time of sale (frozen, not a live reference).
    pub name_snapshot: String,
    /// Quantity sold; always > 0.
    pub quantity: i64,
    /// Unit price in cents at time of sale (frozen).
    pub unit_price_cents: i64,
    /// Line-level discount applied to this item.
    pub discount_cents: i64,
    /// Persisted line total; must equal unit_price × quantity − discount.
    pub total_cents: i64,
    pub created_at: DateTime<Utc>,
}

impl SaleItem {
    /// Recomputes the line total from its parts.
    ///
    /// The persisted `total_cents` must always equal this; the invariant is
    /// asserted by the commit workflow before writing.
    #[inline]
    pub fn computed_total_cents(&self) -> i64 {
        self.unit_price_cents * self.quantity - self.discount_cents
    }
}

// =============================================================================
// Inventory Ledger
// =============================================================================

/// The cause of an inventory movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum MovementType {
    Sale,
    Return,
    Purchase,
    Transfer,
    Count,
    Receiving,
}

/// A single signed quantity change in the inventory ledger.
///
/// Append-only: never updated or deleted (enforced by database triggers, not
/// just convention). The running sum of movements for a (product, branch)
/// pair IS the stock level; `InventoryRecord` merely caches it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct InventoryMovement {
    pub id: String,
    pub product_id: String,
    pub branch_id: String,
    pub movement_type: MovementType,
    /// Signed quantity delta: sales are negative, returns/receiving positive.
    pub quantity: i64,
    /// Cached quantity before this movement was applied.
    pub previous_quantity: i64,
    /// Cached quantity after this movement was applied.
    pub new_quantity: i64,
    /// What caused this movement: "sale", "return", "stock_count", ...
    pub reference_type: String,
    /// Id of the causing entity (sale id, return id, count id, ...).
    pub reference_id: String,
    pub employee_id: String,
    pub created_at: DateTime<Utc>,
}

/// Per (product, branch) cached stock level.
///
/// Invariant: `quantity` equals the sum of all movement quantities for the
/// pair. The record is a materialized view, not the ledger; every change goes
/// through a movement.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct InventoryRecord {
    pub product_id: String,
    pub branch_id: String,
    pub quantity: i64,
    /// At or below this level the record shows up in the low-stock view.
    pub low_stock_threshold: i64,
    pub reorder_point: i64,
    pub updated_at: DateTime<Utc>,
}

impl InventoryRecord {
    /// Low or negative stock is the observable downstream signal for
    /// oversell, which the sale path deliberately does not block.
    #[inline]
    pub fn is_low_stock(&self) -> bool {
        self.quantity <= self.low_stock_threshold
    }
}

/// Lifecycle of a physical stock count.
///
/// A pending count has no inventory effect; only explicit approval applies a
/// `Count` movement for the discrepancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum CountStatus {
    Pending,
    Approved,
    Rejected,
}

/// A recorded physical stock count awaiting approval.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct StockCount {
    pub id: String,
    pub product_id: String,
    pub branch_id: String,
    /// What the counter actually found on the shelf.
    pub counted_quantity: i64,
    /// What the inventory record said at count time.
    pub system_quantity: i64,
    pub status: CountStatus,
    pub counted_by: String,
    pub approved_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl StockCount {
    /// The movement quantity an approval would apply.
    #[inline]
    pub fn discrepancy(&self) -> i64 {
        self.counted_quantity - self.system_quantity
    }
}

// =============================================================================
// Returns
// =============================================================================

/// How a return is settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum ReturnType {
    Refund,
    Exchange,
    StoreCredit,
}

/// A processed return, referencing exactly one original sale.
///
/// A sale may be returned at most once; the database enforces this with a
/// unique constraint on `original_sale_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ReturnRecord {
    pub id: String,
    pub original_sale_id: String,
    pub branch_id: String,
    pub employee_id: String,
    pub reason: String,
    pub return_type: ReturnType,
    pub total_cents: i64,
    pub created_at: DateTime<Utc>,
}

/// A returned line, rebuilt from the original sale's items (never from
/// client-supplied lists).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ReturnItem {
    pub id: String,
    pub return_id: String,
    pub product_id: String,
    pub name_snapshot: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub total_cents: i64,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Shift & Cash Drawer
// =============================================================================

/// Shift lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum ShiftStatus {
    Open,
    Closed,
}

/// The bounded time window during which an employee is accountable for a
/// cash drawer.
///
/// At most one `Open` shift exists per employee at any instant. This is an
/// engine invariant enforced with an atomic conditional insert plus a partial
/// unique index, never a prior SELECT.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Shift {
    pub id: String,
    pub employee_id: String,
    pub branch_id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    /// Hours this shift is expected to run; elapsed beyond it is overtime.
    pub expected_duration_hours: f64,
    pub opening_cash_cents: i64,
    pub closing_cash_cents: Option<i64>,
    /// Sum of sale totals attributed to the employee during the window.
    pub total_sales_cents: i64,
    pub total_transactions: i64,
    pub status: ShiftStatus,
    /// Who closed the shift. Differs from `employee_id` on an administrative
    /// force-close; recorded for cash accountability.
    pub closed_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Shift {
    /// Hours elapsed since the shift started.
    pub fn elapsed_hours(&self, now: DateTime<Utc>) -> f64 {
        (now - self.start_time).num_seconds() as f64 / 3600.0
    }

    /// Whether the shift has run past its expected duration.
    pub fn is_overtime(&self, now: DateTime<Utc>) -> bool {
        self.elapsed_hours(now) > self.expected_hours()
    }

    /// Progress indicator for UI purposes, capped at 150%.
    pub fn progress(&self, now: DateTime<Utc>) -> f64 {
        (self.elapsed_hours(now) / self.expected_hours()).min(SHIFT_PROGRESS_CEILING)
    }

    fn expected_hours(&self) -> f64 {
        if self.expected_duration_hours > 0.0 {
            self.expected_duration_hours
        } else {
            DEFAULT_SHIFT_HOURS
        }
    }
}

/// Discrete cash movement against an open shift's drawer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum CashOpType {
    Deposit,
    Withdrawal,
    Count,
}

/// An immutable cash drawer operation. Must reference an `Open` shift;
/// rejected otherwise.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct CashDrawerOperation {
    pub id: String,
    pub shift_id: String,
    pub employee_id: String,
    pub op_type: CashOpType,
    pub amount_cents: i64,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Commission
// =============================================================================

/// Settlement state of an employee commission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum CommissionStatus {
    Pending,
    Paid,
}

/// Commission owed to the selling employee for one sale.
/// Created at most once per sale (unique sale_id).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct EmployeeCommission {
    pub id: String,
    pub employee_id: String,
    pub sale_id: String,
    pub rate_bps: u32,
    pub amount_cents: i64,
    pub status: CommissionStatus,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Activity Log & Notifications
// =============================================================================

/// An audit trail entry for operator-visible actions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ActivityEntry {
    pub id: String,
    pub branch_id: String,
    pub employee_id: String,
    pub action: String,
    pub entity_type: String,
    pub entity_id: String,
    pub details: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Role-scoped events fanned out to branch administrators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum NotificationEvent {
    SaleCompleted,
    ShiftStarted,
    ShiftEnded,
    ReturnProcessed,
    CashOperation,
}

/// A stored notification for one administrator.
/// External delivery transport is out of scope; this is store-and-forward.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Notification {
    pub id: String,
    pub recipient_id: String,
    pub branch_id: String,
    pub event: NotificationEvent,
    /// JSON payload describing the event (sale id, amounts, ...).
    pub payload: String,
    pub created_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Sale Commit Step Ledger
// =============================================================================

/// Side-effect steps of the sale commit workflow, recorded per sale so each
/// runs exactly once and failed steps can be retried independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum CommitStep {
    Inventory,
    Loyalty,
    Commission,
    Notify,
}

impl CommitStep {
    /// All steps in execution order.
    pub const ALL: [CommitStep; 4] = [
        CommitStep::Inventory,
        CommitStep::Loyalty,
        CommitStep::Commission,
        CommitStep::Notify,
    ];

    /// Stable name used in the step ledger and log fields.
    pub fn as_str(&self) -> &'static str {
        match self {
            CommitStep::Inventory => "inventory",
            CommitStep::Loyalty => "loyalty",
            CommitStep::Commission => "commission",
            CommitStep::Notify => "notify",
        }
    }
}

/// Outcome of one commit step for one sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    Done,
    /// Not applicable for this sale (e.g. loyalty without a customer).
    Skipped,
    Failed,
}

/// One row of the per-sale step ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct CommitStepRecord {
    pub sale_id: String,
    pub step: CommitStep,
    pub status: StepStatus,
    pub error: Option<String>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================
