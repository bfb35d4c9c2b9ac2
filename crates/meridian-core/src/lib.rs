//! # meridian-core: Pure Business Logic for Meridian POS
//!
//! This crate is the **heart** of the Meridian POS transaction engine. It
//! contains all business logic as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Meridian POS Architecture                         │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    HTTP API (apps/server)                       │   │
//! │  │    POST /sales ── POST /returns ── POST /shifts ── ...          │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                   meridian-engine (workflows)                   │   │
//! │  │    sale commit, returns, shift ledger, payment gateway          │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ meridian-core (THIS CRATE) ★                    │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐   │   │
//! │  │   │   types   │  │   money   │  │  pricing  │  │ validation│   │   │
//! │  │   │   Sale    │  │   Money   │  │  carts    │  │   rules   │   │   │
//! │  │   │   Shift   │  │   Rate    │  │  caps     │  │   checks  │   │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘   │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS            │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                   meridian-db (SQLite ledger)                   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Sale, Shift, InventoryMovement, etc.)
//! - [`money`] - Money and Rate types with integer arithmetic (no floats!)
//! - [`pricing`] - Cart pricing with role-aware discount caps
//! - [`error`] - Validation error types
//! - [`validation`] - Business rule validation
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every function is deterministic - same input = same output
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: All monetary values are in cents (i64) to avoid float errors
//! 4. **Explicit Errors**: All errors are typed, never strings or panics

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod money;
pub mod pricing;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use meridian_core::Money` instead of
// `use meridian_core::money::Money`

pub use error::{ValidationError, ValidationResult};
pub use money::{Money, Rate};
pub use pricing::{price_cart, CartLine, Discount, DiscountPolicy, PricedCart};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum lines allowed in a single cart
///
/// ## Business Reason
/// Prevents runaway carts and ensures reasonable transaction sizes.
/// Can be made configurable per-branch in future versions.
pub const MAX_CART_LINES: usize = 100;

/// Maximum quantity of a single line in a cart
///
/// ## Business Reason
/// Prevents accidental over-ordering (e.g., typing 1000 instead of 10)
pub const MAX_LINE_QUANTITY: i64 = 999;

/// Default discount cap for cashier-role actors, in basis points (10%)
///
/// A cashier may not discount a cart by more than this share of the subtotal,
/// whether the discount was entered as a fixed amount or a percentage.
/// Managers and admins are uncapped. Configurable per-deployment.
pub const DEFAULT_CASHIER_DISCOUNT_CAP_BPS: u32 = 1_000;

/// Default expected shift duration in hours
///
/// Used when a shift is opened without an explicit expected duration.
/// Elapsed time beyond this flags the shift as overtime.
pub const DEFAULT_SHIFT_HOURS: f64 = 8.0;

/// Loyalty accrual divisor: one point per this many cents of sale total
///
/// floor(total / $10) points per sale, i.e. one point per 1000 cents.
pub const LOYALTY_CENTS_PER_POINT: i64 = 1_000;

/// Ceiling for the shift progress indicator (150% of expected duration)
pub const SHIFT_PROGRESS_CEILING: f64 = 1.5;
