//! # meridian-db: Database Layer for Meridian POS
//!
//! This crate provides database access for the Meridian POS transaction and
//! inventory ledger. It uses SQLite for branch-local storage with sqlx for
//! async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Meridian POS Data Flow                             │
//! │                                                                         │
//! │  Workflow (e.g. SaleWorkflow::commit)                                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐    │
//! │  │                    meridian-db (THIS CRATE)                     │    │
//! │  │                                                                 │    │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐    │    │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │    │    │
//! │  │   │   (pool.rs)   │    │ (sale, shift, │    │  (embedded)  │    │    │
//! │  │   │               │    │  inventory..) │    │              │    │    │
//! │  │   │ SqlitePool    │◄───│ atomic        │    │ 001_init.sql │    │    │
//! │  │   │ WAL mode      │    │ increments &  │    │ 002_guards   │    │    │
//! │  │   │               │    │ cond. inserts │    │              │    │    │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘    │    │
//! │  └─────────────────────────────────────────────────────────────────┘    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite database file shared by the branch's terminals                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations (sale, inventory, shift, ...)
//!
//! ## Hard Rules
//!
//! 1. The inventory movement log is append-only (triggers enforce it)
//! 2. Stock and loyalty adjustments are single-statement atomic increments
//! 3. Invariants (one open shift, one return per sale) live in conditional
//!    statements and unique indexes, never in application-level SELECTs

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::activity::ActivityRepository;
pub use repository::branch::BranchRepository;
pub use repository::commission::CommissionRepository;
pub use repository::customer::CustomerRepository;
pub use repository::employee::EmployeeRepository;
pub use repository::inventory::{InventoryRepository, MovementRequest};
pub use repository::product::ProductRepository;
pub use repository::returns::ReturnRepository;
pub use repository::sale::SaleRepository;
pub use repository::shift::ShiftRepository;
pub use repository::workflow::WorkflowRepository;
