//! # meridian-engine: Transaction & Inventory Ledger Workflows
//!
//! The orchestration layer of Meridian POS: cart pricing feeds payment
//! authorization, authorization feeds the multi-step sale commit, and every
//! stock-affecting subsystem writes through the inventory movement ledger.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Meridian POS Engine                                 │
//! │                                                                         │
//! │  apps/server (HTTP)                                                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐    │
//! │  │              ★ meridian-engine (THIS CRATE) ★                   │    │
//! │  │                                                                 │    │
//! │  │  ┌──────────┐ ┌──────────┐ ┌──────────┐ ┌──────────┐            │    │
//! │  │  │ payment  │ │   sale   │ │ returns  │ │  shift   │            │    │
//! │  │  │ adapter  │ │ workflow │ │ workflow │ │  ledger  │            │    │
//! │  │  └────┬─────┘ └────┬─────┘ └────┬─────┘ └────┬─────┘            │    │
//! │  │       │       ┌────┴───────┐    │            │                  │    │
//! │  │       │       │   stock    │    │      ┌─────┴──────┐           │    │
//! │  │       │       │ operations │    │      │  notify    │           │    │
//! │  │       │       └────────────┘    │      │  fan-out   │           │    │
//! │  │       │                         │      └────────────┘           │    │
//! │  └───────┼─────────────────────────┼───────────────────────────────┘    │
//! │          ▼                         ▼                                    │
//! │   external payment           meridian-db                                │
//! │   authorization              (SQLite ledger)                            │
//! │   capability                                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod notify;
pub mod payment;
pub mod returns;
pub mod sale;
pub mod shift;
pub mod stock;

#[cfg(test)]
pub(crate) mod testing;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{EngineError, EngineResult};
pub use notify::Notifier;
pub use payment::{
    AuthorizationOutcome, ChargeRequest, ChargeResponse, ContactlessPhase, GatewayConfig,
    GatewayMode, HttpPaymentGateway, PaymentGateway, PaymentProcessor, Tender, TenderOutcome,
};
pub use returns::{ProcessedReturn, ReturnRequest, ReturnWorkflow};
pub use sale::{CheckoutLine, CheckoutRequest, CommittedSale, SaleWorkflow};
pub use shift::{CashOpRequest, CloseShiftRequest, OpenShiftRequest, ShiftLedger, ShiftSummary};
pub use stock::StockService;

use std::sync::Arc;

use meridian_core::{DiscountPolicy, DEFAULT_SHIFT_HOURS};
use meridian_db::Database;

// =============================================================================
// Engine Facade
// =============================================================================

/// Deployment configuration injected into the engine at startup.
///
/// Immutable once constructed: concurrent requests can never observe a
/// half-updated configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub gateway: GatewayConfig,
    pub discount_policy: DiscountPolicy,
    pub default_shift_hours: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            gateway: GatewayConfig::test(),
            discount_policy: DiscountPolicy::default(),
            default_shift_hours: DEFAULT_SHIFT_HOURS,
        }
    }
}

/// All engine services wired over one database handle.
pub struct Engine {
    pub sales: SaleWorkflow,
    pub returns: ReturnWorkflow,
    pub shifts: ShiftLedger,
    pub stock: StockService,
}

impl Engine {
    /// Wires the engine with the HTTP gateway implied by the configuration.
    pub fn new(db: Database, config: EngineConfig) -> EngineResult<Self> {
        let gateway = Arc::new(HttpPaymentGateway::new(&config.gateway)?);
        Self::with_gateway(db, gateway, config)
    }

    /// Wires the engine over an explicit gateway (tests, alternate
    /// transports).
    pub fn with_gateway(
        db: Database,
        gateway: Arc<dyn PaymentGateway>,
        config: EngineConfig,
    ) -> EngineResult<Self> {
        let notifier = Notifier::new(db.clone());
        let payments = PaymentProcessor::new(gateway, config.gateway.clone())?;

        Ok(Engine {
            sales: SaleWorkflow::new(
                db.clone(),
                payments,
                notifier.clone(),
                config.discount_policy,
            ),
            returns: ReturnWorkflow::new(db.clone(), notifier.clone()),
            shifts: ShiftLedger::new(db.clone(), notifier, config.default_shift_hours),
            stock: StockService::new(db),
        })
    }
}
