//! # Payment Authorization Gateway Adapter
//!
//! Dispatches tender collection over {cash, card, contactless, mobile
//! wallet}. Cash settles locally; the card family routes through an external
//! authorization capability behind the [`PaymentGateway`] trait.
//!
//! ## The Boundary
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                   Tender Collection                                     │
//! │                                                                         │
//! │  PaymentProcessor::collect(total, tender)                               │
//! │       │                                                                 │
//! │       ├── Cash ──► amount_received >= total? ──► change returned        │
//! │       │                                                                 │
//! │       └── Card / Contactless / MobileWallet                             │
//! │              │                                                          │
//! │              ▼  integer minor units, ISO currency, instrument token     │
//! │       ┌──────────────────────────────────────┐                          │
//! │       │  authorize() → Approved              │  ← proceeds              │
//! │       │             → Declined { reason }    │  ← surfaced verbatim,    │
//! │       │             → Unknown  { reason }    │    NO sale created       │
//! │       └──────────────────────────────────────┘                          │
//! │                                                                         │
//! │  The call carries a timeout; a timeout maps to Unknown, never a hang.   │
//! │  The response's success flag decides, not the HTTP status alone.        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Configuration is an immutable value injected at construction. Concurrent
//! requests can never observe a half-updated gateway configuration.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use meridian_core::validation::{validate_currency, validate_positive_amount};
use meridian_core::{Money, PaymentMethod, ValidationError};

// =============================================================================
// Gateway Configuration
// =============================================================================

/// Live mode calls the external capability; test mode approves locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayMode {
    Live,
    Test,
}

/// Immutable gateway configuration, constructed at startup and injected.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// The external capability's charge endpoint.
    pub charge_url: String,
    /// ISO currency code sent with every charge.
    pub currency: String,
    /// Per-call timeout; expiry maps to `AuthorizationOutcome::Unknown`.
    pub timeout: Duration,
    pub mode: GatewayMode,
    /// Tender methods this deployment accepts.
    pub enabled_methods: Vec<PaymentMethod>,
}

impl GatewayConfig {
    /// A test-mode configuration accepting every method (used by tests and
    /// demo deployments).
    pub fn test() -> Self {
        GatewayConfig {
            charge_url: "http://localhost:0/charge".to_string(),
            currency: "USD".to_string(),
            timeout: Duration::from_secs(10),
            mode: GatewayMode::Test,
            enabled_methods: vec![
                PaymentMethod::Cash,
                PaymentMethod::Card,
                PaymentMethod::Contactless,
                PaymentMethod::MobileWallet,
            ],
        }
    }

    fn is_enabled(&self, method: PaymentMethod) -> bool {
        self.enabled_methods.contains(&method)
    }
}

// =============================================================================
// Wire Types
// =============================================================================

/// Charge request sent to the external capability.
///
/// Amounts are ALWAYS integer minor units at this boundary; converting here,
/// once, keeps rounding drift out of the gateway leg entirely.
#[derive(Debug, Clone, Serialize)]
pub struct ChargeRequest {
    pub amount_minor: i64,
    pub currency: String,
    pub instrument_token: String,
    pub metadata: ChargeMetadata,
}

/// Reporting metadata attached to a charge.
#[derive(Debug, Clone, Serialize)]
pub struct ChargeMetadata {
    /// "card", "contactless", or "mobile_wallet" - contactless is
    /// operationally identical to card but tagged for reporting.
    pub channel: &'static str,
    pub branch_id: String,
}

/// Charge response from the external capability.
///
/// The `success` flag, not the HTTP status alone, determines whether the
/// sale proceeds.
#[derive(Debug, Clone, Deserialize)]
pub struct ChargeResponse {
    pub success: bool,
    #[serde(default)]
    pub authorization_id: Option<String>,
    #[serde(default)]
    pub decline_reason: Option<String>,
}

/// Outcome of an authorization attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationOutcome {
    Approved { authorization_id: String },
    Declined { reason: String },
    /// Timeout or transport failure: decline-equivalent, never ambiguous to
    /// the caller.
    Unknown { reason: String },
}

// =============================================================================
// Gateway Capability
// =============================================================================

/// The external authorization capability, as the engine sees it.
///
/// The engine treats this as opaque: `authorize(amount, instrument) →
/// outcome`. Implementations must not panic and must embed their own
/// timeout (returning `Unknown` on expiry).
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn authorize(&self, request: &ChargeRequest) -> AuthorizationOutcome;
}

/// HTTP implementation of the gateway capability.
pub struct HttpPaymentGateway {
    client: reqwest::Client,
    charge_url: String,
    mode: GatewayMode,
}

impl HttpPaymentGateway {
    /// Builds the client with the configured per-call timeout baked in.
    pub fn new(config: &GatewayConfig) -> EngineResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| EngineError::GatewayUnavailable {
                reason: format!("gateway client construction failed: {e}"),
            })?;

        Ok(HttpPaymentGateway {
            client,
            charge_url: config.charge_url.clone(),
            mode: config.mode,
        })
    }
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    async fn authorize(&self, request: &ChargeRequest) -> AuthorizationOutcome {
        // Test mode approves locally with a synthetic authorization id.
        if self.mode == GatewayMode::Test {
            return AuthorizationOutcome::Approved {
                authorization_id: format!("test-{}", Uuid::new_v4()),
            };
        }

        debug!(
            amount_minor = request.amount_minor,
            channel = request.metadata.channel,
            "Dispatching charge to gateway"
        );

        let response = match self.client.post(&self.charge_url).json(request).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Gateway transport failure");
                return AuthorizationOutcome::Unknown {
                    reason: format!("gateway unreachable: {e}"),
                };
            }
        };

        let body: ChargeResponse = match response.json().await {
            Ok(body) => body,
            Err(e) => {
                warn!(error = %e, "Gateway returned an unreadable body");
                return AuthorizationOutcome::Unknown {
                    reason: format!("unreadable gateway response: {e}"),
                };
            }
        };

        if body.success {
            AuthorizationOutcome::Approved {
                authorization_id: body
                    .authorization_id
                    .unwrap_or_else(|| format!("auth-{}", Uuid::new_v4())),
            }
        } else {
            AuthorizationOutcome::Declined {
                reason: body
                    .decline_reason
                    .unwrap_or_else(|| "declined by gateway".to_string()),
            }
        }
    }
}

// =============================================================================
// Contactless UI State (presentation only)
// =============================================================================

/// Client-visible contactless tap progression. This is UI feedback only and
/// not part of the financial contract; the terminal state mirrors the
/// gateway outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactlessPhase {
    Waiting,
    Reading,
    Success,
    Error,
}

impl ContactlessPhase {
    /// Waiting → Reading, when a card enters the field.
    pub fn begin_read(self) -> ContactlessPhase {
        match self {
            ContactlessPhase::Waiting => ContactlessPhase::Reading,
            other => other,
        }
    }

    /// Reading → Success | Error, from the authorization outcome.
    pub fn finish(self, approved: bool) -> ContactlessPhase {
        match self {
            ContactlessPhase::Reading => {
                if approved {
                    ContactlessPhase::Success
                } else {
                    ContactlessPhase::Error
                }
            }
            other => other,
        }
    }
}

// =============================================================================
// Tender Dispatch
// =============================================================================

/// How the caller is paying.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Tender {
    pub method: PaymentMethod,
    /// Cash only: what the customer handed over.
    #[serde(default)]
    pub amount_received_cents: Option<i64>,
    /// Card family only: tokenized instrument.
    #[serde(default)]
    pub instrument_token: Option<String>,
}

/// Result of a successful tender collection.
#[derive(Debug, Clone, Serialize)]
pub struct TenderOutcome {
    /// Gateway authorization id (None for cash).
    pub authorization_id: Option<String>,
    /// Change owed to the customer (cash only; zero otherwise).
    pub change_cents: i64,
    /// Terminal contactless phase, for UI display (contactless only).
    pub contactless_phase: Option<ContactlessPhase>,
}

/// Polymorphic tender collection over the configured gateway.
pub struct PaymentProcessor {
    gateway: std::sync::Arc<dyn PaymentGateway>,
    config: GatewayConfig,
}

impl PaymentProcessor {
    /// Creates a processor over an explicit gateway and configuration.
    pub fn new(gateway: std::sync::Arc<dyn PaymentGateway>, config: GatewayConfig) -> EngineResult<Self> {
        validate_currency(&config.currency)?;
        Ok(PaymentProcessor { gateway, config })
    }

    /// Collects payment for a total.
    ///
    /// Cash never leaves the terminal. The card family converts to integer
    /// minor units and calls the capability; a decline or unknown outcome is
    /// a typed error and the workflow creates nothing.
    pub async fn collect(
        &self,
        total: Money,
        tender: &Tender,
        branch_id: &str,
    ) -> EngineResult<TenderOutcome> {
        if !self.config.is_enabled(tender.method) {
            return Err(ValidationError::NotAllowed {
                field: "payment_method".to_string(),
                allowed: self
                    .config
                    .enabled_methods
                    .iter()
                    .map(|m| format!("{m:?}"))
                    .collect(),
            }
            .into());
        }

        match tender.method {
            PaymentMethod::Cash => self.collect_cash(total, tender),
            PaymentMethod::Card => {
                self.collect_via_gateway(total, tender, branch_id, "card").await
            }
            PaymentMethod::Contactless => {
                let mut outcome = self
                    .collect_via_gateway(total, tender, branch_id, "contactless")
                    .await;
                let phase = ContactlessPhase::Waiting
                    .begin_read()
                    .finish(outcome.is_ok());
                if let Ok(ref mut o) = outcome {
                    o.contactless_phase = Some(phase);
                }
                outcome
            }
            PaymentMethod::MobileWallet => {
                self.collect_via_gateway(total, tender, branch_id, "mobile_wallet")
                    .await
            }
        }
    }

    fn collect_cash(&self, total: Money, tender: &Tender) -> EngineResult<TenderOutcome> {
        let received_cents = tender.amount_received_cents.ok_or(ValidationError::Required {
            field: "amount_received".to_string(),
        })?;
        validate_positive_amount("amount_received", received_cents)?;

        let received = Money::from_cents(received_cents);
        if received < total {
            return Err(ValidationError::OutOfRange {
                field: "amount_received".to_string(),
                min: total.cents(),
                max: i64::MAX,
            }
            .into());
        }

        Ok(TenderOutcome {
            authorization_id: None,
            change_cents: (received - total).cents(),
            contactless_phase: None,
        })
    }

    async fn collect_via_gateway(
        &self,
        total: Money,
        tender: &Tender,
        branch_id: &str,
        channel: &'static str,
    ) -> EngineResult<TenderOutcome> {
        let instrument_token = tender
            .instrument_token
            .clone()
            .ok_or(ValidationError::Required {
                field: "instrument_token".to_string(),
            })?;

        let request = ChargeRequest {
            amount_minor: total.minor_units(),
            currency: self.config.currency.clone(),
            instrument_token,
            metadata: ChargeMetadata {
                channel,
                branch_id: branch_id.to_string(),
            },
        };

        match self.gateway.authorize(&request).await {
            AuthorizationOutcome::Approved { authorization_id } => Ok(TenderOutcome {
                authorization_id: Some(authorization_id),
                change_cents: 0,
                contactless_phase: None,
            }),
            AuthorizationOutcome::Declined { reason } => Err(EngineError::Declined { reason }),
            AuthorizationOutcome::Unknown { reason } => {
                Err(EngineError::GatewayUnavailable { reason })
            }
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockGateway;
    use std::sync::Arc;

    fn processor(outcome: AuthorizationOutcome) -> PaymentProcessor {
        PaymentProcessor::new(Arc::new(MockGateway::new(outcome)), GatewayConfig::test()).unwrap()
    }

    fn cash(amount_received_cents: i64) -> Tender {
        Tender {
            method: PaymentMethod::Cash,
            amount_received_cents: Some(amount_received_cents),
            instrument_token: None,
        }
    }

    fn card() -> Tender {
        Tender {
            method: PaymentMethod::Card,
            amount_received_cents: None,
            instrument_token: Some("tok-visa".to_string()),
        }
    }

    #[tokio::test]
    async fn cash_returns_change() {
        let p = processor(MockGateway::approved_outcome());
        let outcome = p
            .collect(Money::from_cents(945), &cash(1_000), "b1")
            .await
            .unwrap();

        assert_eq!(outcome.change_cents, 55);
        assert!(outcome.authorization_id.is_none());
    }

    #[tokio::test]
    async fn cash_under_total_is_rejected() {
        let p = processor(MockGateway::approved_outcome());
        let err = p
            .collect(Money::from_cents(945), &cash(900), "b1")
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[tokio::test]
    async fn card_approval_carries_authorization_id() {
        let p = processor(AuthorizationOutcome::Approved {
            authorization_id: "auth-1".to_string(),
        });
        let outcome = p
            .collect(Money::from_cents(945), &card(), "b1")
            .await
            .unwrap();

        assert_eq!(outcome.authorization_id.as_deref(), Some("auth-1"));
        assert_eq!(outcome.change_cents, 0);
    }

    #[tokio::test]
    async fn decline_reason_surfaces_verbatim() {
        let p = processor(AuthorizationOutcome::Declined {
            reason: "insufficient funds".to_string(),
        });
        let err = p
            .collect(Money::from_cents(945), &card(), "b1")
            .await
            .unwrap_err();

        match err {
            EngineError::Declined { reason } => assert_eq!(reason, "insufficient funds"),
            other => panic!("expected Declined, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unknown_outcome_is_decline_equivalent() {
        let p = processor(AuthorizationOutcome::Unknown {
            reason: "timed out".to_string(),
        });
        let err = p
            .collect(Money::from_cents(945), &card(), "b1")
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::GatewayUnavailable { .. }));
    }

    #[tokio::test]
    async fn card_without_instrument_is_a_validation_error() {
        let p = processor(MockGateway::approved_outcome());
        let tender = Tender {
            method: PaymentMethod::Card,
            amount_received_cents: None,
            instrument_token: None,
        };
        let err = p
            .collect(Money::from_cents(945), &tender, "b1")
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[tokio::test]
    async fn disabled_method_is_rejected() {
        let mut config = GatewayConfig::test();
        config.enabled_methods = vec![PaymentMethod::Cash];
        let p = PaymentProcessor::new(
            Arc::new(MockGateway::new(MockGateway::approved_outcome())),
            config,
        )
        .unwrap();

        let err = p
            .collect(Money::from_cents(945), &card(), "b1")
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[tokio::test]
    async fn contactless_reports_terminal_phase() {
        let p = processor(MockGateway::approved_outcome());
        let tender = Tender {
            method: PaymentMethod::Contactless,
            amount_received_cents: None,
            instrument_token: Some("tok-tap".to_string()),
        };
        let outcome = p
            .collect(Money::from_cents(945), &tender, "b1")
            .await
            .unwrap();

        assert_eq!(outcome.contactless_phase, Some(ContactlessPhase::Success));
    }

    #[test]
    fn contactless_phase_machine() {
        let phase = ContactlessPhase::Waiting.begin_read();
        assert_eq!(phase, ContactlessPhase::Reading);
        assert_eq!(phase.finish(true), ContactlessPhase::Success);
        assert_eq!(
            ContactlessPhase::Waiting.begin_read().finish(false),
            ContactlessPhase::Error
        );
        // terminal states are absorbing
        assert_eq!(ContactlessPhase::Success.begin_read(), ContactlessPhase::Success);
    }
}
