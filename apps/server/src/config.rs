//! Server configuration module.
//!
//! Configuration is loaded from environment variables with fallback to
//! defaults, then frozen into an [`meridian_engine::EngineConfig`] that is
//! injected into the engine. Nothing reads the environment after startup.

use std::env;
use std::time::Duration;

use meridian_core::{DiscountPolicy, PaymentMethod, DEFAULT_CASHIER_DISCOUNT_CAP_BPS,
    DEFAULT_SHIFT_HOURS};
use meridian_engine::{EngineConfig, GatewayConfig, GatewayMode};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// HTTP bind port
    pub http_port: u16,

    /// Path to the branch's SQLite database file
    pub database_path: String,

    /// External payment capability's charge endpoint
    pub gateway_charge_url: String,

    /// "live" or "test"; test mode approves locally
    pub gateway_mode: GatewayMode,

    /// Gateway call timeout in milliseconds
    pub gateway_timeout_ms: u64,

    /// ISO currency code for the gateway boundary
    pub currency: String,

    /// Cashier discount cap in basis points
    pub cashier_discount_cap_bps: u32,

    /// Default expected shift duration in hours
    pub default_shift_hours: f64,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let config = AppConfig {
            http_port: env::var("HTTP_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("HTTP_PORT".to_string()))?,

            database_path: env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "./meridian.db".to_string()),

            gateway_charge_url: env::var("GATEWAY_CHARGE_URL")
                .unwrap_or_else(|_| "http://localhost:9090/charge".to_string()),

            gateway_mode: match env::var("GATEWAY_MODE")
                .unwrap_or_else(|_| "test".to_string())
                .as_str()
            {
                "live" => GatewayMode::Live,
                "test" => GatewayMode::Test,
                _ => return Err(ConfigError::InvalidValue("GATEWAY_MODE".to_string())),
            },

            gateway_timeout_ms: env::var("GATEWAY_TIMEOUT_MS")
                .unwrap_or_else(|_| "10000".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("GATEWAY_TIMEOUT_MS".to_string()))?,

            currency: env::var("CURRENCY").unwrap_or_else(|_| "USD".to_string()),

            cashier_discount_cap_bps: env::var("CASHIER_DISCOUNT_CAP_BPS")
                .unwrap_or_else(|_| DEFAULT_CASHIER_DISCOUNT_CAP_BPS.to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("CASHIER_DISCOUNT_CAP_BPS".to_string()))?,

            default_shift_hours: env::var("DEFAULT_SHIFT_HOURS")
                .unwrap_or_else(|_| DEFAULT_SHIFT_HOURS.to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("DEFAULT_SHIFT_HOURS".to_string()))?,
        };

        Ok(config)
    }

    /// Freezes this configuration into the engine's injected value.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            gateway: GatewayConfig {
                charge_url: self.gateway_charge_url.clone(),
                currency: self.currency.clone(),
                timeout: Duration::from_millis(self.gateway_timeout_ms),
                mode: self.gateway_mode,
                enabled_methods: vec![
                    PaymentMethod::Cash,
                    PaymentMethod::Card,
                    PaymentMethod::Contactless,
                    PaymentMethod::MobileWallet,
                ],
            },
            discount_policy: DiscountPolicy {
                cashier_cap_bps: self.cashier_discount_cap_bps,
            },
            default_shift_hours: self.default_shift_hours,
        }
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),
}
