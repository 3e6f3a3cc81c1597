//! Application configuration module
//!
//! Type-safe configuration loaded from environment variables using the
//! `config` and `dotenvy` crates. Variables carry the
//! `SUBSCRIPTION_RECONCILER` prefix and nested values use `__` separators.
//!
//! # Example
//!
//! ```no_run
//! use subscription_reconciler::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod activity;
mod database;
mod error;
mod payment;
mod redis;
mod server;

pub use activity::ActivityConfig;
pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use payment::PaymentConfig;
pub use redis::RedisConfig;
pub use server::{Environment, ServerConfig};

use serde::Deserialize;

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "SUBSCRIPTION_RECONCILER";

/// Root application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port, environment, logging)
    #[serde(default)]
    pub server: ServerConfig,

    /// State store (PostgreSQL)
    pub database: DatabaseConfig,

    /// Entitlement cache and activity channel (Redis)
    pub redis: RedisConfig,

    /// Billing provider (Stripe)
    pub payment: PaymentConfig,

    /// Activity sink
    #[serde(default)]
    pub activity: ActivityConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// - `SUBSCRIPTION_RECONCILER__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `SUBSCRIPTION_RECONCILER__PAYMENT__STRIPE_WEBHOOK_SECRET=...` -> `payment.stripe_webhook_secret`
    ///
    /// A `.env` file is read first when present.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix(ENV_PREFIX)
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.database.validate()?;
        self.redis.validate()?;
        self.payment.validate(&self.server.environment)?;
        self.activity.validate()?;
        Ok(())
    }

    /// Check if running in production environment
    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}
