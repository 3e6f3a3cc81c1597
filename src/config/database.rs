//! State store connection settings

use serde::Deserialize;
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;

use super::error::ValidationError;

/// Upper bound on state store connections per instance.
const MAX_POOL_SIZE: u32 = 50;

/// PostgreSQL settings for the subscription state store
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Connections held for concurrent webhook deliveries
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,

    /// Seconds a delivery may wait for a connection before its save
    /// is reported as unavailable
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_secs: u64,

    /// Apply the bundled migrations on startup
    #[serde(default)]
    pub run_migrations: bool,
}

impl DatabaseConfig {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }

    /// Pool options for the state store.
    pub fn pool_options(&self) -> PgPoolOptions {
        PgPoolOptions::new()
            .max_connections(self.pool_size)
            .acquire_timeout(self.acquire_timeout())
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.url.is_empty() {
            return Err(ValidationError::MissingRequired("DATABASE_URL"));
        }
        if !self.url.starts_with("postgres://") && !self.url.starts_with("postgresql://") {
            return Err(ValidationError::InvalidDatabaseUrl);
        }
        if self.pool_size == 0 {
            return Err(ValidationError::InvalidPoolSize);
        }
        if self.pool_size > MAX_POOL_SIZE {
            return Err(ValidationError::PoolSizeTooLarge);
        }
        if self.acquire_timeout_secs == 0 {
            return Err(ValidationError::InvalidTimeout);
        }
        Ok(())
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            pool_size: default_pool_size(),
            acquire_timeout_secs: default_acquire_timeout(),
            run_migrations: false,
        }
    }
}

fn default_pool_size() -> u32 {
    10
}

// Short, so a stalled store surfaces as 503 while the provider can still retry
fn default_acquire_timeout() -> u64 {
    5
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_url(url: &str) -> DatabaseConfig {
        DatabaseConfig {
            url: url.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn defaults_suit_webhook_traffic() {
        let config = DatabaseConfig::default();
        assert_eq!(config.pool_size, 10);
        assert_eq!(config.acquire_timeout(), Duration::from_secs(5));
        assert!(!config.run_migrations);
    }

    #[test]
    fn pool_options_carry_size_and_timeout() {
        let config = DatabaseConfig {
            pool_size: 4,
            acquire_timeout_secs: 2,
            ..Default::default()
        };
        let options = config.pool_options();
        assert_eq!(options.get_max_connections(), 4);
        assert_eq!(options.get_acquire_timeout(), Duration::from_secs(2));
    }

    #[test]
    fn accepts_both_postgres_schemes() {
        assert!(with_url("postgres://localhost/billing").validate().is_ok());
        assert!(with_url("postgresql://u:p@localhost:5432/billing").validate().is_ok());
    }

    #[test]
    fn rejects_missing_or_foreign_url() {
        assert!(matches!(
            DatabaseConfig::default().validate(),
            Err(ValidationError::MissingRequired(_))
        ));
        assert!(matches!(
            with_url("mysql://localhost/billing").validate(),
            Err(ValidationError::InvalidDatabaseUrl)
        ));
    }

    #[test]
    fn rejects_pool_bounds_and_zero_timeout() {
        let empty = DatabaseConfig {
            pool_size: 0,
            ..with_url("postgres://localhost/billing")
        };
        assert!(matches!(empty.validate(), Err(ValidationError::InvalidPoolSize)));

        let huge = DatabaseConfig {
            pool_size: MAX_POOL_SIZE + 1,
            ..with_url("postgres://localhost/billing")
        };
        assert!(matches!(huge.validate(), Err(ValidationError::PoolSizeTooLarge)));

        let no_wait = DatabaseConfig {
            acquire_timeout_secs: 0,
            ..with_url("postgres://localhost/billing")
        };
        assert!(matches!(no_wait.validate(), Err(ValidationError::InvalidTimeout)));
    }
}
