//! PostgreSQL adapters.

mod subscription_state_store;

pub use subscription_state_store::PostgresSubscriptionStateStore;
