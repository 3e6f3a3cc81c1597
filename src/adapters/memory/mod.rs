//! In-process adapters for tests and local development.

mod activity_writer;
mod entitlement_cache;
mod state_store;

pub use activity_writer::InMemoryActivityWriter;
pub use entitlement_cache::{CachedEntitlement, InMemoryEntitlementCache};
pub use state_store::{InMemorySubscriptionStateStore, StoreFault};
