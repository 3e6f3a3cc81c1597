//! Redis adapters: entitlement cache and activity publishing.

mod activity_publisher;
mod entitlement_cache;

pub use activity_publisher::RedisActivityPublisher;
pub use entitlement_cache::RedisEntitlementCache;
