//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! - `BillingProvider` - subscription/invoice lookups and refunds
//! - `SubscriptionStateStore` - canonical status and audit journal
//! - `EntitlementCache` - low-latency entitlement hint
//! - `ActivityWriter` - human-readable audit activities

mod activity_writer;
mod billing_provider;
mod entitlement_cache;
mod subscription_state_store;

pub use activity_writer::ActivityWriter;
pub use billing_provider::{
    BillingError, BillingErrorCode, BillingProvider, RefundReceipt, RefundRequest,
};
pub use entitlement_cache::{entitlement_key, EntitlementCache};
pub use subscription_state_store::SubscriptionStateStore;
