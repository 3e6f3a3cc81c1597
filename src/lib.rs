//! Subscription Reconciler - Stripe billing webhooks to canonical entitlement state.
//!
//! Verified provider events are routed by type, mapped to a canonical
//! subscription status, and persisted atomically with an audit snapshot.
//! Cache sync and activity emission run only after a commit; checkouts
//! that cannot be attributed or persisted are compensated with a refund.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
