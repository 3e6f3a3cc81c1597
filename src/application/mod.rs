//! Application layer - Commands, Queries, and Handlers.
//!
//! This layer orchestrates domain operations and coordinates between ports.
//! Webhook reconciliation is the write side; entitlement checks are the read side.

pub mod handlers;

pub use handlers::{
    // Reconciliation (write)
    HandleStripeWebhookCommand, HandleStripeWebhookHandler, ReconciliationOutcome,
    // Entitlement (read)
    CheckEntitlementHandler, CheckEntitlementQuery, EntitlementSource, EntitlementView,
};
