//! Application handlers.
//!
//! Command and query handlers that orchestrate domain operations.

pub mod entitlement;
pub mod reconciliation;

pub use entitlement::{
    CheckEntitlementHandler, CheckEntitlementQuery, EntitlementSource, EntitlementView,
};
pub use reconciliation::{
    ActivityIntent, CompensationOutcome, CompensationTrigger, HandleStripeWebhookCommand,
    HandleStripeWebhookHandler, PaymentReferenceResolver, PostCommitHooks, PostCommitReport,
    ReconciliationOutcome, RefundReason,
};
