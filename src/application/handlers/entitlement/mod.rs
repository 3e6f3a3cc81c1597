//! Entitlement queries.

mod check_entitlement;

pub use check_entitlement::{
    CheckEntitlementHandler, CheckEntitlementQuery, EntitlementSource, EntitlementView,
};
