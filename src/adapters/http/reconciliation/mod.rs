//! HTTP adapter for reconciliation endpoints.
//!
//! - `POST /internal/stripe/webhook` - Stripe webhook deliveries (signature verified)
//! - `GET /internal/subscriptions/:user_id/entitlement` - entitlement check
//! - `GET /health` - liveness

pub mod dto;
pub mod handlers;
pub mod routes;

pub use dto::*;
pub use handlers::ReconcilerAppState;
pub use routes::reconciler_router;
