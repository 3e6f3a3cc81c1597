//! Axum router configuration for reconciliation endpoints.

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{get_entitlement, handle_stripe_webhook, health, ReconcilerAppState};

/// Routes mounted under `/internal`.
///
/// The webhook route carries no caller auth; it is verified by signature.
pub fn internal_routes() -> Router<ReconcilerAppState> {
    Router::new()
        .route("/stripe/webhook", post(handle_stripe_webhook))
        .route("/subscriptions/:user_id/entitlement", get(get_entitlement))
}

/// Complete router with state attached.
pub fn reconciler_router(state: ReconcilerAppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/internal", internal_routes())
        .with_state(state)
}
