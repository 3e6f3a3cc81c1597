//! HTTP adapters - REST API implementations.

pub mod reconciliation;

pub use reconciliation::{reconciler_router, ReconcilerAppState};
