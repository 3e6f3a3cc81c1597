//! Foundation module - Shared domain primitives.
//!
//! Identifiers, time, and the error vocabulary used by every other layer.

mod errors;
mod ids;
mod timestamp;

pub use errors::{DomainError, ErrorCode};
pub use ids::{SnapshotId, StatusId, UserId};
pub use timestamp::Timestamp;
