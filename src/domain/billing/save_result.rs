//! Outcome of the atomic status + snapshot write.

use super::status::SubscriptionStatus;

/// Per-document outcome of `save_atomic`.
///
/// The two flags are independent: a conflict on one document must be
/// distinguishable from a total failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtomicSaveResult {
    pub status_saved: bool,
    pub snapshot_saved: bool,
    /// HTTP-style code reported by the store (200, 409, 503, ...).
    pub provider_code: u16,
    pub error_detail: Option<String>,
    pub status_etag: Option<String>,
    pub snapshot_etag: Option<String>,
}

impl AtomicSaveResult {
    pub fn committed(status_etag: impl Into<String>, snapshot_etag: impl Into<String>) -> Self {
        Self {
            status_saved: true,
            snapshot_saved: true,
            provider_code: 200,
            error_detail: None,
            status_etag: Some(status_etag.into()),
            snapshot_etag: Some(snapshot_etag.into()),
        }
    }

    /// Neither document was written.
    pub fn failed(provider_code: u16, detail: impl Into<String>) -> Self {
        Self {
            status_saved: false,
            snapshot_saved: false,
            provider_code,
            error_detail: Some(detail.into()),
            status_etag: None,
            snapshot_etag: None,
        }
    }

    /// Both documents were written.
    pub fn is_committed(&self) -> bool {
        self.status_saved && self.snapshot_saved
    }

    /// Converts a fully committed result into the token post-commit hooks require.
    ///
    /// Any other outcome is handed back unchanged.
    pub fn into_commit(
        self,
        mut status: SubscriptionStatus,
        previous: Option<SubscriptionStatus>,
    ) -> Result<CommittedStatus, AtomicSaveResult> {
        if !self.is_committed() {
            return Err(self);
        }
        status.etag = self.status_etag;
        Ok(CommittedStatus { status, previous })
    }
}

/// Proof that a status revision and its snapshot were both persisted.
///
/// Only obtainable from [`AtomicSaveResult::into_commit`].
#[derive(Debug, Clone)]
pub struct CommittedStatus {
    status: SubscriptionStatus,
    previous: Option<SubscriptionStatus>,
}

impl CommittedStatus {
    pub fn status(&self) -> &SubscriptionStatus {
        &self.status
    }

    /// Latest revision read before this write, if any.
    pub fn previous(&self) -> Option<&SubscriptionStatus> {
        self.previous.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::billing::{LogicalState, StatusTransition};
    use crate::domain::foundation::{Timestamp, UserId};

    fn status() -> SubscriptionStatus {
        SubscriptionStatus::record(
            UserId::unknown(),
            StatusTransition {
                subscription_id: None,
                payment_id: None,
                is_active: false,
                logical_state: LogicalState::Unknown,
                period: None,
            },
            Timestamp::now(),
        )
    }

    #[test]
    fn committed_result_yields_token_with_etag() {
        let result = AtomicSaveResult::committed("etag-s", "etag-n");
        let committed = result.into_commit(status(), None).unwrap();
        assert_eq!(committed.status().etag.as_deref(), Some("etag-s"));
        assert!(committed.previous().is_none());
    }

    #[test]
    fn partial_result_is_not_committed() {
        let partial = AtomicSaveResult {
            status_saved: true,
            snapshot_saved: false,
            provider_code: 409,
            error_detail: Some("duplicate snapshot".to_string()),
            status_etag: Some("etag-s".to_string()),
            snapshot_etag: None,
        };

        assert!(!partial.is_committed());
        let back = partial.clone().into_commit(status(), None).unwrap_err();
        assert_eq!(back, partial);
    }

    #[test]
    fn failed_result_reports_code_and_detail() {
        let failed = AtomicSaveResult::failed(503, "pool timed out");
        assert!(!failed.status_saved);
        assert!(!failed.snapshot_saved);
        assert_eq!(failed.provider_code, 503);
        assert_eq!(failed.error_detail.as_deref(), Some("pool timed out"));
    }
}
