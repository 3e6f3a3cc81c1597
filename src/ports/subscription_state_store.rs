//! State store port: canonical status plus the audit journal.
//!
//! Two logical collections, `subscription-status` and
//! `subscription-snapshot`, both partitioned by user.

use async_trait::async_trait;

use crate::domain::billing::{AtomicSaveResult, JournalEntry, SubscriptionStatus};
use crate::domain::foundation::{DomainError, SnapshotId, StatusId, Timestamp, UserId};

#[async_trait]
pub trait SubscriptionStateStore: Send + Sync {
    /// Writes a status revision and its snapshot in one partition-scoped
    /// transaction. Never errors: transport failures are reported in the result.
    async fn save_atomic(
        &self,
        status: &SubscriptionStatus,
        entry: JournalEntry,
    ) -> AtomicSaveResult;

    /// Journals an informational event without touching canonical status.
    async fn save_snapshot(
        &self,
        user_id: UserId,
        status_id: StatusId,
        entry: JournalEntry,
    ) -> Result<SnapshotId, DomainError>;

    /// Most recent status revision by write order.
    async fn get_latest_details(
        &self,
        user_id: UserId,
    ) -> Result<Option<SubscriptionStatus>, DomainError>;

    /// Whether a snapshot for this provider event id already exists in the partition.
    async fn has_processed_event(
        &self,
        user_id: UserId,
        event_id: &str,
    ) -> Result<bool, DomainError>;

    /// Entitlement of the latest revision with the period-end override applied.
    async fn get_latest_status(
        &self,
        user_id: UserId,
        now: Timestamp,
    ) -> Result<Option<bool>, DomainError> {
        Ok(self
            .get_latest_details(user_id)
            .await?
            .map(|status| status.is_entitled_at(now)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscription_state_store_is_object_safe() {
        fn _accepts_dyn(_: &dyn SubscriptionStateStore) {}
    }
}
