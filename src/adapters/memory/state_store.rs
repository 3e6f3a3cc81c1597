//! In-memory subscription state store.
//!
//! Partitions by user like the real store, enforces the per-partition
//! event-id uniqueness, and lets tests inject write failures.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::billing::{AtomicSaveResult, AuditSnapshot, JournalEntry, SubscriptionStatus};
use crate::domain::foundation::{
    DomainError, ErrorCode, SnapshotId, StatusId, Timestamp, UserId,
};
use crate::ports::SubscriptionStateStore;

/// Failure modes a test can force on `save_atomic`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreFault {
    /// Nothing written, 503.
    Unavailable,
    /// Status durable but snapshot lost, as a non-transactional backend might report.
    SnapshotLost,
}

#[derive(Debug, Default)]
struct Partition {
    statuses: Vec<SubscriptionStatus>,
    snapshots: Vec<AuditSnapshot>,
}

#[derive(Debug, Default)]
struct StoreState {
    partitions: HashMap<UserId, Partition>,
    next_etag: u64,
    atomic_fault: Option<StoreFault>,
    fail_snapshots: bool,
    fail_reads: bool,
}

impl StoreState {
    fn etag(&mut self) -> String {
        self.next_etag += 1;
        format!("\"{:08x}\"", self.next_etag)
    }
}

/// In-memory store for tests and local development.
#[derive(Debug, Clone, Default)]
pub struct InMemorySubscriptionStateStore {
    state: Arc<RwLock<StoreState>>,
}

impl InMemorySubscriptionStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forces every subsequent `save_atomic` to fail with `fault`.
    pub async fn fail_atomic_saves(&self, fault: StoreFault) {
        self.state.write().await.atomic_fault = Some(fault);
    }

    /// Forces every subsequent `save_snapshot` to fail.
    pub async fn fail_snapshot_saves(&self) {
        self.state.write().await.fail_snapshots = true;
    }

    /// Forces every subsequent read to fail.
    pub async fn fail_reads(&self) {
        self.state.write().await.fail_reads = true;
    }

    pub async fn clear_faults(&self) {
        let mut state = self.state.write().await;
        state.atomic_fault = None;
        state.fail_snapshots = false;
        state.fail_reads = false;
    }

    /// All status revisions for a user, oldest first.
    pub async fn statuses_for(&self, user_id: UserId) -> Vec<SubscriptionStatus> {
        self.state
            .read()
            .await
            .partitions
            .get(&user_id)
            .map(|p| p.statuses.clone())
            .unwrap_or_default()
    }

    /// All snapshots for a user, oldest first.
    pub async fn snapshots_for(&self, user_id: UserId) -> Vec<AuditSnapshot> {
        self.state
            .read()
            .await
            .partitions
            .get(&user_id)
            .map(|p| p.snapshots.clone())
            .unwrap_or_default()
    }

    pub async fn status_count(&self) -> usize {
        self.state
            .read()
            .await
            .partitions
            .values()
            .map(|p| p.statuses.len())
            .sum()
    }

    pub async fn snapshot_count(&self) -> usize {
        self.state
            .read()
            .await
            .partitions
            .values()
            .map(|p| p.snapshots.len())
            .sum()
    }
}

#[async_trait]
impl SubscriptionStateStore for InMemorySubscriptionStateStore {
    async fn save_atomic(&self, status: &SubscriptionStatus, entry: JournalEntry) -> AtomicSaveResult {
        let mut state = self.state.write().await;

        let fault = state.atomic_fault;
        match fault {
            Some(StoreFault::Unavailable) => {
                return AtomicSaveResult::failed(503, "store unavailable");
            }
            Some(StoreFault::SnapshotLost) => {
                let etag = state.etag();
                let mut stored = status.clone();
                stored.etag = Some(etag.clone());
                state
                    .partitions
                    .entry(status.user_id)
                    .or_default()
                    .statuses
                    .push(stored);
                return AtomicSaveResult {
                    status_saved: true,
                    snapshot_saved: false,
                    provider_code: 207,
                    error_detail: Some("snapshot write lost".to_string()),
                    status_etag: Some(etag),
                    snapshot_etag: None,
                };
            }
            None => {}
        }

        let duplicate = state
            .partitions
            .get(&status.user_id)
            .map_or(false, |p| p.snapshots.iter().any(|s| s.event_id == entry.event_id));
        if duplicate {
            return AtomicSaveResult::failed(
                409,
                format!("snapshot for event {} already exists", entry.event_id),
            );
        }

        let status_etag = state.etag();
        let snapshot_etag = state.etag();

        let mut stored_status = status.clone();
        stored_status.etag = Some(status_etag.clone());
        let mut snapshot = AuditSnapshot::capture(status.user_id, status.id, entry, Timestamp::now());
        snapshot.etag = Some(snapshot_etag.clone());

        let partition = state.partitions.entry(status.user_id).or_default();
        partition.statuses.push(stored_status);
        partition.snapshots.push(snapshot);

        AtomicSaveResult::committed(status_etag, snapshot_etag)
    }

    async fn save_snapshot(
        &self,
        user_id: UserId,
        status_id: StatusId,
        entry: JournalEntry,
    ) -> Result<SnapshotId, DomainError> {
        let mut state = self.state.write().await;
        if state.fail_snapshots {
            return Err(DomainError::database("snapshot write failed"));
        }

        let duplicate = state
            .partitions
            .get(&user_id)
            .map_or(false, |p| p.snapshots.iter().any(|s| s.event_id == entry.event_id));
        if duplicate {
            return Err(DomainError::new(
                ErrorCode::Conflict,
                format!("snapshot for event {} already exists", entry.event_id),
            ));
        }

        let etag = state.etag();
        let mut snapshot = AuditSnapshot::capture(user_id, status_id, entry, Timestamp::now());
        snapshot.etag = Some(etag);
        let id = snapshot.id;
        state.partitions.entry(user_id).or_default().snapshots.push(snapshot);
        Ok(id)
    }

    async fn get_latest_details(
        &self,
        user_id: UserId,
    ) -> Result<Option<SubscriptionStatus>, DomainError> {
        let state = self.state.read().await;
        if state.fail_reads {
            return Err(DomainError::database("read failed"));
        }
        Ok(state
            .partitions
            .get(&user_id)
            .and_then(|p| p.statuses.last().cloned()))
    }

    async fn has_processed_event(&self, user_id: UserId, event_id: &str) -> Result<bool, DomainError> {
        let state = self.state.read().await;
        if state.fail_reads {
            return Err(DomainError::database("read failed"));
        }
        Ok(state
            .partitions
            .get(&user_id)
            .map_or(false, |p| p.snapshots.iter().any(|s| s.event_id == event_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::billing::{BillingPeriod, LogicalState, SnapshotKind, StatusTransition};

    fn user() -> UserId {
        "11111111-1111-1111-1111-111111111111".parse().unwrap()
    }

    fn status(is_active: bool, end: Option<Timestamp>) -> SubscriptionStatus {
        SubscriptionStatus::record(
            user(),
            StatusTransition {
                subscription_id: Some("sub_1".to_string()),
                payment_id: None,
                is_active,
                logical_state: LogicalState::Active,
                period: end.map(|end| BillingPeriod {
                    start: end.add_days(-30),
                    end,
                }),
            },
            Timestamp::now(),
        )
    }

    fn entry(event_id: &str) -> JournalEntry {
        JournalEntry {
            kind: SnapshotKind::subscription_change("updated", "active"),
            external_id: "sub_1".to_string(),
            event_id: event_id.to_string(),
            raw_json: "{}".to_string(),
        }
    }

    // ══════════════════════════════════════════════════════════════
    // Atomic Save Tests
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn atomic_save_writes_both_documents() {
        let store = InMemorySubscriptionStateStore::new();
        let s = status(true, None);

        let result = store.save_atomic(&s, entry("evt_1")).await;

        assert!(result.is_committed());
        assert_eq!(result.provider_code, 200);
        assert_eq!(store.statuses_for(user()).await.len(), 1);
        let snapshots = store.snapshots_for(user()).await;
        assert_eq!(snapshots.len(), 1);
        assert_eq!(snapshots[0].status_id, s.id);
    }

    #[tokio::test]
    async fn duplicate_event_rolls_back_both_documents() {
        let store = InMemorySubscriptionStateStore::new();
        store.save_atomic(&status(true, None), entry("evt_1")).await;

        let result = store.save_atomic(&status(false, None), entry("evt_1")).await;

        assert!(!result.status_saved);
        assert!(!result.snapshot_saved);
        assert_eq!(result.provider_code, 409);
        assert_eq!(store.status_count().await, 1);
        assert_eq!(store.snapshot_count().await, 1);
    }

    #[tokio::test]
    async fn unavailable_fault_writes_nothing() {
        let store = InMemorySubscriptionStateStore::new();
        store.fail_atomic_saves(StoreFault::Unavailable).await;

        let result = store.save_atomic(&status(true, None), entry("evt_1")).await;

        assert_eq!(result.provider_code, 503);
        assert_eq!(store.status_count().await, 0);
        assert_eq!(store.snapshot_count().await, 0);
    }

    #[tokio::test]
    async fn snapshot_lost_fault_reports_partial_outcome() {
        let store = InMemorySubscriptionStateStore::new();
        store.fail_atomic_saves(StoreFault::SnapshotLost).await;

        let result = store.save_atomic(&status(true, None), entry("evt_1")).await;

        assert!(result.status_saved);
        assert!(!result.snapshot_saved);
        assert!(!result.is_committed());
    }

    // ══════════════════════════════════════════════════════════════
    // Read Tests
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn latest_details_is_last_write() {
        let store = InMemorySubscriptionStateStore::new();
        store.save_atomic(&status(true, None), entry("evt_1")).await;
        let second = status(false, None);
        store.save_atomic(&second, entry("evt_2")).await;

        let latest = store.get_latest_details(user()).await.unwrap().unwrap();

        assert_eq!(latest.id, second.id);
        assert!(latest.etag.is_some());
    }

    #[tokio::test]
    async fn latest_status_applies_period_override() {
        let store = InMemorySubscriptionStateStore::new();
        let expired = status(true, Some(Timestamp::now().add_days(-1)));
        store.save_atomic(&expired, entry("evt_1")).await;

        let entitled = store.get_latest_status(user(), Timestamp::now()).await.unwrap();

        assert_eq!(entitled, Some(false));
    }

    #[tokio::test]
    async fn unknown_user_has_no_status() {
        let store = InMemorySubscriptionStateStore::new();
        assert!(store.get_latest_details(user()).await.unwrap().is_none());
        assert!(store.get_latest_status(user(), Timestamp::now()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn has_processed_event_sees_both_write_paths() {
        let store = InMemorySubscriptionStateStore::new();
        store.save_atomic(&status(true, None), entry("evt_1")).await;
        store.save_snapshot(user(), StatusId::nil(), entry("evt_2")).await.unwrap();

        assert!(store.has_processed_event(user(), "evt_1").await.unwrap());
        assert!(store.has_processed_event(user(), "evt_2").await.unwrap());
        assert!(!store.has_processed_event(user(), "evt_3").await.unwrap());
        assert!(!store
            .has_processed_event(UserId::unknown(), "evt_1")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn snapshot_only_leaves_status_untouched() {
        let store = InMemorySubscriptionStateStore::new();

        store.save_snapshot(user(), StatusId::nil(), entry("evt_1")).await.unwrap();

        assert_eq!(store.status_count().await, 0);
        assert_eq!(store.snapshot_count().await, 1);
    }

    #[tokio::test]
    async fn read_fault_surfaces_error() {
        let store = InMemorySubscriptionStateStore::new();
        store.fail_reads().await;
        assert!(store.get_latest_details(user()).await.is_err());
        store.clear_faults().await;
        assert!(store.get_latest_details(user()).await.is_ok());
    }
}
