//! PostgreSQL implementation of SubscriptionStateStore.
//!
//! `subscription_status` and `subscription_snapshot` are both keyed by
//! `user_id`; the atomic pair is one transaction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::domain::billing::{
    AtomicSaveResult, AuditSnapshot, JournalEntry, LogicalState, SubscriptionStatus,
};
use crate::domain::foundation::{
    DomainError, ErrorCode, SnapshotId, StatusId, Timestamp, UserId,
};
use crate::ports::SubscriptionStateStore;

const UNIQUE_VIOLATION: &str = "23505";

pub struct PostgresSubscriptionStateStore {
    pool: PgPool,
}

impl PostgresSubscriptionStateStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of a status revision.
#[derive(Debug, sqlx::FromRow)]
struct StatusRow {
    id: Uuid,
    user_id: Uuid,
    subscription_id: Option<String>,
    is_active: bool,
    payment_id: Option<String>,
    logical_state: String,
    current_period_start: Option<DateTime<Utc>>,
    current_period_end: Option<DateTime<Utc>>,
    recorded_at: DateTime<Utc>,
    etag: String,
}

impl From<StatusRow> for SubscriptionStatus {
    fn from(row: StatusRow) -> Self {
        SubscriptionStatus {
            id: StatusId::from_uuid(row.id),
            user_id: UserId::from_uuid(row.user_id),
            subscription_id: row.subscription_id,
            is_active: row.is_active,
            payment_id: row.payment_id,
            logical_state: LogicalState::from(row.logical_state),
            current_period_start: row.current_period_start.map(Timestamp::from_datetime),
            current_period_end: row.current_period_end.map(Timestamp::from_datetime),
            recorded_at: Timestamp::from_datetime(row.recorded_at),
            etag: Some(row.etag),
        }
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .and_then(|db| db.code())
        .map_or(false, |code| code == UNIQUE_VIOLATION)
}

/// Failed insert inside the atomic pair; the transaction is rolled back on drop.
fn failed_write(document: &str, err: &sqlx::Error) -> AtomicSaveResult {
    let code = if is_unique_violation(err) { 409 } else { 500 };
    AtomicSaveResult::failed(code, format!("{} write failed: {}", document, err))
}

async fn insert_status(
    tx: &mut Transaction<'_, Postgres>,
    status: &SubscriptionStatus,
    etag: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO subscription_status (
            id, user_id, subscription_id, is_active, payment_id, logical_state,
            current_period_start, current_period_end, recorded_at, etag
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        "#,
    )
    .bind(status.id.as_uuid())
    .bind(status.user_id.as_uuid())
    .bind(&status.subscription_id)
    .bind(status.is_active)
    .bind(&status.payment_id)
    .bind(status.logical_state.as_str())
    .bind(status.current_period_start.map(|t| *t.as_datetime()))
    .bind(status.current_period_end.map(|t| *t.as_datetime()))
    .bind(status.recorded_at.as_datetime())
    .bind(etag)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

async fn insert_snapshot<'e, E>(executor: E, snapshot: &AuditSnapshot, etag: &str) -> Result<(), sqlx::Error>
where
    E: sqlx::Executor<'e, Database = Postgres>,
{
    sqlx::query(
        r#"
        INSERT INTO subscription_snapshot (
            id, user_id, status_id, kind, external_id, event_id, raw_json, recorded_at, etag
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        "#,
    )
    .bind(snapshot.id.as_uuid())
    .bind(snapshot.user_id.as_uuid())
    .bind(snapshot.status_id.as_uuid())
    .bind(snapshot.kind.as_str())
    .bind(&snapshot.external_id)
    .bind(&snapshot.event_id)
    .bind(&snapshot.raw_json)
    .bind(snapshot.recorded_at.as_datetime())
    .bind(etag)
    .execute(executor)
    .await?;
    Ok(())
}

#[async_trait]
impl SubscriptionStateStore for PostgresSubscriptionStateStore {
    async fn save_atomic(&self, status: &SubscriptionStatus, entry: JournalEntry) -> AtomicSaveResult {
        let snapshot = AuditSnapshot::capture(status.user_id, status.id, entry, Timestamp::now());
        let status_etag = Uuid::new_v4().to_string();
        let snapshot_etag = Uuid::new_v4().to_string();

        let mut tx = match self.pool.begin().await {
            Ok(tx) => tx,
            Err(e) => return AtomicSaveResult::failed(503, e.to_string()),
        };

        if let Err(e) = insert_status(&mut tx, status, &status_etag).await {
            return failed_write("status", &e);
        }

        if let Err(e) = insert_snapshot(&mut *tx, &snapshot, &snapshot_etag).await {
            return failed_write("snapshot", &e);
        }

        match tx.commit().await {
            Ok(()) => AtomicSaveResult::committed(status_etag, snapshot_etag),
            Err(e) => AtomicSaveResult::failed(503, format!("commit failed: {}", e)),
        }
    }

    async fn save_snapshot(
        &self,
        user_id: UserId,
        status_id: StatusId,
        entry: JournalEntry,
    ) -> Result<SnapshotId, DomainError> {
        let snapshot = AuditSnapshot::capture(user_id, status_id, entry, Timestamp::now());
        let etag = Uuid::new_v4().to_string();

        insert_snapshot(&self.pool, &snapshot, &etag)
            .await
            .map_err(|e| {
                let code = if is_unique_violation(&e) {
                    ErrorCode::Conflict
                } else {
                    ErrorCode::DatabaseError
                };
                DomainError::new(code, format!("Failed to save snapshot: {}", e))
            })?;

        Ok(snapshot.id)
    }

    async fn get_latest_details(
        &self,
        user_id: UserId,
    ) -> Result<Option<SubscriptionStatus>, DomainError> {
        let row: Option<StatusRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, subscription_id, is_active, payment_id, logical_state,
                   current_period_start, current_period_end, recorded_at, etag
            FROM subscription_status
            WHERE user_id = $1
            ORDER BY seq DESC
            LIMIT 1
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to fetch status: {}", e)))?;

        Ok(row.map(SubscriptionStatus::from))
    }

    async fn has_processed_event(&self, user_id: UserId, event_id: &str) -> Result<bool, DomainError> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM subscription_snapshot WHERE user_id = $1 AND event_id = $2)",
        )
        .bind(user_id.as_uuid())
        .bind(event_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to check event: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_row_maps_to_domain() {
        let id = Uuid::new_v4();
        let user = Uuid::new_v4();
        let now = Utc::now();
        let row = StatusRow {
            id,
            user_id: user,
            subscription_id: Some("sub_1".to_string()),
            is_active: true,
            payment_id: None,
            logical_state: "payment succeeded".to_string(),
            current_period_start: Some(now),
            current_period_end: None,
            recorded_at: now,
            etag: "e1".to_string(),
        };

        let status = SubscriptionStatus::from(row);

        assert_eq!(status.id, StatusId::from_uuid(id));
        assert_eq!(status.user_id, UserId::from_uuid(user));
        assert_eq!(status.logical_state, LogicalState::PaymentSucceeded);
        assert_eq!(status.current_period_start, Some(Timestamp::from_datetime(now)));
        assert_eq!(status.etag.as_deref(), Some("e1"));
    }

    #[test]
    fn non_database_errors_are_not_unique_violations() {
        assert!(!is_unique_violation(&sqlx::Error::RowNotFound));
        let result = failed_write("status", &sqlx::Error::PoolTimedOut);
        assert_eq!(result.provider_code, 500);
        assert!(result.error_detail.unwrap().starts_with("status write failed"));
    }

    // Integration tests require a running PostgreSQL instance; the
    // in-memory store covers the port contract in unit tests.
}
