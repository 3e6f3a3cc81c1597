//! Activity sink that publishes JSON activities on a Redis channel.

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;

use crate::domain::billing::Activity;
use crate::domain::foundation::{DomainError, ErrorCode};
use crate::ports::ActivityWriter;

#[derive(Clone)]
pub struct RedisActivityPublisher {
    conn: MultiplexedConnection,
    channel: String,
}

impl RedisActivityPublisher {
    pub fn new(conn: MultiplexedConnection, channel: impl Into<String>) -> Self {
        Self {
            conn,
            channel: channel.into(),
        }
    }
}

impl std::fmt::Debug for RedisActivityPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisActivityPublisher")
            .field("channel", &self.channel)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ActivityWriter for RedisActivityPublisher {
    async fn write(&self, activity: Activity) -> Result<(), DomainError> {
        let payload = serde_json::to_string(&activity)
            .map_err(|e| DomainError::new(ErrorCode::ActivityError, e.to_string()))?;
        let mut conn = self.conn.clone();

        let receivers: i64 = conn
            .publish(&self.channel, payload)
            .await
            .map_err(|e: redis::RedisError| DomainError::new(ErrorCode::ActivityError, e.to_string()))?;

        tracing::debug!(
            channel = %self.channel,
            receivers,
            verb = ?activity.verb,
            "Activity published"
        );
        Ok(())
    }
}
