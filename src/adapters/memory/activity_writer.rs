//! In-memory activity sink.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::billing::{Activity, ActivityVerb};
use crate::domain::foundation::DomainError;
use crate::ports::ActivityWriter;

#[derive(Debug, Clone, Default)]
pub struct InMemoryActivityWriter {
    activities: Arc<RwLock<Vec<Activity>>>,
    fail: Arc<RwLock<bool>>,
}

impl InMemoryActivityWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn activities(&self) -> Vec<Activity> {
        self.activities.read().await.clone()
    }

    pub async fn count_verb(&self, verb: ActivityVerb) -> usize {
        self.activities
            .read()
            .await
            .iter()
            .filter(|a| a.verb == verb)
            .count()
    }

    pub async fn fail_writes(&self) {
        *self.fail.write().await = true;
    }
}

#[async_trait]
impl ActivityWriter for InMemoryActivityWriter {
    async fn write(&self, activity: Activity) -> Result<(), DomainError> {
        if *self.fail.read().await {
            return Err(DomainError::new(
                crate::domain::foundation::ErrorCode::ActivityError,
                "activity sink unavailable",
            ));
        }
        self.activities.write().await.push(activity);
        Ok(())
    }
}
