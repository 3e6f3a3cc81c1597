//! Human-readable audit activities emitted after committed transitions.

use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::domain::foundation::{Timestamp, UserId};

use super::save_result::CommittedStatus;
use super::status::SubscriptionStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityVerb {
    Subscribed,
    Canceled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Importance {
    Normal,
    Important,
}

/// Activity record handed to the sink, fire-and-forget.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub actor: UserId,
    pub verb: ActivityVerb,
    pub object_type: String,
    pub object_id: String,
    pub message_key: String,
    pub owner_user_id: UserId,
    pub message_args: Map<String, Value>,
    pub service: String,
    pub importance: Importance,
    pub tags: Vec<String>,
    pub before: Option<Value>,
    pub after: Option<Value>,
    pub occurred_at: Timestamp,
}

impl Activity {
    /// Entitlement granted by a completed checkout.
    pub fn subscribed(
        committed: &CommittedStatus,
        plan: &str,
        amount: f64,
        service: &str,
    ) -> Self {
        let mut args = Map::new();
        args.insert("plan".to_string(), json!(plan));
        args.insert("amount".to_string(), json!(amount));

        Self::from_commit(
            committed,
            ActivityVerb::Subscribed,
            "subscription.created",
            args,
            service,
            &["stripe", "checkout"],
        )
    }

    /// Entitlement revoked (cancellation, deletion, refund).
    pub fn canceled(committed: &CommittedStatus, service: &str) -> Self {
        Self::from_commit(
            committed,
            ActivityVerb::Canceled,
            "subscription.canceled",
            Map::new(),
            service,
            &["stripe", "subscription"],
        )
    }

    fn from_commit(
        committed: &CommittedStatus,
        verb: ActivityVerb,
        message_key: &str,
        message_args: Map<String, Value>,
        service: &str,
        tags: &[&str],
    ) -> Self {
        let status = committed.status();
        Self {
            actor: status.user_id,
            verb,
            object_type: "subscription".to_string(),
            object_id: status.id.to_string(),
            message_key: message_key.to_string(),
            owner_user_id: status.user_id,
            message_args,
            service: service.to_string(),
            importance: Importance::Important,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            before: committed.previous().map(state_summary),
            after: Some(state_summary(status)),
            occurred_at: Timestamp::now(),
        }
    }
}

fn state_summary(status: &SubscriptionStatus) -> Value {
    json!({
        "isActive": status.is_active,
        "logicalState": status.logical_state.as_str(),
        "start": status.current_period_start,
        "end": status.current_period_end,
    })
}
