//! The reconciler's own vocabulary for subscription condition.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Logical state derived from (not identical to) the provider's raw status.
///
/// Stored and serialized as its string form. Provider statuses outside the
/// known vocabulary are preserved verbatim in `Provider`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LogicalState {
    Active,
    Trialing,
    TrialBlocked,
    PastDue,
    Incomplete,
    IncompleteExpired,
    Unpaid,
    Canceled,
    Paused,
    PaymentSucceeded,
    ChargeRefunded,
    Unknown,
    Provider(String),
}

impl LogicalState {
    pub fn as_str(&self) -> &str {
        match self {
            LogicalState::Active => "active",
            LogicalState::Trialing => "trialing",
            LogicalState::TrialBlocked => "trial_blocked",
            LogicalState::PastDue => "past_due",
            LogicalState::Incomplete => "incomplete",
            LogicalState::IncompleteExpired => "incomplete_expired",
            LogicalState::Unpaid => "unpaid",
            LogicalState::Canceled => "canceled",
            LogicalState::Paused => "paused",
            LogicalState::PaymentSucceeded => "payment succeeded",
            LogicalState::ChargeRefunded => "charge refunded",
            LogicalState::Unknown => "unknown",
            LogicalState::Provider(raw) => raw,
        }
    }
}

impl From<&str> for LogicalState {
    fn from(s: &str) -> Self {
        match s {
            "active" => LogicalState::Active,
            "trialing" => LogicalState::Trialing,
            "trial_blocked" => LogicalState::TrialBlocked,
            "past_due" => LogicalState::PastDue,
            "incomplete" => LogicalState::Incomplete,
            "incomplete_expired" => LogicalState::IncompleteExpired,
            "unpaid" => LogicalState::Unpaid,
            "canceled" => LogicalState::Canceled,
            "paused" => LogicalState::Paused,
            "payment succeeded" => LogicalState::PaymentSucceeded,
            "charge refunded" => LogicalState::ChargeRefunded,
            "unknown" => LogicalState::Unknown,
            other => LogicalState::Provider(other.to_string()),
        }
    }
}

impl From<String> for LogicalState {
    fn from(s: String) -> Self {
        LogicalState::from(s.as_str())
    }
}

impl From<LogicalState> for String {
    fn from(state: LogicalState) -> Self {
        state.as_str().to_string()
    }
}

impl fmt::Display for LogicalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
