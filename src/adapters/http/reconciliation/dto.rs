//! HTTP DTOs for reconciliation endpoints.

use serde::Serialize;

use crate::application::{EntitlementSource, EntitlementView};

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Acknowledgement returned for every verified delivery.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookAckResponse {
    pub received: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct EntitlementResponse {
    pub user_id: String,
    pub is_active: bool,
    pub source: EntitlementSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logical_state: Option<String>,
    /// RFC 3339.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_period_end: Option<String>,
}

impl From<EntitlementView> for EntitlementResponse {
    fn from(view: EntitlementView) -> Self {
        Self {
            user_id: view.user_id.to_string(),
            is_active: view.entitled,
            source: view.source,
            logical_state: view.logical_state.map(|s| s.as_str().to_string()),
            current_period_end: view.current_period_end.map(|t| t.as_datetime().to_rfc3339()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Response DTO
// ════════════════════════════════════════════════════════════════════════════════

/// Standard error response for API errors.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub error_code: String,
    /// Human-readable error message.
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error_code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_code: error_code.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::billing::LogicalState;
    use crate::domain::foundation::{Timestamp, UserId};

    #[test]
    fn entitlement_response_from_store_view() {
        let user_id: UserId = "55555555-5555-5555-5555-555555555555".parse().unwrap();
        let end = Timestamp::from_unix(1_767_225_600).unwrap();

        let response = EntitlementResponse::from(EntitlementView {
            user_id,
            entitled: true,
            source: EntitlementSource::Store,
            logical_state: Some(LogicalState::PastDue),
            current_period_end: Some(end),
        });

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["user_id"], "55555555-5555-5555-5555-555555555555");
        assert_eq!(json["is_active"], true);
        assert_eq!(json["source"], "store");
        assert_eq!(json["logical_state"], "past_due");
        assert_eq!(json["current_period_end"], "2026-01-01T00:00:00+00:00");
    }

    #[test]
    fn cache_view_omits_details() {
        let response = EntitlementResponse::from(EntitlementView {
            user_id: UserId::unknown(),
            entitled: false,
            source: EntitlementSource::Cache,
            logical_state: None,
            current_period_end: None,
        });

        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("logical_state").is_none());
        assert!(json.get("current_period_end").is_none());
    }
}
