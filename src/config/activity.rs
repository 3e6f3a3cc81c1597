//! Activity sink configuration

use serde::Deserialize;

use super::error::ValidationError;
use crate::application::handlers::reconciliation::DEFAULT_SERVICE_NAME;

/// Where audit activities go and how they are labeled
#[derive(Debug, Clone, Deserialize)]
pub struct ActivityConfig {
    /// Redis pub/sub channel activities are published on
    #[serde(default = "default_channel")]
    pub channel: String,

    /// `service` field stamped on every activity
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

impl ActivityConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.channel.trim().is_empty() || self.channel.contains(char::is_whitespace) {
            return Err(ValidationError::InvalidActivityChannel);
        }
        if self.service_name.trim().is_empty() {
            return Err(ValidationError::MissingRequired("ACTIVITY_SERVICE_NAME"));
        }
        Ok(())
    }
}

impl Default for ActivityConfig {
    fn default() -> Self {
        Self {
            channel: default_channel(),
            service_name: default_service_name(),
        }
    }
}

fn default_channel() -> String {
    "activities".to_string()
}

fn default_service_name() -> String {
    DEFAULT_SERVICE_NAME.to_string()
}
