use serde::{Deserialize, Serialize};

use crate::db::models::DEFAULT_SPACE_ID;
use crate::services::sync_service::SyncError;

pub const MONITOR_ID_MAX_LENGTH: usize = 1024;

// Path parameters shared by the default and the space scoped monitor routes
#[derive(Deserialize, Debug, Clone)]
pub struct MonitorPathParams {
    #[serde(default)]
    pub space_id: Option<String>,
    pub monitor_id: String,
}

impl MonitorPathParams {
    pub fn space_id(&self) -> &str {
        self.space_id.as_deref().unwrap_or(DEFAULT_SPACE_ID)
    }

    pub fn validate(&self) -> Result<(), String> {
        let length = self.monitor_id.chars().count();
        if length == 0 || length > MONITOR_ID_MAX_LENGTH {
            return Err(format!(
                "monitorId must be between 1 and {MONITOR_ID_MAX_LENGTH} characters, got {length}"
            ));
        }
        Ok(())
    }
}

#[derive(Serialize, Debug, Clone)]
pub struct SyncErrorAttributes {
    pub errors: Vec<SyncError>,
}

// Body returned when the store deletion succeeded but the sync service reported errors
#[derive(Serialize, Debug, Clone)]
pub struct PartialSyncFailureResponse {
    pub message: String,
    pub attributes: SyncErrorAttributes,
}

impl PartialSyncFailureResponse {
    pub fn new(errors: Vec<SyncError>) -> Self {
        Self {
            message: "error pushing monitor to the service".to_string(),
            attributes: SyncErrorAttributes { errors },
        }
    }
}
