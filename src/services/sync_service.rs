//! Propagation of monitor changes to the remote service that schedules and runs them.
//!
//! The service is reached through one endpoint per location. A failure at a single
//! location does not fail the whole call; it is reported back as a [`SyncError`] so
//! callers can decide how to surface it.

use async_trait::async_trait;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

/// A location that failed to apply a sync request.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SyncError {
    pub target: String,
    pub error: String,
}

impl SyncError {
    pub fn new(target: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            error: error.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum SyncServiceError {
    #[error("Failed to build sync request: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),
    #[error("Sync service failure: {0}")]
    Service(String),
}

/// Monitor as sent to the sync service: the flattened configuration keyed by the
/// monitor's query id.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct SyncMonitor {
    pub id: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl SyncMonitor {
    pub fn new(query_id: impl Into<String>, mut fields: Map<String, Value>) -> Self {
        fields.remove("id");
        Self {
            id: query_id.into(),
            fields,
        }
    }

    /// Whether the monitor is scheduled on `location_id`.
    pub fn runs_in(&self, location_id: &str) -> bool {
        self.fields
            .get("locations")
            .and_then(Value::as_array)
            .is_some_and(|locations| {
                locations
                    .iter()
                    .any(|location| location.as_str() == Some(location_id))
            })
    }
}

#[async_trait]
pub trait MonitorSyncService: Send + Sync {
    /// Removes `monitors` from the service. Returns the per-location failures; an
    /// empty list means every location applied the deletion.
    async fn delete_monitors(
        &self,
        monitors: Vec<SyncMonitor>,
        space_id: &str,
    ) -> Result<Vec<SyncError>, SyncServiceError>;
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ServiceLocation {
    pub id: String,
    pub url: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ServicePayload<'a> {
    monitors: Vec<&'a SyncMonitor>,
    space_id: &'a str,
    stack_version: &'a str,
}

/// HTTP client for the sync service.
pub struct ServiceApiClient {
    http: reqwest::Client,
    locations: Vec<ServiceLocation>,
    stack_version: String,
}

impl ServiceApiClient {
    pub fn new(
        locations: Vec<ServiceLocation>,
        stack_version: impl Into<String>,
    ) -> Result<Self, SyncServiceError> {
        let stack_version = stack_version.into();
        let http = reqwest::Client::builder()
            .user_agent(format!("synthetics-server/{stack_version}"))
            .build()?;
        Ok(Self {
            http,
            locations,
            stack_version,
        })
    }

    pub fn locations(&self) -> &[ServiceLocation] {
        &self.locations
    }

    async fn send_delete(
        &self,
        location: &ServiceLocation,
        payload: Value,
    ) -> Result<(), SyncError> {
        let url = format!("{}/monitors", location.url.trim_end_matches('/'));
        let response = self
            .http
            .delete(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| SyncError::new(&location.id, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let reason = if body.is_empty() {
                status.to_string()
            } else {
                format!("{status}: {body}")
            };
            return Err(SyncError::new(&location.id, reason));
        }

        debug!(location = %location.id, "Sync service accepted monitor deletion.");
        Ok(())
    }
}

#[async_trait]
impl MonitorSyncService for ServiceApiClient {
    async fn delete_monitors(
        &self,
        monitors: Vec<SyncMonitor>,
        space_id: &str,
    ) -> Result<Vec<SyncError>, SyncServiceError> {
        let mut requests = Vec::new();
        for location in &self.locations {
            let targeted: Vec<&SyncMonitor> =
                monitors.iter().filter(|m| m.runs_in(&location.id)).collect();
            if targeted.is_empty() {
                continue;
            }
            let payload = serde_json::to_value(ServicePayload {
                monitors: targeted,
                space_id,
                stack_version: &self.stack_version,
            })?;
            requests.push(self.send_delete(location, payload));
        }

        let errors: Vec<SyncError> = join_all(requests)
            .await
            .into_iter()
            .filter_map(Result::err)
            .collect();

        if !errors.is_empty() {
            warn!(
                space_id,
                failed_locations = errors.len(),
                "Sync service did not apply monitor deletion on every location."
            );
        }
        Ok(errors)
    }
}
