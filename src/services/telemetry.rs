//! Usage telemetry for monitor lifecycle events.
//!
//! Producers hand events to a [`TelemetrySink`] and move on; nothing on the request
//! path waits for telemetry. The default sink queues events on a bounded channel and a
//! background reporter writes them out as structured log records.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::db::models::SyntheticsMonitor;
use crate::services::sync_service::SyncError;

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MonitorTelemetryEvent {
    pub stack_version: String,
    /// sha256 of the monitor id, so events can be correlated without exposing ids.
    pub config_id: String,
    pub monitor_type: String,
    pub locations: Vec<String>,
    pub locations_count: usize,
    pub monitor_name_length: usize,
    pub monitor_interval: Option<u64>,
    pub revision: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub script_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<SyncError>>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ErrorTelemetryEvent {
    pub reason: String,
    pub message: String,
    #[serde(rename = "type")]
    pub error_type: String,
    pub code: Option<String>,
    pub status: Option<u16>,
    pub stack_version: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TelemetryEvent {
    Monitor(MonitorTelemetryEvent),
    Error(ErrorTelemetryEvent),
}

pub trait TelemetrySink: Send + Sync {
    fn send_monitor_event(&self, event: MonitorTelemetryEvent);
    fn send_error_event(&self, event: ErrorTelemetryEvent);
}

pub fn hash_config_id(monitor_id: &str) -> String {
    hex::encode(Sha256::digest(monitor_id.as_bytes()))
}

/// Builds the event recorded when a monitor is deleted.
pub fn format_delete_event(
    monitor: &SyntheticsMonitor,
    stack_version: &str,
    deleted_at: DateTime<Utc>,
    is_inline_script: bool,
    errors: &[SyncError],
) -> MonitorTelemetryEvent {
    let attributes = &monitor.attributes;
    let script_type = (attributes.monitor_type == "browser").then(|| {
        let script_type = if is_inline_script { "inline" } else { "project" };
        script_type.to_string()
    });

    MonitorTelemetryEvent {
        stack_version: stack_version.to_string(),
        config_id: hash_config_id(&monitor.id),
        monitor_type: attributes.monitor_type.clone(),
        locations: attributes.locations.clone(),
        locations_count: attributes.locations.len(),
        monitor_name_length: attributes.name.chars().count(),
        monitor_interval: attributes.schedule.interval_ms(),
        revision: attributes.revision,
        script_type,
        deleted_at: Some(deleted_at.to_rfc3339_opts(SecondsFormat::Millis, true)),
        errors: (!errors.is_empty()).then(|| errors.to_vec()),
    }
}

/// Sink that drops everything, used when telemetry is disabled.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTelemetry;

impl TelemetrySink for NoopTelemetry {
    fn send_monitor_event(&self, _event: MonitorTelemetryEvent) {}
    fn send_error_event(&self, _event: ErrorTelemetryEvent) {}
}

/// Queueing sink. Events that do not fit into the queue are dropped.
#[derive(Debug, Clone)]
pub struct TelemetryQueue {
    sender: mpsc::Sender<TelemetryEvent>,
}

impl TelemetryQueue {
    /// Creates the queue and the reporter that drains it.
    pub fn new(capacity: usize) -> (Self, TelemetryReporter) {
        let (sender, receiver) = mpsc::channel(capacity);
        (Self { sender }, TelemetryReporter { receiver })
    }

    fn enqueue(&self, event: TelemetryEvent) {
        if let Err(e) = self.sender.try_send(event) {
            warn!(error = %e, "Dropping telemetry event.");
        }
    }
}

impl TelemetrySink for TelemetryQueue {
    fn send_monitor_event(&self, event: MonitorTelemetryEvent) {
        self.enqueue(TelemetryEvent::Monitor(event));
    }

    fn send_error_event(&self, event: ErrorTelemetryEvent) {
        self.enqueue(TelemetryEvent::Error(event));
    }
}

#[derive(Debug)]
pub struct TelemetryReporter {
    receiver: mpsc::Receiver<TelemetryEvent>,
}

impl TelemetryReporter {
    /// Receives the next queued event, `None` once every queue handle is gone.
    pub async fn next_event(&mut self) -> Option<TelemetryEvent> {
        self.receiver.recv().await
    }

    /// Spawns the background task that reports queued events.
    pub fn run(mut self) {
        tokio::spawn(async move {
            info!("Telemetry reporter started.");
            while let Some(event) = self.next_event().await {
                report(&event);
            }
            info!("Telemetry reporter stopped.");
        });
    }
}

fn report(event: &TelemetryEvent) {
    let (kind, payload) = match event {
        TelemetryEvent::Monitor(e) => ("monitor_update", serde_json::to_string(e)),
        TelemetryEvent::Error(e) => ("error", serde_json::to_string(e)),
    };
    match payload {
        Ok(payload) => info!(target: "telemetry", kind, %payload, "Telemetry event."),
        Err(e) => warn!(kind, error = %e, "Failed to serialize telemetry event."),
    }
}
