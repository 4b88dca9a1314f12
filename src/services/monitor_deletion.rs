//! Deletion of synthetics monitors from the primary store and the sync service.
//!
//! The store delete and the sync delete run together. When the store delete went
//! through but the sync delete failed, the monitor is put back into the store from the
//! copy read before deletion, so the store does not lose a monitor the service may
//! still be running. A failed store delete removed nothing and is not compensated.
//! Restoring is best-effort: it is attempted once, its failures are only logged, and
//! the error that triggered it is the one returned to the caller.

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::db::models::{SyntheticsMonitor, SyntheticsMonitorWithSecrets};
use crate::db::services::{CreateOptions, MonitorStore, StoreError};
use crate::services::secrets::{attribute_fields, normalize_secrets};
use crate::services::sync_service::{
    MonitorSyncService, SyncError, SyncMonitor, SyncServiceError,
};
use crate::services::telemetry::{ErrorTelemetryEvent, TelemetrySink, format_delete_event};

#[derive(Error, Debug)]
pub enum DeletionError {
    #[error("Monitor id {0} not found!")]
    NotFound(String),
    #[error("Failed to delete monitor from the store: {0}")]
    Store(#[from] StoreError),
    #[error("Failed to delete monitor from the sync service: {0}")]
    Sync(#[from] SyncServiceError),
    #[error("Failed to prepare monitor for the sync service: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result of a deletion that was committed to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeletionOutcome {
    Deleted,
    /// The store deletion went through but some service locations reported errors.
    PartiallySynced(Vec<SyncError>),
}

impl DeletionOutcome {
    pub fn from_sync_errors(errors: Vec<SyncError>) -> Self {
        if errors.is_empty() {
            DeletionOutcome::Deleted
        } else {
            DeletionOutcome::PartiallySynced(errors)
        }
    }

    pub fn sync_errors(&self) -> &[SyncError] {
        match self {
            DeletionOutcome::Deleted => &[],
            DeletionOutcome::PartiallySynced(errors) => errors,
        }
    }
}

/// What was found when reading a monitor ahead of its deletion.
#[derive(Debug, Clone, PartialEq)]
pub enum MonitorLookup {
    /// Secrets were decrypted; the record can be fully restored.
    Decrypted(SyntheticsMonitorWithSecrets),
    /// Decryption failed, only the public attributes are known.
    Plain(SyntheticsMonitor),
    NotFound,
}

impl MonitorLookup {
    pub fn monitor(&self) -> Option<&SyntheticsMonitor> {
        match self {
            MonitorLookup::Decrypted(with_secrets) => Some(&with_secrets.monitor),
            MonitorLookup::Plain(monitor) => Some(monitor),
            MonitorLookup::NotFound => None,
        }
    }
}

/// Reads a monitor, preferring the decrypted form. A decryption failure is logged,
/// reported to telemetry and answered with the plain record instead.
pub async fn lookup_monitor_to_delete(
    store: &dyn MonitorStore,
    telemetry: &dyn TelemetrySink,
    stack_version: &str,
    monitor_id: &str,
) -> Result<MonitorLookup, StoreError> {
    match store.get_decrypted(monitor_id).await {
        Ok(with_secrets) => return Ok(MonitorLookup::Decrypted(with_secrets)),
        Err(StoreError::NotFound(_)) => return Ok(MonitorLookup::NotFound),
        Err(e) => {
            error!(monitor_id, error = %e, "Failed to decrypt monitor to delete.");
            telemetry.send_error_event(ErrorTelemetryEvent {
                reason: format!("Failed to decrypt monitor to delete {monitor_id}"),
                message: e.to_string(),
                error_type: "deletionError".to_string(),
                code: None,
                status: None,
                stack_version: stack_version.to_string(),
            });
        }
    }

    match store.get(monitor_id).await {
        Ok(monitor) => Ok(MonitorLookup::Plain(monitor)),
        Err(StoreError::NotFound(_)) => Ok(MonitorLookup::NotFound),
        Err(e) => Err(e),
    }
}

/// How a compensating restore ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreOutcome {
    Restored,
    /// A record with the same id exists again, it is left untouched.
    AlreadyPresent,
    Failed,
}

pub struct MonitorDeletionCoordinator {
    store: Arc<dyn MonitorStore>,
    sync_service: Arc<dyn MonitorSyncService>,
    telemetry: Arc<dyn TelemetrySink>,
    stack_version: String,
}

impl MonitorDeletionCoordinator {
    pub fn new(
        store: Arc<dyn MonitorStore>,
        sync_service: Arc<dyn MonitorSyncService>,
        telemetry: Arc<dyn TelemetrySink>,
        stack_version: impl Into<String>,
    ) -> Self {
        Self {
            store,
            sync_service,
            telemetry,
            stack_version: stack_version.into(),
        }
    }

    pub async fn delete_monitor(
        &self,
        monitor_id: &str,
        space_id: &str,
    ) -> Result<DeletionOutcome, DeletionError> {
        let lookup = lookup_monitor_to_delete(
            self.store.as_ref(),
            self.telemetry.as_ref(),
            &self.stack_version,
            monitor_id,
        )
        .await?;

        let (monitor, monitor_with_secrets, fields) = match lookup {
            MonitorLookup::Decrypted(with_secrets) => {
                let fields = normalize_secrets(&with_secrets)?;
                (with_secrets.monitor.clone(), Some(with_secrets), fields)
            }
            MonitorLookup::Plain(monitor) => {
                let fields = attribute_fields(&monitor)?;
                (monitor, None, fields)
            }
            MonitorLookup::NotFound => {
                return Err(DeletionError::NotFound(monitor_id.to_string()));
            }
        };
        let sync_monitors = vec![SyncMonitor::new(monitor.attributes.query_id.clone(), fields)];

        // join, not try_join: a failing sync call must not drop the in-flight store delete.
        let (delete_result, sync_result) = tokio::join!(
            self.store.delete(monitor_id),
            self.sync_service.delete_monitors(sync_monitors, space_id),
        );

        let failure = match (delete_result, sync_result) {
            (Ok(()), Ok(errors)) => {
                self.telemetry.send_monitor_event(format_delete_event(
                    &monitor,
                    &self.stack_version,
                    Utc::now(),
                    monitor.attributes.source_inline,
                    &errors,
                ));
                if !errors.is_empty() {
                    warn!(
                        monitor_id,
                        failed_locations = errors.len(),
                        "Monitor deleted but the sync service reported errors."
                    );
                }
                return Ok(DeletionOutcome::from_sync_errors(errors));
            }
            // This request removed nothing, so there is nothing to put back.
            (Err(e), _) => {
                let failure = DeletionError::Store(e);
                error!(
                    monitor_id,
                    monitor_name = %monitor.attributes.name,
                    error = %failure,
                    "Unable to delete synthetics monitor from the store."
                );
                return Err(failure);
            }
            (Ok(()), Err(e)) => DeletionError::Sync(e),
        };

        error!(
            monitor_id,
            monitor_name = %monitor.attributes.name,
            error = %failure,
            "Unable to delete synthetics monitor from the sync service."
        );

        if let Some(with_secrets) = monitor_with_secrets {
            self.restore_deleted_monitor(&with_secrets).await;
        }

        Err(failure)
    }

    /// Puts `monitor` back into the store unless a record with its id exists again.
    pub async fn restore_deleted_monitor(
        &self,
        monitor: &SyntheticsMonitorWithSecrets,
    ) -> RestoreOutcome {
        let monitor_id = monitor.monitor.id.as_str();

        match self.store.get(monitor_id).await {
            Ok(_) => {
                info!(monitor_id, "Monitor still present in the store, skipping restore.");
                return RestoreOutcome::AlreadyPresent;
            }
            Err(StoreError::NotFound(_)) => {}
            Err(e) => {
                error!(monitor_id, error = %e, "Failed to check monitor before restoring it.");
                return RestoreOutcome::Failed;
            }
        }

        match self
            .store
            .create(monitor, CreateOptions { overwrite: false })
            .await
        {
            Ok(()) => {
                info!(monitor_id, "Restored monitor after failed deletion.");
                RestoreOutcome::Restored
            }
            Err(StoreError::Conflict(_)) => {
                info!(monitor_id, "Monitor was recreated concurrently, skipping restore.");
                RestoreOutcome::AlreadyPresent
            }
            Err(e) => {
                error!(monitor_id, error = %e, "Failed to restore deleted monitor.");
                RestoreOutcome::Failed
            }
        }
    }
}
