//! In-memory collaborators for exercising the deletion workflow without a database
//! or a running sync service.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use serde_json::{Map, json};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use synthetics_server::db::models::{
    MonitorAttributes, MonitorSchedule, MonitorSecrets, ScheduleUnit, SyntheticsMonitor,
    SyntheticsMonitorWithSecrets,
};
use synthetics_server::db::services::{CreateOptions, MonitorStore, StoreError};
use synthetics_server::services::monitor_deletion::MonitorDeletionCoordinator;
use synthetics_server::services::sync_service::{
    MonitorSyncService, SyncError, SyncMonitor, SyncServiceError,
};
use synthetics_server::services::telemetry::{
    ErrorTelemetryEvent, MonitorTelemetryEvent, TelemetrySink,
};
use tokio::sync::Barrier;

pub const STACK_VERSION: &str = "8.9.0";

/// Builds a browser monitor with credentials stored as secrets.
pub fn monitor_with_secrets(id: &str) -> SyntheticsMonitorWithSecrets {
    let created = Utc.with_ymd_and_hms(2024, 3, 14, 9, 30, 0).unwrap();
    let mut extra = Map::new();
    extra.insert("urls".to_string(), json!("https://shop.example.com"));

    let mut secrets = MonitorSecrets::default();
    secrets.insert("username", json!("checkout-bot"));
    secrets.insert("password", json!("s3cr3t"));
    secrets.insert("source.inline.script", json!("step('open', () => page.goto(url))"));

    SyntheticsMonitorWithSecrets {
        monitor: SyntheticsMonitor {
            id: id.to_string(),
            space_id: "default".to_string(),
            attributes: MonitorAttributes {
                name: format!("checkout {id}"),
                monitor_type: "browser".to_string(),
                schedule: MonitorSchedule {
                    number: "10".to_string(),
                    unit: ScheduleUnit::Minutes,
                },
                enabled: true,
                locations: vec!["us_east".to_string(), "eu_west".to_string()],
                source_inline: true,
                query_id: format!("{id}-default"),
                revision: 3,
                extra,
            },
            created_at: created,
            updated_at: created,
        },
        secrets,
    }
}

#[derive(Default)]
struct StoreState {
    records: HashMap<String, SyntheticsMonitorWithSecrets>,
    operations: Vec<String>,
}

/// Monitor store backed by a map. Failure modes are switched on per test.
#[derive(Default)]
pub struct InMemoryMonitorStore {
    state: Mutex<StoreState>,
    fail_decryption: Mutex<bool>,
    fail_delete: Mutex<bool>,
    fail_create: Mutex<bool>,
    // Written right after a `get` answered not-found, to act as a concurrent writer
    // slipping in between the restore check and the restore create.
    write_after_missing_get: Mutex<Option<SyntheticsMonitorWithSecrets>>,
}

impl InMemoryMonitorStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn insert(&self, monitor: SyntheticsMonitorWithSecrets) {
        let mut state = self.state.lock().unwrap();
        state.records.insert(monitor.monitor.id.clone(), monitor);
    }

    pub fn record(&self, id: &str) -> Option<SyntheticsMonitorWithSecrets> {
        self.state.lock().unwrap().records.get(id).cloned()
    }

    pub fn operations(&self) -> Vec<String> {
        self.state.lock().unwrap().operations.clone()
    }

    pub fn fail_decryption(&self) {
        *self.fail_decryption.lock().unwrap() = true;
    }

    pub fn fail_delete(&self) {
        *self.fail_delete.lock().unwrap() = true;
    }

    pub fn fail_create(&self) {
        *self.fail_create.lock().unwrap() = true;
    }

    pub fn write_after_missing_get(&self, monitor: SyntheticsMonitorWithSecrets) {
        *self.write_after_missing_get.lock().unwrap() = Some(monitor);
    }

    fn log(&self, operation: String) {
        self.state.lock().unwrap().operations.push(operation);
    }
}

#[async_trait]
impl MonitorStore for InMemoryMonitorStore {
    async fn get(&self, id: &str) -> Result<SyntheticsMonitor, StoreError> {
        self.log(format!("get:{id}"));
        let found = self.record(id).map(|m| m.monitor);
        match found {
            Some(monitor) => Ok(monitor),
            None => {
                if let Some(writer) = self.write_after_missing_get.lock().unwrap().take() {
                    self.insert(writer);
                }
                Err(StoreError::NotFound(id.to_string()))
            }
        }
    }

    async fn get_decrypted(&self, id: &str) -> Result<SyntheticsMonitorWithSecrets, StoreError> {
        self.log(format!("get_decrypted:{id}"));
        let found = self.record(id).ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        if *self.fail_decryption.lock().unwrap() {
            return Err(StoreError::Decryption {
                id: id.to_string(),
                reason: "aead::Error".to_string(),
            });
        }
        Ok(found)
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.log(format!("delete:{id}"));
        if *self.fail_delete.lock().unwrap() {
            return Err(StoreError::Unavailable("store is read-only".to_string()));
        }
        let removed = self.state.lock().unwrap().records.remove(id);
        match removed {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound(id.to_string())),
        }
    }

    async fn create(
        &self,
        monitor: &SyntheticsMonitorWithSecrets,
        options: CreateOptions,
    ) -> Result<(), StoreError> {
        let id = monitor.monitor.id.clone();
        self.log(format!("create:{id}"));
        if *self.fail_create.lock().unwrap() {
            return Err(StoreError::Unavailable("store is read-only".to_string()));
        }
        let mut state = self.state.lock().unwrap();
        if !options.overwrite && state.records.contains_key(&id) {
            return Err(StoreError::Conflict(id));
        }
        state.records.insert(id, monitor.clone());
        Ok(())
    }
}

/// Holds every lookup at a barrier until `parties` requests have read the monitor, so
/// concurrent deletions all start from the same snapshot.
pub struct LookupBarrierStore {
    inner: Arc<InMemoryMonitorStore>,
    barrier: Barrier,
}

impl LookupBarrierStore {
    pub fn new(inner: Arc<InMemoryMonitorStore>, parties: usize) -> Arc<Self> {
        Arc::new(Self {
            inner,
            barrier: Barrier::new(parties),
        })
    }
}

#[async_trait]
impl MonitorStore for LookupBarrierStore {
    async fn get(&self, id: &str) -> Result<SyntheticsMonitor, StoreError> {
        self.inner.get(id).await
    }

    async fn get_decrypted(&self, id: &str) -> Result<SyntheticsMonitorWithSecrets, StoreError> {
        let found = self.inner.get_decrypted(id).await;
        self.barrier.wait().await;
        found
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.inner.delete(id).await
    }

    async fn create(
        &self,
        monitor: &SyntheticsMonitorWithSecrets,
        options: CreateOptions,
    ) -> Result<(), StoreError> {
        self.inner.create(monitor, options).await
    }
}

pub enum SyncBehavior {
    Succeed,
    ReportErrors(Vec<SyncError>),
    Fail(String),
}

/// Sync service double that records calls and answers with a configured behavior.
pub struct FakeSyncService {
    behavior: Mutex<SyncBehavior>,
    calls: Mutex<Vec<(Vec<SyncMonitor>, String)>>,
    // Record written to the store while the sync call is in flight.
    concurrent_write: Mutex<Option<(Arc<InMemoryMonitorStore>, SyntheticsMonitorWithSecrets)>>,
}

impl FakeSyncService {
    pub fn new(behavior: SyncBehavior) -> Arc<Self> {
        Arc::new(Self {
            behavior: Mutex::new(behavior),
            calls: Mutex::new(Vec::new()),
            concurrent_write: Mutex::new(None),
        })
    }

    pub fn calls(&self) -> Vec<(Vec<SyncMonitor>, String)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn write_during_sync(
        &self,
        store: Arc<InMemoryMonitorStore>,
        monitor: SyntheticsMonitorWithSecrets,
    ) {
        *self.concurrent_write.lock().unwrap() = Some((store, monitor));
    }
}

#[async_trait]
impl MonitorSyncService for FakeSyncService {
    async fn delete_monitors(
        &self,
        monitors: Vec<SyncMonitor>,
        space_id: &str,
    ) -> Result<Vec<SyncError>, SyncServiceError> {
        self.calls
            .lock()
            .unwrap()
            .push((monitors, space_id.to_string()));

        if let Some((store, monitor)) = self.concurrent_write.lock().unwrap().take() {
            store.insert(monitor);
        }

        match &*self.behavior.lock().unwrap() {
            SyncBehavior::Succeed => Ok(Vec::new()),
            SyncBehavior::ReportErrors(errors) => Ok(errors.clone()),
            SyncBehavior::Fail(reason) => Err(SyncServiceError::Service(reason.clone())),
        }
    }
}

#[derive(Default)]
pub struct RecordingTelemetry {
    pub monitor_events: Mutex<Vec<MonitorTelemetryEvent>>,
    pub error_events: Mutex<Vec<ErrorTelemetryEvent>>,
}

impl RecordingTelemetry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn monitor_events(&self) -> Vec<MonitorTelemetryEvent> {
        self.monitor_events.lock().unwrap().clone()
    }

    pub fn error_events(&self) -> Vec<ErrorTelemetryEvent> {
        self.error_events.lock().unwrap().clone()
    }
}

impl TelemetrySink for RecordingTelemetry {
    fn send_monitor_event(&self, event: MonitorTelemetryEvent) {
        self.monitor_events.lock().unwrap().push(event);
    }

    fn send_error_event(&self, event: ErrorTelemetryEvent) {
        self.error_events.lock().unwrap().push(event);
    }
}

pub struct Harness {
    pub store: Arc<InMemoryMonitorStore>,
    pub sync: Arc<FakeSyncService>,
    pub telemetry: Arc<RecordingTelemetry>,
    pub coordinator: Arc<MonitorDeletionCoordinator>,
}

impl Harness {
    pub fn new(behavior: SyncBehavior) -> Self {
        Self::build(behavior, |store| store as Arc<dyn MonitorStore>)
    }

    /// Harness whose coordinator reads monitors through a [`LookupBarrierStore`].
    pub fn with_lookup_barrier(behavior: SyncBehavior, parties: usize) -> Self {
        Self::build(behavior, |store| {
            LookupBarrierStore::new(store, parties) as Arc<dyn MonitorStore>
        })
    }

    fn build(
        behavior: SyncBehavior,
        wrap: impl FnOnce(Arc<InMemoryMonitorStore>) -> Arc<dyn MonitorStore>,
    ) -> Self {
        let store = InMemoryMonitorStore::new();
        let sync = FakeSyncService::new(behavior);
        let telemetry = RecordingTelemetry::new();
        let coordinator = Arc::new(MonitorDeletionCoordinator::new(
            wrap(store.clone()),
            sync.clone(),
            telemetry.clone(),
            STACK_VERSION,
        ));
        Self {
            store,
            sync,
            telemetry,
            coordinator,
        }
    }
}
