//! Persistent store abstraction for synthetics monitors.

use async_trait::async_trait;
use sea_orm::DbErr;
use thiserror::Error;

use crate::db::models::{SyntheticsMonitor, SyntheticsMonitorWithSecrets};
use crate::services::encryption_service::EncryptionError;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Monitor not found: {0}")]
    NotFound(String),
    #[error("Monitor already exists: {0}")]
    Conflict(String),
    #[error("Failed to decrypt monitor {id}: {reason}")]
    Decryption { id: String, reason: String },
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
    #[error("Encryption error: {0}")]
    Encryption(#[from] EncryptionError),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CreateOptions {
    /// Replace an existing record with the same id. When false the create only
    /// succeeds if no record exists and fails with [`StoreError::Conflict`] otherwise.
    pub overwrite: bool,
}

/// CRUD access to monitor records, keyed by monitor id.
#[async_trait]
pub trait MonitorStore: Send + Sync {
    /// Fetches a monitor without its secrets.
    async fn get(&self, id: &str) -> Result<SyntheticsMonitor, StoreError>;

    /// Fetches a monitor and decrypts its secrets.
    async fn get_decrypted(&self, id: &str) -> Result<SyntheticsMonitorWithSecrets, StoreError>;

    async fn delete(&self, id: &str) -> Result<(), StoreError>;

    /// Persists `monitor` under its own id, encrypting the secrets.
    async fn create(
        &self,
        monitor: &SyntheticsMonitorWithSecrets,
        options: CreateOptions,
    ) -> Result<(), StoreError>;
}
