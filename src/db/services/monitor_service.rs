//! PostgreSQL backed monitor store.
//!
//! Public attributes live in a JSONB column, secrets are serialized, encrypted with
//! the server key and stored hex encoded next to them.

use std::sync::Arc;

use async_trait::async_trait;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, Schema, Set};
use tracing::{debug, info};

use super::monitor_store::{CreateOptions, MonitorStore, StoreError};
use crate::db::entities::synthetics_monitor;
use crate::db::models::{
    MonitorAttributes, MonitorSecrets, SyntheticsMonitor, SyntheticsMonitorWithSecrets,
};
use crate::services::encryption_service::EncryptionService;

pub struct PostgresMonitorStore {
    db: DatabaseConnection,
    encryption_service: Arc<EncryptionService>,
}

impl PostgresMonitorStore {
    pub fn new(db: DatabaseConnection, encryption_service: Arc<EncryptionService>) -> Self {
        Self {
            db,
            encryption_service,
        }
    }

    /// Creates the `synthetics_monitors` table if it does not exist yet.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        let backend = self.db.get_database_backend();
        let schema = Schema::new(backend);
        let mut statement = schema.create_table_from_entity(synthetics_monitor::Entity);
        statement.if_not_exists();
        self.db.execute(backend.build(&statement)).await?;
        info!("Ensured synthetics_monitors table exists.");
        Ok(())
    }

    async fn find_model(&self, id: &str) -> Result<synthetics_monitor::Model, StoreError> {
        synthetics_monitor::Entity::find_by_id(id.to_owned())
            .one(&self.db)
            .await?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    fn decrypt_secrets(
        &self,
        model: &synthetics_monitor::Model,
    ) -> Result<MonitorSecrets, StoreError> {
        let Some(blob) = model.secrets.as_deref() else {
            return Ok(MonitorSecrets::default());
        };
        let decryption_error = |reason: String| StoreError::Decryption {
            id: model.id.clone(),
            reason,
        };
        let plaintext = self
            .encryption_service
            .decrypt_from_hex(blob)
            .map_err(|e| decryption_error(e.to_string()))?;
        serde_json::from_slice(&plaintext).map_err(|e| decryption_error(e.to_string()))
    }

    fn to_active_model(
        &self,
        monitor: &SyntheticsMonitorWithSecrets,
    ) -> Result<synthetics_monitor::ActiveModel, StoreError> {
        let secrets = if monitor.secrets.is_empty() {
            None
        } else {
            let serialized = serde_json::to_vec(&monitor.secrets)?;
            Some(self.encryption_service.encrypt_to_hex(&serialized)?)
        };
        let record = &monitor.monitor;
        let attributes = &record.attributes;

        Ok(synthetics_monitor::ActiveModel {
            id: Set(record.id.clone()),
            space_id: Set(record.space_id.clone()),
            name: Set(attributes.name.clone()),
            monitor_type: Set(attributes.monitor_type.clone()),
            query_id: Set(attributes.query_id.clone()),
            attributes: Set(serde_json::to_value(attributes)?),
            secrets: Set(secrets),
            revision: Set(attributes.revision),
            created_at: Set(record.created_at),
            updated_at: Set(record.updated_at),
        })
    }
}

/// Maps a row to the domain type. Secrets are not touched.
pub fn model_to_monitor(
    model: &synthetics_monitor::Model,
) -> Result<SyntheticsMonitor, serde_json::Error> {
    let attributes: MonitorAttributes = serde_json::from_value(model.attributes.clone())?;
    Ok(SyntheticsMonitor {
        id: model.id.clone(),
        space_id: model.space_id.clone(),
        attributes,
        created_at: model.created_at,
        updated_at: model.updated_at,
    })
}

#[async_trait]
impl MonitorStore for PostgresMonitorStore {
    async fn get(&self, id: &str) -> Result<SyntheticsMonitor, StoreError> {
        let model = self.find_model(id).await?;
        Ok(model_to_monitor(&model)?)
    }

    async fn get_decrypted(&self, id: &str) -> Result<SyntheticsMonitorWithSecrets, StoreError> {
        let model = self.find_model(id).await?;
        let monitor = model_to_monitor(&model)?;
        let secrets = self.decrypt_secrets(&model)?;
        Ok(SyntheticsMonitorWithSecrets { monitor, secrets })
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let result = synthetics_monitor::Entity::delete_by_id(id.to_owned())
            .exec(&self.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }
        debug!(monitor_id = id, "Deleted monitor row.");
        Ok(())
    }

    async fn create(
        &self,
        monitor: &SyntheticsMonitorWithSecrets,
        options: CreateOptions,
    ) -> Result<(), StoreError> {
        let active_model = self.to_active_model(monitor)?;

        let on_conflict = if options.overwrite {
            OnConflict::column(synthetics_monitor::Column::Id)
                .update_columns([
                    synthetics_monitor::Column::SpaceId,
                    synthetics_monitor::Column::Name,
                    synthetics_monitor::Column::MonitorType,
                    synthetics_monitor::Column::QueryId,
                    synthetics_monitor::Column::Attributes,
                    synthetics_monitor::Column::Secrets,
                    synthetics_monitor::Column::Revision,
                    synthetics_monitor::Column::UpdatedAt,
                ])
                .to_owned()
        } else {
            // Insert-if-absent happens in a single statement, so a row written by
            // someone else in the meantime is never replaced.
            OnConflict::column(synthetics_monitor::Column::Id)
                .do_nothing()
                .to_owned()
        };

        match synthetics_monitor::Entity::insert(active_model)
            .on_conflict(on_conflict)
            .exec(&self.db)
            .await
        {
            Ok(_) => Ok(()),
            Err(DbErr::RecordNotInserted) => Err(StoreError::Conflict(monitor.monitor.id.clone())),
            Err(e) => Err(e.into()),
        }
    }
}
