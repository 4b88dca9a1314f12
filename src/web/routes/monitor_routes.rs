use axum::{
    Json, Router,
    extract::{Path, State},
    response::{IntoResponse, Response},
    routing::get,
};
use std::sync::Arc;
use tracing::info;

use crate::db::models::SyntheticsMonitor;
use crate::services::monitor_deletion::DeletionOutcome;
use crate::web::models::monitor_models::{MonitorPathParams, PartialSyncFailureResponse};
use crate::web::{AppError, AppState};

pub fn create_monitor_router() -> Router<Arc<AppState>> {
    Router::new().route(
        "/{monitor_id}",
        get(get_monitor).delete(delete_monitor),
    )
}

#[axum::debug_handler]
async fn get_monitor(
    State(app_state): State<Arc<AppState>>,
    Path(params): Path<MonitorPathParams>,
) -> Result<Json<SyntheticsMonitor>, AppError> {
    params.validate().map_err(AppError::InvalidInput)?;
    let monitor = app_state.monitor_store.get(&params.monitor_id).await?;
    Ok(Json(monitor))
}

#[axum::debug_handler]
async fn delete_monitor(
    State(app_state): State<Arc<AppState>>,
    Path(params): Path<MonitorPathParams>,
) -> Result<Response, AppError> {
    params.validate().map_err(AppError::InvalidInput)?;

    let outcome = app_state
        .deletion_coordinator
        .delete_monitor(&params.monitor_id, params.space_id())
        .await?;

    match outcome {
        DeletionOutcome::Deleted => {
            info!(
                monitor_id = %params.monitor_id,
                space_id = params.space_id(),
                "Monitor deleted."
            );
            Ok(Json(params.monitor_id).into_response())
        }
        DeletionOutcome::PartiallySynced(errors) => {
            Ok(Json(PartialSyncFailureResponse::new(errors)).into_response())
        }
    }
}
