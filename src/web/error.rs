use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::db::services::StoreError;
use crate::services::monitor_deletion::DeletionError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Monitor id {0} not found!")]
    MonitorNotFound(String),
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Internal server error: {0}")]
    InternalServerError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            AppError::InvalidInput(msg) => (
                StatusCode::BAD_REQUEST,
                json!({ "error": "Bad Request", "message": msg, "statusCode": 400 }),
            ),
            AppError::MonitorNotFound(_) => (
                StatusCode::NOT_FOUND,
                json!({ "error": "Not Found", "message": self.to_string(), "statusCode": 404 }),
            ),
            AppError::DatabaseError(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": format!("Database error: {msg}") }),
            ),
            AppError::InternalServerError(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": msg }))
            }
        };
        (status, Json(body)).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => AppError::MonitorNotFound(id),
            StoreError::Database(e) => AppError::DatabaseError(e.to_string()),
            other => AppError::InternalServerError(other.to_string()),
        }
    }
}

impl From<DeletionError> for AppError {
    fn from(err: DeletionError) -> Self {
        match err {
            DeletionError::NotFound(id) => AppError::MonitorNotFound(id),
            DeletionError::Store(e) => e.into(),
            other => AppError::InternalServerError(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use serde_json::Value;

    async fn body_of(error: AppError) -> (StatusCode, Value) {
        let response = error.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_not_found_shape() {
        let (status, body) = body_of(AppError::MonitorNotFound("m-1".to_string())).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Not Found");
        assert_eq!(body["message"], "Monitor id m-1 not found!");
        assert_eq!(body["statusCode"], 404);
    }

    #[tokio::test]
    async fn test_deletion_errors_map_to_status() {
        let (status, _) = body_of(DeletionError::NotFound("m-1".to_string()).into()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let sync_failure = DeletionError::Sync(
            crate::services::sync_service::SyncServiceError::Service("boom".to_string()),
        );
        let (status, body) = body_of(sync_failure.into()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].as_str().unwrap().contains("boom"));
    }
}
