use axum::{Router, http::Method, routing::get};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::db::services::MonitorStore;
use crate::services::monitor_deletion::MonitorDeletionCoordinator;
use crate::web::routes::monitor_routes;

pub mod error;
pub mod models;
pub mod routes;

pub use error::AppError;

pub const MONITORS_API_PATH: &str = "/internal/synthetics/monitors";

#[derive(Clone)]
pub struct AppState {
    pub monitor_store: Arc<dyn MonitorStore>,
    pub deletion_coordinator: Arc<MonitorDeletionCoordinator>,
}

async fn health_check_handler() -> &'static str {
    "OK"
}

pub fn create_axum_router(app_state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(vec![Method::GET, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(health_check_handler))
        .nest(MONITORS_API_PATH, monitor_routes::create_monitor_router())
        .nest(
            &format!("/s/{{space_id}}{MONITORS_API_PATH}"),
            monitor_routes::create_monitor_router(),
        )
        .with_state(app_state)
        .layer(cors)
}
