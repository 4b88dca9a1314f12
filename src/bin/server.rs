use clap::Parser;
use sea_orm::{ConnectOptions, Database};
use std::sync::Arc;
use tracing::{error, info};
use tracing_appender::rolling;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use synthetics_server::db::services::{MonitorStore, PostgresMonitorStore};
use synthetics_server::server::config::ServerConfig;
use synthetics_server::services::encryption_service::EncryptionService;
use synthetics_server::services::monitor_deletion::MonitorDeletionCoordinator;
use synthetics_server::services::sync_service::ServiceApiClient;
use synthetics_server::services::telemetry::{NoopTelemetry, TelemetryQueue, TelemetrySink};
use synthetics_server::version::VERSION;
use synthetics_server::web::{AppState, create_axum_router};

const TELEMETRY_QUEUE_CAPACITY: usize = 1024;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long)]
    config: Option<String>,
}

fn init_logging(log_dir: &str) {
    // Log to a file: JSON format, daily rotation
    let file_appender = rolling::daily(log_dir, "server.log");
    let file_layer = fmt::layer()
        .with_writer(file_appender)
        .with_ansi(false)
        .json();

    // Log to stdout: human-readable format
    let stdout_layer = fmt::layer().with_writer(std::io::stdout);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sea_orm=warn,sqlx::query=warn"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer)
        .init();
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal.");
    }
    info!("Shutdown signal received.");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = Args::parse();

    let config = match ServerConfig::load(args.config.as_deref()) {
        Ok(config) => Arc::new(config),
        Err(e) => {
            eprintln!("Failed to load server configuration: {e}");
            return Err(e.into());
        }
    };

    init_logging(&config.log_dir);
    info!(version = VERSION, stack_version = %config.stack_version, "Starting synthetics server.");

    // --- Database Setup ---
    let mut opt = ConnectOptions::new(config.database_url.to_owned());
    opt.max_connections(10);
    let db = Database::connect(opt).await?;

    let encryption_service = Arc::new(EncryptionService::from_hex_key(&config.encryption_key)?);
    let postgres_store = PostgresMonitorStore::new(db, encryption_service);
    postgres_store.ensure_schema().await?;
    let monitor_store: Arc<dyn MonitorStore> = Arc::new(postgres_store);

    // --- Sync Service Setup ---
    let sync_service = Arc::new(ServiceApiClient::new(
        config.service_locations.clone(),
        config.stack_version.clone(),
    )?);
    if sync_service.locations().is_empty() {
        info!("No sync service locations configured, deletions will only touch the store.");
    }

    // --- Telemetry Setup ---
    let telemetry: Arc<dyn TelemetrySink> = if config.telemetry_enabled {
        let (queue, reporter) = TelemetryQueue::new(TELEMETRY_QUEUE_CAPACITY);
        reporter.run();
        Arc::new(queue)
    } else {
        Arc::new(NoopTelemetry)
    };

    let deletion_coordinator = Arc::new(MonitorDeletionCoordinator::new(
        monitor_store.clone(),
        sync_service,
        telemetry,
        config.stack_version.clone(),
    ));

    let app = create_axum_router(Arc::new(AppState {
        monitor_store,
        deletion_coordinator,
    }));

    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    info!(addr = %config.listen_addr, "HTTP server listening.");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped.");
    Ok(())
}
