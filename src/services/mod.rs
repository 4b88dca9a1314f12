pub mod encryption_service;
pub mod monitor_deletion;
pub mod secrets;
pub mod sync_service;
pub mod telemetry;
