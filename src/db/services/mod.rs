//! Data access for synthetics monitors.
//!
//! `monitor_store` defines the store contract the rest of the server programs against;
//! `monitor_service` is the PostgreSQL implementation built on sea-orm.

pub mod monitor_service;
pub mod monitor_store;

pub use monitor_service::*;
pub use monitor_store::*;
