use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;

use crate::services::sync_service::ServiceLocation;
use crate::version::VERSION;

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub listen_addr: String,
    pub database_url: String,
    pub encryption_key: String,
    pub stack_version: String,
    pub log_dir: String,
    pub service_locations: Vec<ServiceLocation>,
    pub telemetry_enabled: bool,
}

// Partial config for layering
#[derive(Deserialize, Default, Debug)]
struct PartialServerConfig {
    listen_addr: Option<String>,
    database_url: Option<String>,
    encryption_key: Option<String>,
    stack_version: Option<String>,
    log_dir: Option<String>,
    service_locations: Option<Vec<ServiceLocation>>,
    telemetry_enabled: Option<bool>,
}

fn default_listen_addr() -> String {
    "0.0.0.0:5601".to_string()
}

fn default_log_dir() -> String {
    "logs".to_string()
}

fn default_encryption_key() -> String {
    // Development key only, production deployments set ENCRYPTION_KEY.
    "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f".to_string()
}

/// Parses `id=url` pairs separated by commas, e.g. `us_east=https://a,eu_west=https://b`.
fn parse_locations(raw: &str) -> Result<Vec<ServiceLocation>, String> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (id, url) = entry
                .split_once('=')
                .ok_or_else(|| format!("Invalid service location '{entry}', expected id=url"))?;
            Ok(ServiceLocation {
                id: id.trim().to_string(),
                url: url.trim().to_string(),
            })
        })
        .collect()
}

fn parse_bool(key: &str, raw: &str) -> Result<bool, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(format!("{key} must be a boolean, got '{other}'")),
    }
}

impl PartialServerConfig {
    fn from_env_with(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        Ok(PartialServerConfig {
            listen_addr: lookup("LISTEN_ADDR"),
            database_url: lookup("DATABASE_URL"),
            encryption_key: lookup("ENCRYPTION_KEY"),
            stack_version: lookup("STACK_VERSION"),
            log_dir: lookup("LOG_DIR"),
            service_locations: lookup("SYNTHETICS_SERVICE_LOCATIONS")
                .map(|raw| parse_locations(&raw))
                .transpose()?,
            telemetry_enabled: lookup("TELEMETRY_ENABLED")
                .map(|raw| parse_bool("TELEMETRY_ENABLED", &raw))
                .transpose()?,
        })
    }
}

impl ServerConfig {
    pub fn load(config_path: Option<&str>) -> Result<Self, String> {
        dotenv::dotenv().ok();

        let file_contents = match config_path {
            Some(path_str) => {
                let path = Path::new(path_str);
                if path.exists() {
                    Some(
                        fs::read_to_string(path)
                            .map_err(|e| format!("Failed to read config file at {path:?}: {e}"))?,
                    )
                } else {
                    None
                }
            }
            None => None,
        };

        Self::from_sources(file_contents.as_deref(), |key| env::var(key).ok())
    }

    /// Merges a TOML document with environment values; the environment wins.
    pub fn from_sources(
        file_contents: Option<&str>,
        env_lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, String> {
        // 1. Load from file (optional)
        let file_config: PartialServerConfig = match file_contents {
            Some(contents) => toml::from_str(contents)
                .map_err(|e| format!("Failed to parse TOML config: {e}"))?,
            None => PartialServerConfig::default(),
        };

        // 2. Load from environment variables
        let env_config = PartialServerConfig::from_env_with(env_lookup)?;

        // 3. Merge: environment overrides file
        Ok(ServerConfig {
            listen_addr: env_config
                .listen_addr
                .or(file_config.listen_addr)
                .unwrap_or_else(default_listen_addr),
            database_url: env_config
                .database_url
                .or(file_config.database_url)
                .ok_or("DATABASE_URL is required")?,
            encryption_key: env_config
                .encryption_key
                .or(file_config.encryption_key)
                .unwrap_or_else(default_encryption_key),
            stack_version: env_config
                .stack_version
                .or(file_config.stack_version)
                .unwrap_or_else(|| VERSION.to_string()),
            log_dir: env_config
                .log_dir
                .or(file_config.log_dir)
                .unwrap_or_else(default_log_dir),
            service_locations: env_config
                .service_locations
                .or(file_config.service_locations)
                .unwrap_or_default(),
            telemetry_enabled: env_config
                .telemetry_enabled
                .or(file_config.telemetry_enabled)
                .unwrap_or(true),
        })
    }
}
