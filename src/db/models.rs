//! Domain representation of synthetics monitors as the rest of the server sees them.
//!
//! The database entity stores public attributes as JSON and the secret fields as a
//! single encrypted blob; these types are what callers work with once a row has been
//! read (and, where requested, decrypted).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

pub const DEFAULT_SPACE_ID: &str = "default";

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleUnit {
    #[serde(rename = "s")]
    Seconds,
    #[serde(rename = "m")]
    Minutes,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct MonitorSchedule {
    pub number: String,
    pub unit: ScheduleUnit,
}

impl MonitorSchedule {
    /// Interval between two runs in milliseconds, `None` if `number` is not an integer.
    pub fn interval_ms(&self) -> Option<u64> {
        let number: u64 = self.number.trim().parse().ok()?;
        let factor = match self.unit {
            ScheduleUnit::Seconds => 1_000,
            ScheduleUnit::Minutes => 60_000,
        };
        number.checked_mul(factor)
    }
}

fn default_enabled() -> bool {
    true
}

/// Public (non-secret) configuration of a monitor.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MonitorAttributes {
    pub name: String,
    #[serde(rename = "type")]
    pub monitor_type: String,
    pub schedule: MonitorSchedule,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub locations: Vec<String>,
    #[serde(default)]
    pub source_inline: bool,
    /// Identifier the sync service knows this monitor by.
    pub query_id: String,
    #[serde(default)]
    pub revision: i32,
    /// Type specific configuration (urls, hosts, timeouts...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Secret fields of a monitor, keyed by field name.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(transparent)]
pub struct MonitorSecrets(pub BTreeMap<String, Value>);

impl MonitorSecrets {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SyntheticsMonitor {
    pub id: String,
    pub space_id: String,
    pub attributes: MonitorAttributes,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A monitor together with its decrypted secrets.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticsMonitorWithSecrets {
    pub monitor: SyntheticsMonitor,
    pub secrets: MonitorSecrets,
}
