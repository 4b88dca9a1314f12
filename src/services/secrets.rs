use serde_json::{Map, Value};

use crate::db::models::{SyntheticsMonitor, SyntheticsMonitorWithSecrets};

/// Flattens a monitor into the field map the sync service expects, with decrypted
/// secret fields merged over the public attributes.
pub fn normalize_secrets(
    monitor: &SyntheticsMonitorWithSecrets,
) -> Result<Map<String, Value>, serde_json::Error> {
    let mut fields = attribute_fields(&monitor.monitor)?;
    for (key, value) in &monitor.secrets.0 {
        fields.insert(key.clone(), value.clone());
    }
    Ok(fields)
}

/// Public attributes only, used when secrets could not be decrypted.
pub fn attribute_fields(
    monitor: &SyntheticsMonitor,
) -> Result<Map<String, Value>, serde_json::Error> {
    serde_json::from_value(serde_json::to_value(&monitor.attributes)?)
}
