// Wire types exchanged with the Supervisor and the platform.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Periodic liveness report sent to the platform.
///
/// Built fresh on every heartbeat cycle and never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeartbeatPayload {
    /// Derived from the hub token (see `controll_core::heartbeat::device_id`).
    pub device_id: String,
    /// Home Assistant Core version; `None` when `core/info` was unreachable.
    pub ha_version: Option<String>,
    /// Number of entities reported by `core/api/states`, `0` on failure.
    pub entities_count: u64,
    /// Seconds since the reporter started.
    #[serde(rename = "uptime")]
    pub uptime_seconds: u64,
}

/// Aggregated `host/info`, `core/info` and `supervisor/info` payloads.
///
/// Loosely typed because the field set varies across Supervisor releases.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemInfo {
    pub host: Value,
    pub core: Value,
    pub supervisor: Value,
}

/// Strip the Supervisor's `{ "result": "ok", "data": {...} }` envelope.
///
/// Returns `Value::Null` when there is no `data` member.
pub(crate) fn unwrap_data(value: Value) -> Value {
    match value {
        Value::Object(mut map) => map.remove("data").unwrap_or(Value::Null),
        _ => Value::Null,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn heartbeat_uses_wire_field_names() {
        let payload = HeartbeatPayload {
            device_id: "abc123".into(),
            ha_version: None,
            entities_count: 0,
            uptime_seconds: 42,
        };
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            value,
            json!({
                "device_id": "abc123",
                "ha_version": null,
                "entities_count": 0,
                "uptime": 42
            })
        );
    }

    #[test]
    fn unwrap_data_handles_missing_envelope() {
        assert_eq!(unwrap_data(json!({"data": {"version": "2024.6.0"}})), json!({"version": "2024.6.0"}));
        assert_eq!(unwrap_data(json!({"result": "ok"})), Value::Null);
        assert_eq!(unwrap_data(json!([1, 2, 3])), Value::Null);
    }
}
