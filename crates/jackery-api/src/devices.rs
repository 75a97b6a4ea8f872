// Device endpoints
//
// Bound-device listing and per-device property snapshots. Property keys
// differ between hardware revisions (`odc` on some models, `odcc`/`odcu` on
// others) and there is no schema to discover them, so telemetry stays an
// open key/value map.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::client::SessionClient;
use crate::error::Error;

/// Bound-device list endpoint.
pub const DEVICE_LIST_PATH: &str = "/v1/device/bind/list";

/// Device property endpoint.
pub const DEVICE_PROPERTY_PATH: &str = "/v1/device/property";

/// Interval at which callers are expected to poll device telemetry.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);

/// A power station bound to the account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    #[serde(rename = "devId", deserialize_with = "string_or_number")]
    pub id: String,

    #[serde(rename = "devName", default)]
    pub name: Option<String>,

    #[serde(
        rename = "productType",
        default,
        deserialize_with = "opt_string_or_number"
    )]
    pub product_type: Option<String>,

    /// Any fields not modelled above.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Device {
    /// The device name, or a generated label when the account has none set.
    pub fn display_name(&self) -> String {
        match self.name.as_deref() {
            Some(name) if !name.trim().is_empty() => name.to_owned(),
            _ => format!("Jackery Device {}", self.id),
        }
    }
}

/// Raw property values for one device at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelemetrySnapshot {
    pub device_id: String,
    pub properties: BTreeMap<String, Value>,
    pub fetched_at: DateTime<Utc>,
}

impl TelemetrySnapshot {
    /// Extract `data.properties` from a device-property response body.
    pub fn from_body(device_id: impl Into<String>, body: &Value) -> Self {
        let properties = body
            .pointer("/data/properties")
            .and_then(Value::as_object)
            .map(|props| {
                props
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect()
            })
            .unwrap_or_default();

        Self {
            device_id: device_id.into(),
            properties,
            fetched_at: Utc::now(),
        }
    }

    /// Numeric value of `key`, if present and numeric.
    pub fn number(&self, key: &str) -> Option<f64> {
        self.properties.get(key).and_then(Value::as_f64)
    }

    /// Boolean value of `key`. The API reports toggles as `0`/`1`.
    pub fn flag(&self, key: &str) -> Option<bool> {
        match self.properties.get(key)? {
            Value::Bool(b) => Some(*b),
            Value::Number(n) => Some(n.as_f64().is_some_and(|v| v.abs() > f64::EPSILON)),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

impl SessionClient {
    /// List all devices bound to the account.
    ///
    /// `GET /v1/device/bind/list`. A response without `data` yields an empty
    /// list.
    pub async fn list_devices(&self) -> Result<Vec<Device>, Error> {
        debug!("listing devices");
        let body = self.request(DEVICE_LIST_PATH, &[]).await?;

        let data = match body.get("data") {
            None | Some(Value::Null) => return Ok(Vec::new()),
            Some(data) => data.clone(),
        };

        let devices: Vec<Device> =
            serde_json::from_value(data).map_err(|e| Error::Deserialization {
                message: format!("unexpected device list shape: {e}"),
                body: body.to_string(),
            })?;

        if devices.is_empty() {
            warn!("no devices bound to this account");
        }
        Ok(devices)
    }

    /// Fetch the raw property response for one device.
    ///
    /// `GET /v1/device/property?deviceId=...`. Returns the whole body; the
    /// properties sit under `data.properties`.
    pub async fn device_detail(&self, device_id: &str) -> Result<Value, Error> {
        debug!(device_id, "fetching device properties");
        self.request(DEVICE_PROPERTY_PATH, &[("deviceId", device_id)])
            .await
    }

    /// Fetch one device's properties as a [`TelemetrySnapshot`].
    pub async fn device_telemetry(&self, device_id: &str) -> Result<TelemetrySnapshot, Error> {
        let body = self.device_detail(device_id).await?;
        Ok(TelemetrySnapshot::from_body(device_id, &body))
    }
}

// ── Lenient id decoding ──────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    String(String),
    Number(serde_json::Number),
}

impl From<StringOrNumber> for String {
    fn from(v: StringOrNumber) -> Self {
        match v {
            StringOrNumber::String(s) => s,
            StringOrNumber::Number(n) => n.to_string(),
        }
    }
}

fn string_or_number<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    StringOrNumber::deserialize(d).map(String::from)
}

fn opt_string_or_number<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(Option::<StringOrNumber>::deserialize(d)?.map(String::from))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn device_decodes_known_and_extra_fields() {
        let device: Device = serde_json::from_value(json!({
            "devId": "JK123",
            "devName": "Explorer 1000",
            "productType": "E1000",
            "online": 1
        }))
        .unwrap();

        assert_eq!(device.id, "JK123");
        assert_eq!(device.display_name(), "Explorer 1000");
        assert_eq!(device.product_type.as_deref(), Some("E1000"));
        assert_eq!(device.extra["online"], 1);
    }

    #[test]
    fn device_accepts_numeric_ids() {
        let device: Device =
            serde_json::from_value(json!({ "devId": 42, "productType": 7 })).unwrap();
        assert_eq!(device.id, "42");
        assert_eq!(device.product_type.as_deref(), Some("7"));
        assert!(device.name.is_none());
    }

    #[test]
    fn display_name_falls_back_to_generated_label() {
        let device: Device = serde_json::from_value(json!({ "devId": "d1" })).unwrap();
        assert_eq!(device.display_name(), "Jackery Device d1");

        let blank: Device =
            serde_json::from_value(json!({ "devId": "d2", "devName": "  " })).unwrap();
        assert_eq!(blank.display_name(), "Jackery Device d2");
    }

    #[test]
    fn snapshot_reads_nested_properties() {
        let body = json!({
            "code": 0,
            "data": { "properties": { "rb": 87, "bt": 215, "oac": 1, "odc": 0 } }
        });
        let snap = TelemetrySnapshot::from_body("d1", &body);

        assert_eq!(snap.device_id, "d1");
        assert_eq!(snap.properties.len(), 4);
        assert_eq!(snap.number("rb"), Some(87.0));
        assert_eq!(snap.flag("oac"), Some(true));
        assert_eq!(snap.flag("odc"), Some(false));
        assert_eq!(snap.flag("odcu"), None);
    }

    #[test]
    fn snapshot_without_properties_is_empty() {
        let snap = TelemetrySnapshot::from_body("d1", &json!({ "code": 0 }));
        assert!(snap.is_empty());

        let snap = TelemetrySnapshot::from_body("d1", &json!({ "code": 0, "data": {} }));
        assert!(snap.is_empty());
    }
}
