// ── Snapshot: the portable unit of a backup ──

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::inventory::Device;

/// State of one named sub-resource slot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Capture<'a> {
    /// Not fetched, not applicable, or skipped at backup time.
    Absent,
    /// The raw document exactly as the source API returned it.
    Captured(&'a Value),
}

impl<'a> Capture<'a> {
    pub fn is_captured(&self) -> bool {
        matches!(self, Self::Captured(_))
    }

    pub fn value(self) -> Option<&'a Value> {
        match self {
            Self::Absent => None,
            Self::Captured(v) => Some(v),
        }
    }
}

/// `true` for documents that carry nothing to replay (`[]`, `{}`, `null`).
pub fn is_empty_document(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// Sub-resource name → captured document.
///
/// A key is either present with the source's raw value or missing entirely;
/// `null` is never stored. Per-SSID slots hold an object keyed by the SSID
/// number (`{"0": {...}, "3": {...}}`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceMap(BTreeMap<String, Value>);

impl ResourceMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Capture<'_> {
        match self.0.get(key) {
            None | Some(Value::Null) => Capture::Absent,
            Some(v) => Capture::Captured(v),
        }
    }

    /// Store a captured document. `null` means "nothing captured" and is dropped.
    pub fn capture(&mut self, key: impl Into<String>, value: Value) {
        if !value.is_null() {
            self.0.insert(key.into(), value);
        }
    }

    /// Per-SSID document for SSID `number` under `key`.
    pub fn ssid(&self, key: &str, number: u64) -> Capture<'_> {
        match self.get(key) {
            Capture::Captured(Value::Object(by_number)) => by_number
                .get(&number.to_string())
                .filter(|v| !v.is_null())
                .map_or(Capture::Absent, Capture::Captured),
            _ => Capture::Absent,
        }
    }

    /// Store a complete per-SSID map. Empty maps are not stored.
    pub fn capture_per_ssid(&mut self, key: impl Into<String>, by_number: BTreeMap<u64, Value>) {
        let map: Map<String, Value> = by_number
            .into_iter()
            .filter(|(_, v)| !v.is_null())
            .map(|(n, v)| (n.to_string(), v))
            .collect();
        if !map.is_empty() {
            self.0.insert(key.into(), Value::Object(map));
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_captured()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// SSID numbers listed in the captured `ssids` document.
    pub fn ssid_numbers(&self) -> Vec<u64> {
        ssid_numbers(self.get(crate::catalog::SSIDS_KEY).value())
    }
}

/// SSID numbers from an `ssids` list document.
pub(crate) fn ssid_numbers(ssids: Option<&Value>) -> Vec<u64> {
    ssids
        .and_then(Value::as_array)
        .map(|list| {
            list.iter()
                .filter_map(|s| s.get("number").and_then(Value::as_u64))
                .collect()
        })
        .unwrap_or_default()
}

// ── Device ──────────────────────────────────────────────────────────

/// Captured configuration of one device: its inventory record plus any
/// model-gated sub-resources (`switchPorts`, `routingInterfaces`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceConfig {
    pub general: Device,
    #[serde(flatten)]
    pub resources: ResourceMap,
}

impl DeviceConfig {
    pub fn new(general: Device) -> Self {
        Self {
            general,
            resources: ResourceMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceBackup {
    pub serial: String,
    pub config: DeviceConfig,
}

// ── Snapshot ────────────────────────────────────────────────────────

/// In-memory backup. Serializes to the snapshot JSON format shared by
/// selective backups and parsed archives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub created_at: DateTime<Utc>,
    pub source_org_id: String,
    pub source_org_name: String,
    #[serde(default)]
    pub devices: Vec<DeviceBackup>,
    /// Keyed by the **source** network id.
    #[serde(default)]
    pub network_configs: BTreeMap<String, ResourceMap>,
    #[serde(default)]
    pub organization_config: ResourceMap,
}

impl Snapshot {
    pub fn new(source_org_id: impl Into<String>, source_org_name: impl Into<String>) -> Self {
        Self {
            created_at: Utc::now(),
            source_org_id: source_org_id.into(),
            source_org_name: source_org_name.into(),
            devices: Vec::new(),
            network_configs: BTreeMap::new(),
            organization_config: ResourceMap::new(),
        }
    }

    pub fn device(&self, serial: &str) -> Option<&DeviceBackup> {
        self.devices.iter().find(|d| d.serial == serial)
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
