//! Rebuild a [`Snapshot`] from an exhaustive backup archive.
//!
//! Networks are keyed by the id inside their `details.json`, never by folder
//! name. A slot is captured exactly when its file is present, which is
//! exactly when the backup logged it as a success.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::archive::{
    ArchiveReader, DETAILS_FILE, DEVICES_DIR, MANIFEST_FILE, Manifest, NETWORKS_DIR,
    ORGANIZATION_DIR,
};
use crate::catalog::{self, Slot};
use crate::error::CoreError;
use crate::log::RunLog;
use crate::model::{
    Device, DeviceBackup, DeviceConfig, Network, Organization, ResourceMap, Snapshot,
};

/// Parse archive bytes into a snapshot.
///
/// Fails only when the container is unreadable or has no
/// `organization/details.json`.
pub fn parse_archive(bytes: &[u8], log: &RunLog) -> Result<Snapshot, CoreError> {
    log.info("Parsing backup archive...");
    let reader = ArchiveReader::open(bytes)?;

    let org_path = format!("{ORGANIZATION_DIR}/{DETAILS_FILE}");
    let organization: Organization = match reader.read_json(&org_path, log) {
        Some(value) => serde_json::from_value(value).map_err(|e| CoreError::InvalidArchive {
            message: format!("{org_path} is not an organization record ({e})"),
        })?,
        None => {
            return Err(CoreError::InvalidArchive {
                message: format!("could not find '{org_path}' in the backup file"),
            });
        }
    };
    log.info(format!("Found source organization: {}", organization.name));

    let mut snapshot = Snapshot::new(&organization.id, &organization.name);
    if let Some(manifest) = reader
        .read_json(MANIFEST_FILE, log)
        .and_then(|v| serde_json::from_value::<Manifest>(v).ok())
    {
        snapshot.created_at = manifest.created_at;
    }

    for entry in catalog::organization_entries() {
        if let Some(slot) = entry.slot {
            let path = format!("{ORGANIZATION_DIR}/{}", entry.file_name());
            if let Some(value) = read_slot(&reader, &path, slot, log) {
                snapshot.organization_config.capture(slot.key, value);
            }
        }
    }

    parse_devices(&reader, &mut snapshot, log);
    parse_networks(&reader, &mut snapshot, log);

    log.success(format!(
        "Parsed backup: {} networks, {} devices",
        snapshot.network_configs.len(),
        snapshot.devices.len()
    ));
    Ok(snapshot)
}

fn parse_devices(reader: &ArchiveReader, snapshot: &mut Snapshot, log: &RunLog) {
    let folders = reader.folders(DEVICES_DIR);
    if folders.is_empty() {
        return;
    }
    log.info("Scanning for device configurations...");

    for folder in folders {
        let dir = format!("{DEVICES_DIR}/{folder}");
        let details_path = format!("{dir}/{DETAILS_FILE}");
        let Some(general) = reader
            .read_json(&details_path, log)
            .and_then(|v| serde_json::from_value::<Device>(v).ok())
        else {
            log.warn(format!("No readable {details_path}; skipping folder"));
            continue;
        };

        let mut config = DeviceConfig::new(general);
        for entry in catalog::device_entries(&config.general.model) {
            if let Some(slot) = entry.slot {
                let path = format!("{dir}/{}", entry.file_name());
                if let Some(value) = read_slot(reader, &path, slot, log) {
                    config.resources.capture(slot.key, value);
                }
            }
        }

        log.info(format!(
            "Found config for {} ({})",
            config.general.display_name(),
            config.general.serial
        ));
        snapshot.devices.push(DeviceBackup {
            serial: config.general.serial.clone(),
            config,
        });
    }
}

fn parse_networks(reader: &ArchiveReader, snapshot: &mut Snapshot, log: &RunLog) {
    let folders = reader.folders(NETWORKS_DIR);
    if folders.is_empty() {
        return;
    }
    log.info("Scanning for network configurations...");

    for folder in folders {
        let dir = format!("{NETWORKS_DIR}/{folder}");
        let details_path = format!("{dir}/{DETAILS_FILE}");
        let Some(network) = reader
            .read_json(&details_path, log)
            .and_then(|v| serde_json::from_value::<Network>(v).ok())
        else {
            log.warn(format!("No readable {details_path}; skipping folder"));
            continue;
        };
        log.info(format!("Found network: {} ({})", network.name, network.id));

        let mut resources = ResourceMap::new();
        for entry in catalog::NETWORK {
            if let Some(slot) = entry.slot {
                let path = format!("{dir}/{}", entry.file_name());
                if let Some(value) = read_slot(reader, &path, slot, log) {
                    resources.capture(slot.key, value);
                }
            }
        }

        let numbers = resources.ssid_numbers();
        for (entry, slot) in catalog::ssid_slots() {
            let by_number: BTreeMap<u64, Value> = numbers
                .iter()
                .filter_map(|&n| {
                    let path = format!("{dir}/{}", entry.ssid_file_name(n));
                    read_slot(reader, &path, slot, log).map(|v| (n, v))
                })
                .collect();
            resources.capture_per_ssid(slot.key, by_number);
        }

        snapshot.network_configs.insert(network.id, resources);
    }
}

/// Read one slot file, narrowing to the slot's field when it has one.
/// An empty field is still a capture: the backup logged it as one.
fn read_slot(reader: &ArchiveReader, path: &str, slot: Slot, log: &RunLog) -> Option<Value> {
    let mut value = reader.read_json(path, log)?;
    match slot.field {
        Some(field) => value.get_mut(field).map(Value::take),
        None => Some(value),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::archive::ArchiveBuilder;
    use crate::log::{LineKind, MemorySink};

    fn zip(files: &[(&str, Value)]) -> Vec<u8> {
        let mut builder = ArchiveBuilder::new();
        for (path, value) in files {
            builder.insert_json(*path, value).unwrap();
        }
        builder.finish().unwrap()
    }

    #[test]
    fn missing_org_details_is_not_a_backup() {
        let bytes = zip(&[("networks/HQ_N1/details.json", json!({"id": "N1", "name": "HQ"}))]);
        let err = parse_archive(&bytes, &RunLog::silent()).unwrap_err();
        assert!(err.to_string().starts_with("Not a valid backup"));
    }

    #[test]
    fn networks_keyed_by_embedded_id() {
        let bytes = zip(&[
            ("organization/details.json", json!({"id": "O1", "name": "Acme"})),
            ("organization/snmp.json", json!({"v3Enabled": false})),
            (
                "networks/Renamed_Folder/details.json",
                json!({"id": "L_42", "name": "HQ", "productTypes": ["wireless"]}),
            ),
            (
                "networks/Renamed_Folder/syslogServers.json",
                json!({"servers": [{"host": "10.0.0.9", "port": 514}]}),
            ),
            (
                "networks/Renamed_Folder/wireless_ssids.json",
                json!([{"number": 0, "name": "Corp"}, {"number": 3, "name": "Guest"}]),
            ),
            (
                "networks/Renamed_Folder/wireless_ssid_3_firewall_l3FirewallRules.json",
                json!({"rules": [{"policy": "deny"}]}),
            ),
        ]);
        let snap = parse_archive(&bytes, &RunLog::silent()).unwrap();

        assert_eq!(snap.source_org_id, "O1");
        assert!(snap.organization_config.contains("snmp"));
        let net = &snap.network_configs["L_42"];
        assert_eq!(
            net.get("syslogServers").value(),
            Some(&json!([{"host": "10.0.0.9", "port": 514}]))
        );
        assert!(net.ssid("ssidFirewallL3Rules", 3).is_captured());
        assert!(!net.ssid("ssidFirewallL3Rules", 0).is_captured());
        assert!(!net.contains("ssidTrafficShaping"));
    }

    #[test]
    fn device_files_follow_model_gating() {
        let bytes = zip(&[
            ("organization/details.json", json!({"id": "O1", "name": "Acme"})),
            (
                "devices/core_Q1/details.json",
                json!({"serial": "Q1", "model": "MS250-48", "name": "core"}),
            ),
            ("devices/core_Q1/switch_ports.json", json!([{"portId": "1"}])),
            (
                "devices/ap_Q2/details.json",
                json!({"serial": "Q2", "model": "MR56", "name": "ap"}),
            ),
            // Not a slot for wireless devices.
            ("devices/ap_Q2/switch_ports.json", json!([{"portId": "1"}])),
        ]);
        let snap = parse_archive(&bytes, &RunLog::silent()).unwrap();
        assert_eq!(snap.devices.len(), 2);
        assert!(snap.device("Q1").unwrap().config.resources.contains("switchPorts"));
        assert!(snap.device("Q2").unwrap().config.resources.is_empty());
    }

    #[test]
    fn unparsable_file_warns_and_is_absent() {
        use std::io::{Cursor, Write};

        let options = zip::write::SimpleFileOptions::default();
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        writer.start_file("organization/details.json", options).unwrap();
        writer.write_all(br#"{"id": "O1", "name": "Acme"}"#).unwrap();
        writer.start_file("organization/policyObjects.json", options).unwrap();
        writer.write_all(b"{not json").unwrap();
        let bytes = writer.finish().unwrap().into_inner();

        let sink = Arc::new(MemorySink::new());
        let snap = parse_archive(&bytes, &RunLog::new(sink.clone())).unwrap();
        assert!(!snap.organization_config.contains("policyObjects"));
        assert_eq!(sink.count(LineKind::Warn), 1);
    }
}
