//! Replay captured configuration onto destination devices and networks.
//!
//! Every slot is attempted on its own. A failed write is logged and left
//! out of the count; it never stops the remaining work.

use std::collections::HashSet;

use serde::Serialize;
use serde_json::{Map, Value, json};
use tracing::debug;

use crate::catalog::{self, Restore, SkipItem, Slot};
use crate::client::Dashboard;
use crate::error::CoreError;
use crate::log::RunLog;
use crate::model::{Device, DeviceConfig, ResourceMap, Snapshot, is_empty_document};

// ── Device ──────────────────────────────────────────────────────────

/// Restore one device's identity-free settings, then its switch ports.
///
/// Returns `false` only when the general settings write fails; port
/// failures are logged individually.
pub async fn restore_device(
    client: &Dashboard,
    serial: &str,
    config: &DeviceConfig,
    log: &RunLog,
) -> bool {
    let general = &config.general;
    log.info(format!(
        "Restoring general settings for {serial} (Name: {})...",
        general.name.as_deref().unwrap_or("-")
    ));
    if let Err(e) = client.update_device(serial, general_body(general)).await {
        log.fail(format!(
            "FAILED to restore device configuration for {serial}: {e}"
        ));
        return false;
    }
    log.success("General settings restored.");

    for key in config.resources.keys() {
        let Some((entry, slot)) = catalog::device_slot(key) else {
            continue;
        };
        let Restore::UpdateEach { id_field } = slot.restore else {
            continue;
        };
        let Some(items) = config.resources.get(key).value().and_then(Value::as_array) else {
            continue;
        };
        if items.is_empty() {
            continue;
        }
        log.info(format!(
            "Found {} {} to restore...",
            items.len(),
            slot.label.to_lowercase()
        ));
        for item in items {
            let Some((id, body)) = split_id(item, id_field) else {
                log.warn(format!("{}: item without {id_field}, skipped", slot.label));
                continue;
            };
            let path = format!("/devices/{serial}{}/{id}", entry.path);
            match client.put(&path, body).await {
                Ok(_) => log.success(format!("{} {id} configuration restored.", slot.label)),
                Err(e) => log.fail(format!("FAILED to restore {} {id}: {e}", slot.label)),
            }
        }
    }
    true
}

/// `name`, `tags` and `notes`; unset fields are left out rather than nulled.
fn general_body(general: &Device) -> Value {
    let mut body = Map::new();
    if let Some(name) = &general.name {
        body.insert("name".into(), Value::from(name.as_str()));
    }
    body.insert("tags".into(), json!(general.tags));
    if let Some(notes) = &general.notes {
        body.insert("notes".into(), Value::from(notes.as_str()));
    }
    Value::Object(body)
}

/// Split an item into its id (as a path segment) and the remaining body.
fn split_id(item: &Value, id_field: &str) -> Option<(String, Value)> {
    let mut body = item.as_object()?.clone();
    let id = match body.remove(id_field)? {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    Some((id, Value::Object(body)))
}

// ── Network ─────────────────────────────────────────────────────────

/// Replay every captured network slot onto `network_id`, in dependency
/// order. Returns how many slots (and SSIDs) were restored.
pub async fn restore_network(
    client: &Dashboard,
    network_id: &str,
    resources: &ResourceMap,
    log: &RunLog,
) -> usize {
    let root = format!("/networks/{network_id}");
    let mut restored = 0;

    for key in catalog::NETWORK_RESTORE_ORDER {
        let Some((entry, slot)) = catalog::network_slot(key) else {
            continue;
        };
        let Some(data) = resources
            .get(key)
            .value()
            .filter(|v| !is_empty_document(v))
        else {
            log.skip(format!("Skipping {} (no backup data).", slot.label));
            continue;
        };
        let path = format!("{root}{}", entry.path);

        match slot.restore {
            Restore::Replace => {
                if replace(client, &path, slot, data, log).await {
                    restored += 1;
                }
            }
            Restore::CreateEach { strip, skip } => {
                if create_each(client, &path, slot, data, strip, skip, log).await {
                    restored += 1;
                }
            }
            Restore::Ssids => {
                restored += restore_ssids(client, &path, data, resources, log).await;
            }
            Restore::Never | Restore::UpdateEach { .. } => {}
        }
    }
    restored
}

async fn replace(client: &Dashboard, path: &str, slot: Slot, data: &Value, log: &RunLog) -> bool {
    log.info(format!("Restoring {}...", slot.label));
    let body = match slot.field {
        Some(field) => json!({ field: data }),
        None => data.clone(),
    };
    match client.put(path, body).await {
        Ok(_) => {
            log.success(format!("{} restored successfully.", slot.label));
            true
        }
        Err(e) => {
            log.fail(format!("FAILED to restore {}: {e}", slot.label));
            false
        }
    }
}

/// `POST` each captured item that the destination does not already have.
/// The slot counts as restored when no item failed.
async fn create_each(
    client: &Dashboard,
    path: &str,
    slot: Slot,
    data: &Value,
    strip: &[&str],
    skip: SkipItem,
    log: &RunLog,
) -> bool {
    let Some(items) = data.as_array() else {
        log.warn(format!("{}: captured data is not a list, skipped", slot.label));
        return false;
    };
    log.info(format!("Restoring {} ({} items)...", slot.label, items.len()));

    let existing = existing_names(client, path).await;
    let mut ok = true;
    for item in items {
        let Some(source) = item.as_object() else {
            continue;
        };
        let name = source
            .get("name")
            .and_then(Value::as_str)
            .filter(|n| !n.is_empty());

        if skip == SkipItem::DefaultVlan && id_string(source.get("id")).as_deref() == Some("1") {
            debug!(slot = slot.key, "default VLAN left in place");
            continue;
        }
        if skip == SkipItem::Unnamed && name.is_none() {
            log.skip(format!("{}: unnamed item skipped", slot.label));
            continue;
        }
        if let Some(taken) = name.filter(|n| existing.contains(*n)) {
            log.skip(format!(
                "{}: \"{taken}\" already exists on the destination",
                slot.label
            ));
            continue;
        }
        let name = name.unwrap_or("(unnamed)");

        let body: Map<String, Value> = source
            .iter()
            .filter(|(k, _)| !strip.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        match client.post(path, Value::Object(body)).await {
            Ok(_) => log.success(format!("{} \"{name}\" restored.", slot.label)),
            Err(e) => {
                log.fail(format!("FAILED to restore {} \"{name}\": {e}", slot.label));
                ok = false;
            }
        }
    }
    ok
}

/// Names already present at `path` on the destination. A failed lookup
/// gives an empty set and every item is attempted.
async fn existing_names(client: &Dashboard, path: &str) -> HashSet<String> {
    match client.get(path).await {
        Ok(Some(Value::Array(items))) => items
            .iter()
            .filter_map(|i| i.get("name").and_then(Value::as_str))
            .map(str::to_owned)
            .collect(),
        Ok(_) => HashSet::new(),
        Err(e) => {
            debug!(path, error = %e, "could not list destination items");
            HashSet::new()
        }
    }
}

fn id_string(id: Option<&Value>) -> Option<String> {
    match id? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Match captured SSIDs to destination SSIDs by number. Only matched SSIDs
/// get their per-SSID slots replayed.
async fn restore_ssids(
    client: &Dashboard,
    path: &str,
    data: &Value,
    resources: &ResourceMap,
    log: &RunLog,
) -> usize {
    let Some(ssids) = data.as_array() else {
        return 0;
    };
    log.info(format!("Restoring {} SSIDs...", ssids.len()));

    let destination: Vec<u64> = match client.get(path).await {
        Ok(Some(Value::Array(list))) => list
            .iter()
            .filter_map(|s| s.get("number").and_then(Value::as_u64))
            .collect(),
        Ok(_) => Vec::new(),
        Err(e) => {
            log.fail(format!("FAILED to list destination SSIDs: {e}"));
            return 0;
        }
    };

    let mut restored = 0;
    for ssid in ssids {
        let Some(number) = ssid.get("number").and_then(Value::as_u64) else {
            continue;
        };
        let name = ssid.get("name").and_then(Value::as_str).unwrap_or_default();
        if !destination.contains(&number) {
            log.skip(format!(
                "Could not find a destination SSID with number {number} to update."
            ));
            continue;
        }

        let ssid_path = format!("{path}/{number}");
        if let Err(e) = client.put(&ssid_path, ssid.clone()).await {
            log.fail(format!("FAILED to restore SSID \"{name}\": {e}"));
            continue;
        }
        log.success(format!(
            "SSID \"{name}\" (Number: {number}) base settings updated."
        ));
        restored += 1;

        for (entry, slot) in catalog::ssid_slots() {
            let Some(rules) = resources.ssid(slot.key, number).value() else {
                continue;
            };
            let rule_path = format!("{ssid_path}{}", entry.path);
            log.info(format!("Restoring {} for SSID {number}...", slot.label));
            match client.put(&rule_path, rules.clone()).await {
                Ok(_) => {
                    log.success(format!(
                        "{} for SSID {number} restored successfully.",
                        slot.label
                    ));
                    restored += 1;
                }
                Err(e) => log.fail(format!(
                    "FAILED to restore {} for SSID {number}: {e}",
                    slot.label
                )),
            }
        }
    }
    restored
}

// ── Snapshot ────────────────────────────────────────────────────────

/// What to restore from a snapshot onto a destination.
#[derive(Debug, Clone, Default)]
pub struct RestorePlan {
    /// Destination devices; each is matched to the snapshot by serial.
    pub serials: Vec<String>,
    /// Network that receives the captured network settings. `None` restores
    /// devices only.
    pub destination_network: Option<String>,
    /// Source networks to replay. `None` replays every captured network.
    pub source_networks: Option<Vec<String>>,
}

/// Tally of a snapshot restore.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RestoreReport {
    pub devices_restored: usize,
    pub devices_failed: usize,
    /// Destination serials with no entry in the snapshot.
    pub devices_unmatched: usize,
    pub networks_replayed: usize,
    /// Network slots and SSIDs restored across every replayed network.
    pub network_items_restored: usize,
}

impl RestoreReport {
    pub fn summary(&self) -> String {
        format!(
            "{} devices restored, {} failed, {} without backup; {} network settings restored",
            self.devices_restored,
            self.devices_failed,
            self.devices_unmatched,
            self.network_items_restored
        )
    }
}

/// Restore matched devices, then replay source networks onto the
/// destination network.
pub async fn restore_snapshot(
    client: &Dashboard,
    snapshot: &Snapshot,
    plan: &RestorePlan,
    log: &RunLog,
) -> Result<RestoreReport, CoreError> {
    let mut report = RestoreReport::default();
    log.info(format!(
        "Restoring from backup of {} taken {}",
        snapshot.source_org_name,
        snapshot.created_at.format("%Y-%m-%d %H:%M UTC")
    ));

    for serial in &plan.serials {
        if client.is_cancelled() {
            return Err(CoreError::Cancelled);
        }
        let Some(backup) = snapshot.device(serial) else {
            log.skip(format!("No backup found for device {serial}"));
            report.devices_unmatched += 1;
            continue;
        };
        if restore_device(client, serial, &backup.config, log).await {
            report.devices_restored += 1;
        } else {
            report.devices_failed += 1;
        }
    }

    if let Some(destination) = &plan.destination_network {
        for (source_id, resources) in &snapshot.network_configs {
            if plan
                .source_networks
                .as_ref()
                .is_some_and(|only| !only.contains(source_id))
            {
                continue;
            }
            if client.is_cancelled() {
                return Err(CoreError::Cancelled);
            }
            log.info(format!(
                "Restoring settings of source network {source_id} onto {destination}"
            ));
            report.network_items_restored +=
                restore_network(client, destination, resources, log).await;
            report.networks_replayed += 1;
        }
    }

    log.success(format!("Restore complete: {}", report.summary()));
    Ok(report)
}
