use std::collections::BTreeMap;

use futures_util::future::join_all;
use indexmap::IndexSet;
use serde_json::Value;

use super::{Fetched, ensure_live};
use crate::catalog::{self, Entry, Slot};
use crate::client::Dashboard;
use crate::error::CoreError;
use crate::log::RunLog;
use crate::model::inventory::all_products;
use crate::model::{
    Device, DeviceBackup, DeviceConfig, Organization, ResourceMap, Snapshot, is_empty_document,
};

/// Capture the reduced slot set for `devices` and the networks they sit in.
///
/// Only the networks referenced by the devices are visited, once each, in
/// first-seen order. An empty device list is a missing prerequisite.
pub async fn backup_selected(
    client: &Dashboard,
    organization: &Organization,
    devices: &[Device],
    log: &RunLog,
) -> Result<Snapshot, CoreError> {
    if devices.is_empty() {
        return Err(CoreError::validation("no devices selected for backup"));
    }
    log.info("Starting selective backup");
    let mut snapshot = Snapshot::new(&organization.id, &organization.name);

    log.info("Backing up key organization-level configurations...");
    let root = format!("/organizations/{}", organization.id);
    snapshot.organization_config =
        capture_slots(client, log, &root, catalog::selective_organization_entries()).await;
    ensure_live(client)?;

    let network_ids: IndexSet<&str> = devices
        .iter()
        .filter_map(|d| d.network_id.as_deref())
        .collect();
    log.info(format!(
        "Found {} unique networks to back up.",
        network_ids.len()
    ));
    for network_id in network_ids {
        let resources = backup_network(client, log, network_id).await;
        snapshot
            .network_configs
            .insert(network_id.to_owned(), resources);
        ensure_live(client)?;
    }

    log.info(format!("Backing up {} selected devices", devices.len()));
    for device in devices {
        log.info(format!(
            "Backing up device: {} ({})",
            device.display_name(),
            device.serial
        ));
        let root = format!("/devices/{}", device.serial);
        let mut config = DeviceConfig::new(device.clone());
        config.resources = capture_slots(
            client,
            log,
            &root,
            catalog::selective_device_entries(&device.model),
        )
        .await;
        snapshot.devices.push(DeviceBackup {
            serial: device.serial.clone(),
            config,
        });
        ensure_live(client)?;
    }

    log.success(format!(
        "Selective backup complete: {} networks, {} devices",
        snapshot.network_configs.len(),
        snapshot.devices.len()
    ));
    Ok(snapshot)
}

async fn backup_network(client: &Dashboard, log: &RunLog, network_id: &str) -> ResourceMap {
    log.info(format!("Backing up network: {network_id}"));

    // Gating needs the product types; without them, try every family and
    // let the 404s fall out as skips.
    let products = match client.network(network_id).await {
        Ok(Some(network)) => network.products(),
        Ok(None) => {
            log.warn(format!(
                "Network {network_id} not found; trying every product family"
            ));
            all_products()
        }
        Err(e) => {
            log.warn(format!(
                "Could not read network {network_id} ({e}); trying every product family"
            ));
            all_products()
        }
    };

    let root = format!("/networks/{network_id}");
    let mut resources = capture_slots(
        client,
        log,
        &root,
        catalog::selective_network_entries(&products),
    )
    .await;

    let numbers = resources.ssid_numbers();
    if !numbers.is_empty() {
        log.info(format!(
            "Found {} SSIDs. Backing up their specific rules...",
            numbers.len()
        ));
        let root = root.as_str();
        let outcomes = join_all(
            numbers
                .iter()
                .flat_map(|&n| slots(catalog::selective_ssid_entries()).map(move |(e, s)| (n, e, s)))
                .map(|(n, entry, slot)| async move {
                    let endpoint = format!("{root}/wireless/ssids/{n}{}", entry.path);
                    let fetched = extract(Fetched::get(client, &endpoint).await, slot.field);
                    fetched.log(log, &endpoint);
                    (slot.key, n, fetched)
                }),
        )
        .await;

        let mut per_slot: BTreeMap<&str, BTreeMap<u64, Value>> = BTreeMap::new();
        for (key, n, fetched) in outcomes {
            if let Some(value) = fetched.into_value() {
                per_slot.entry(key).or_default().insert(n, value);
            }
        }
        for (key, by_number) in per_slot {
            resources.capture_per_ssid(key, by_number);
        }
    }

    log.success(format!("Network {network_id} configs backed up."));
    resources
}

fn slots(
    entries: impl Iterator<Item = &'static Entry>,
) -> impl Iterator<Item = (&'static Entry, Slot)> {
    entries.filter_map(|e| e.slot.map(|s| (e, s)))
}

/// Fetch the slotted `entries` under `root` concurrently into a resource map.
async fn capture_slots(
    client: &Dashboard,
    log: &RunLog,
    root: &str,
    entries: impl Iterator<Item = &'static Entry>,
) -> ResourceMap {
    let outcomes = join_all(slots(entries).map(|(entry, slot)| async move {
        let endpoint = format!("{root}{}", entry.path);
        let fetched = extract(Fetched::get(client, &endpoint).await, slot.field);
        fetched.log(log, &endpoint);
        (slot.key, fetched)
    }))
    .await;

    let mut map = ResourceMap::new();
    for (key, fetched) in outcomes {
        if let Some(value) = fetched.into_value() {
            map.capture(key, value);
        }
    }
    map
}

/// Narrow a captured document to the slot's field, if it has one.
fn extract(fetched: Fetched, field: Option<&str>) -> Fetched {
    match (fetched, field) {
        (Fetched::Captured(mut doc), Some(field)) => {
            match doc.get_mut(field).map(Value::take) {
                Some(value) if !is_empty_document(&value) => Fetched::Captured(value),
                _ => Fetched::Skipped,
            }
        }
        (other, _) => other,
    }
}
