// Restore engine: per-slot isolation, SSID number matching, creation rules.
#![allow(clippy::unwrap_used)]

mod common;

use pretty_assertions::assert_eq;
use serde_json::json;

use common::{FakeDashboard, dashboard, lines_of, memory_log};
use meraport_api::Method;
use meraport_core::{
    DeviceBackup, DeviceConfig, LineKind, ResourceMap, RestorePlan, RunLog, Snapshot,
    restore_device, restore_network, restore_snapshot,
};

fn ten_replace_slots() -> ResourceMap {
    let mut map = ResourceMap::new();
    map.capture("syslogServers", json!([{"host": "10.0.0.9", "port": 514}]));
    map.capture("snmp", json!({"access": "community", "communityString": "s3cret"}));
    map.capture("applianceL3FirewallRules", json!({"rules": [{"policy": "deny"}]}));
    map.capture("applianceL7FirewallRules", json!({"rules": [{"policy": "deny"}]}));
    map.capture("siteToSiteVpnSettings", json!({"mode": "spoke"}));
    map.capture("intrusionSettings", json!({"mode": "prevention"}));
    map.capture("malwareSettings", json!({"mode": "enabled"}));
    map.capture("switchSettings", json!({"vlan": 10}));
    map.capture("switchAcls", json!({"rules": []}));
    map.capture("networkAlerts", json!({"defaultDestinations": {"allAdmins": true}}));
    map
}

#[tokio::test]
async fn test_one_failing_slot_does_not_stop_the_other_nine() {
    let fake = FakeDashboard::new();
    fake.fail(
        Method::Put,
        "/networks/D1/appliance/security/malware",
        400,
        "Malware protection requires an Advanced Security license",
    );
    let (sink, log) = memory_log();

    let restored = restore_network(&dashboard(&fake), "D1", &ten_replace_slots(), &log).await;

    assert_eq!(restored, 9);
    let fails = lines_of(&sink, LineKind::Fail);
    assert_eq!(fails.len(), 1);
    assert!(fails[0].contains("Malware Protection"));
    assert_eq!(fake.writes().len(), 10);
}

#[tokio::test]
async fn test_syslog_servers_are_wrapped_back() {
    let fake = FakeDashboard::new();
    restore_network(&dashboard(&fake), "D1", &ten_replace_slots(), &RunLog::silent()).await;

    let puts = fake.calls_to(Method::Put, "/networks/D1/syslogServers");
    assert_eq!(puts.len(), 1);
    assert_eq!(
        puts[0].body,
        Some(json!({"servers": [{"host": "10.0.0.9", "port": 514}]}))
    );
}

#[tokio::test]
async fn test_vlans_restore_first_and_group_policies_before_ssids() {
    let fake = FakeDashboard::new();
    fake.get("/networks/D1/wireless/ssids", json!([{"number": 0}]));
    let mut map = ten_replace_slots();
    map.capture("applianceVlans", json!([{"id": "10", "name": "Data", "subnet": "10.0.10.0/24"}]));
    map.capture("groupPolicies", json!([{"groupPolicyId": "100", "name": "Guests"}]));
    map.capture("ssids", json!([{"number": 0, "name": "Corp"}]));

    restore_network(&dashboard(&fake), "D1", &map, &RunLog::silent()).await;

    let order: Vec<String> = fake.writes().into_iter().map(|c| c.endpoint).collect();
    assert_eq!(order.first().map(String::as_str), Some("/networks/D1/appliance/vlans"));
    let policies = order.iter().position(|e| e == "/networks/D1/groupPolicies").unwrap();
    let ssid = order.iter().position(|e| e == "/networks/D1/wireless/ssids/0").unwrap();
    assert!(policies < ssid);
}

#[tokio::test]
async fn test_missing_destination_ssid_number_is_skipped() {
    let fake = FakeDashboard::new();
    fake.get(
        "/networks/D1/wireless/ssids",
        json!([{"number": 0, "name": "Unconfigured SSID 1"}, {"number": 1, "name": "Unconfigured SSID 2"}]),
    );
    let mut map = ResourceMap::new();
    map.capture("ssids", json!([{"number": 3, "name": "Guest", "enabled": true}]));
    let (sink, log) = memory_log();

    let restored = restore_network(&dashboard(&fake), "D1", &map, &log).await;

    assert_eq!(restored, 0);
    assert!(lines_of(&sink, LineKind::Skip)
        .iter()
        .any(|l| l.contains("destination SSID with number 3")));
    assert!(lines_of(&sink, LineKind::Fail).is_empty());
    assert!(fake.writes().is_empty());
}

#[tokio::test]
async fn test_matched_ssid_restores_its_own_rules() {
    let fake = FakeDashboard::new();
    fake.get("/networks/D1/wireless/ssids", json!([{"number": 0}, {"number": 3}]));
    let mut map = ResourceMap::new();
    map.capture(
        "ssids",
        json!([{"number": 3, "name": "Guest"}, {"number": 5, "name": "IoT"}]),
    );
    map.capture(
        "ssidFirewallL3Rules",
        json!({"3": {"rules": [{"policy": "deny"}]}, "5": {"rules": []}}),
    );
    map.capture("ssidTrafficShaping", json!({"3": {"trafficShapingEnabled": true}}));

    let restored = restore_network(&dashboard(&fake), "D1", &map, &RunLog::silent()).await;

    assert_eq!(restored, 3);
    let written: Vec<String> = fake.writes().into_iter().map(|c| c.endpoint).collect();
    assert_eq!(
        written,
        vec![
            "/networks/D1/wireless/ssids/3",
            "/networks/D1/wireless/ssids/3/firewall/l3FirewallRules",
            "/networks/D1/wireless/ssids/3/trafficShaping/rules",
        ]
    );
}

#[tokio::test]
async fn test_creation_strips_identity_and_skips_existing() {
    let fake = FakeDashboard::new();
    fake.get(
        "/networks/D1/appliance/vlans",
        json!([{"id": "1", "name": "Default"}, {"id": "20", "name": "Voice"}]),
    );
    let mut map = ResourceMap::new();
    map.capture(
        "applianceVlans",
        json!([
            {"id": 1, "networkId": "N1", "name": "Default"},
            {"id": "10", "networkId": "N1", "name": "Data", "subnet": "10.0.10.0/24"},
            {"id": "20", "networkId": "N1", "name": "Voice", "subnet": "10.0.20.0/24"}
        ]),
    );
    map.capture(
        "wirelessRfProfiles",
        json!([{"id": "p1", "bandSelectionType": "ap"}, {"id": "p2", "name": "Hall"}]),
    );
    let (sink, log) = memory_log();

    let restored = restore_network(&dashboard(&fake), "D1", &map, &log).await;

    assert_eq!(restored, 2);
    let vlans = fake.calls_to(Method::Post, "/networks/D1/appliance/vlans");
    assert_eq!(vlans.len(), 1);
    assert_eq!(
        vlans[0].body,
        Some(json!({"name": "Data", "subnet": "10.0.10.0/24"}))
    );
    let profiles = fake.calls_to(Method::Post, "/networks/D1/wireless/rfProfiles");
    assert_eq!(profiles.len(), 1);
    assert_eq!(profiles[0].body, Some(json!({"name": "Hall"})));
    assert!(lines_of(&sink, LineKind::Skip)
        .iter()
        .any(|l| l.contains("\"Voice\" already exists")));
}

#[tokio::test]
async fn test_capture_only_slots_are_never_written() {
    let fake = FakeDashboard::new();
    let mut map = ResourceMap::new();
    map.capture("floorplans", json!([{"floorPlanId": "f1", "name": "Level 1"}]));
    map.capture("qosRules", json!([{"vlan": 10, "dscp": 46}]));

    let restored = restore_network(&dashboard(&fake), "D1", &map, &RunLog::silent()).await;

    assert_eq!(restored, 0);
    assert!(fake.writes().is_empty());
}

// ── Devices ─────────────────────────────────────────────────────────

fn switch_config() -> DeviceConfig {
    let general = serde_json::from_value(json!({
        "serial": "Q1",
        "model": "MS250-48",
        "name": "core",
        "tags": ["floor-2"],
        "notes": "rack A",
        "mac": "00:11:22:33:44:55",
        "lanIp": "10.0.0.2"
    }))
    .unwrap();
    let mut config = DeviceConfig::new(general);
    config.resources.capture(
        "switchPorts",
        json!([
            {"portId": "1", "enabled": true, "vlan": 10},
            {"portId": "2", "enabled": true, "vlan": 20},
            {"portId": "3", "enabled": false}
        ]),
    );
    config
}

#[tokio::test]
async fn test_device_restore_writes_only_name_tags_notes() {
    let fake = FakeDashboard::new();
    assert!(restore_device(&dashboard(&fake), "Q1", &switch_config(), &RunLog::silent()).await);

    let general = fake.calls_to(Method::Put, "/devices/Q1");
    assert_eq!(
        general[0].body,
        Some(json!({"name": "core", "tags": ["floor-2"], "notes": "rack A"}))
    );
    let port = fake.calls_to(Method::Put, "/devices/Q1/switch/ports/2");
    assert_eq!(port[0].body, Some(json!({"enabled": true, "vlan": 20})));
}

#[tokio::test]
async fn test_port_failure_is_isolated() {
    let fake = FakeDashboard::new();
    fake.fail(Method::Put, "/devices/Q1/switch/ports/2", 400, "Invalid VLAN");
    let (sink, log) = memory_log();

    assert!(restore_device(&dashboard(&fake), "Q1", &switch_config(), &log).await);

    assert_eq!(lines_of(&sink, LineKind::Fail).len(), 1);
    assert_eq!(fake.calls_to(Method::Put, "/devices/Q1/switch/ports/3").len(), 1);
}

#[tokio::test]
async fn test_unset_name_and_notes_are_left_out() {
    let fake = FakeDashboard::new();
    let general =
        serde_json::from_value(json!({"serial": "Q9", "model": "MR56", "tags": []})).unwrap();

    assert!(
        restore_device(&dashboard(&fake), "Q9", &DeviceConfig::new(general), &RunLog::silent())
            .await
    );

    let body = fake.calls_to(Method::Put, "/devices/Q9")[0].body.clone();
    assert_eq!(body, Some(json!({"tags": []})));
}

#[tokio::test]
async fn test_item_log_lines_name_the_slot() {
    let fake = FakeDashboard::new();
    fake.fail(Method::Put, "/devices/Q1/switch/ports/2", 400, "Invalid VLAN");
    let (sink, log) = memory_log();

    restore_device(&dashboard(&fake), "Q1", &switch_config(), &log).await;

    let successes = lines_of(&sink, LineKind::Success);
    assert!(successes.contains(&"Switch Ports 1 configuration restored.".to_owned()));
    let failures = lines_of(&sink, LineKind::Fail);
    assert!(failures[0].starts_with("FAILED to restore Switch Ports 2:"));
}

#[tokio::test]
async fn test_general_write_failure_fails_the_device() {
    let fake = FakeDashboard::new();
    fake.fail(Method::Put, "/devices/Q1", 400, "Device is not in this organization");

    assert!(!restore_device(&dashboard(&fake), "Q1", &switch_config(), &RunLog::silent()).await);
    assert!(fake
        .calls()
        .iter()
        .all(|c| !c.endpoint.contains("/switch/ports")));
}

// ── Snapshot ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_snapshot_restore_matches_by_serial() {
    let fake = FakeDashboard::new();
    let mut snapshot = Snapshot::new("O1", "Acme");
    snapshot.devices.push(DeviceBackup {
        serial: "Q1".into(),
        config: switch_config(),
    });
    let mut net = ResourceMap::new();
    net.capture("snmp", json!({"access": "none"}));
    snapshot.network_configs.insert("N1".into(), net);

    let plan = RestorePlan {
        serials: vec!["Q1".into(), "Q7".into()],
        destination_network: Some("D1".into()),
        source_networks: None,
    };
    let report = restore_snapshot(&dashboard(&fake), &snapshot, &plan, &RunLog::silent())
        .await
        .unwrap();

    assert_eq!(report.devices_restored, 1);
    assert_eq!(report.devices_unmatched, 1);
    assert_eq!(report.networks_replayed, 1);
    assert_eq!(report.network_items_restored, 1);
    assert_eq!(fake.calls_to(Method::Put, "/networks/D1/snmp").len(), 1);
    assert!(fake.calls_to(Method::Put, "/devices/Q7").is_empty());
}
