// Migration state machine: fatal steps, explicit retry / skip, settle delay.
#![allow(clippy::unwrap_used)]

mod common;

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use common::{FakeDashboard, dashboard, lines_of};
use meraport_api::Method;
use meraport_core::{
    Device, LineKind, MemorySink, Migration, MigrationPlan, MigrationState, Organization, RunLog,
    Snapshot,
};

const CLAIM: &str = "/organizations/DST/inventory/claim";
const RELEASE: &str = "/organizations/SRC/inventory/release";
const ASSIGN: &str = "/networks/DN1/devices/claim";

fn devices() -> Vec<Device> {
    vec![
        serde_json::from_value(json!({"serial": "Q1", "name": "core", "model": "MS120-8", "networkId": "SN1"}))
            .unwrap(),
        serde_json::from_value(json!({"serial": "Q2", "name": "ap", "model": "MR36"})).unwrap(),
    ]
}

fn plan(fake: &Arc<FakeDashboard>) -> MigrationPlan {
    MigrationPlan {
        source: dashboard(fake),
        destination: dashboard(fake),
        source_org: serde_json::from_value::<Organization>(json!({"id": "SRC", "name": "Old Org"}))
            .unwrap(),
        destination_org_id: "DST".into(),
        destination_network_id: "DN1".into(),
        devices: devices(),
        snapshot: Some(Snapshot::new("SRC", "Old Org")),
        archive_dir: None,
    }
}

fn migration(fake: &Arc<FakeDashboard>) -> (Arc<MemorySink>, Migration) {
    let sink = Arc::new(MemorySink::new());
    let migration = Migration::new(plan(fake), RunLog::new(sink.clone())).unwrap();
    (sink, migration)
}

fn mentions(sink: &MemorySink, needle: &str) -> bool {
    sink.lines().iter().any(|l| l.message.contains(needle))
}

#[tokio::test(start_paused = true)]
async fn test_claim_failure_parks_the_machine() {
    let fake = FakeDashboard::new();
    fake.fail(Method::Post, CLAIM, 400, "Device already claimed in another organization");
    let (sink, mut migration) = migration(&fake);

    let state = migration.run().await;

    assert_eq!(state, MigrationState::Failed);
    assert_eq!(migration.failed_step(), Some(MigrationState::Claiming));
    assert!(migration.error().unwrap().contains("already claimed"));
    assert!(sink.rendered().iter().any(|l| l.starts_with("❌")));
    assert!(!mentions(&sink, "[AddingToNetwork]"));
    assert!(fake.calls_to(Method::Post, ASSIGN).is_empty());

    // Stepping a parked machine does nothing.
    assert_eq!(migration.step().await, MigrationState::Failed);
    assert!(!mentions(&sink, "[AddingToNetwork]"));
}

#[tokio::test(start_paused = true)]
async fn test_retry_re_enters_the_failed_step() {
    let fake = FakeDashboard::new();
    fake.fail(Method::Post, CLAIM, 400, "Device already claimed in another organization");
    let (sink, mut migration) = migration(&fake);
    migration.run().await;

    fake.clear(Method::Post, CLAIM);
    migration.retry().unwrap();
    assert_eq!(migration.state(), MigrationState::Claiming);
    let state = migration.run().await;

    assert_eq!(state, MigrationState::Complete);
    assert!(mentions(&sink, "[AddingToNetwork]"));
    assert_eq!(fake.calls_to(Method::Post, CLAIM).len(), 2);
    // Unclaim is not repeated by a retry of a later step.
    assert_eq!(fake.calls_to(Method::Post, RELEASE).len(), 1);
    assert_eq!(migration.report().migrated, vec!["Q1".to_owned(), "Q2".to_owned()]);
}

#[tokio::test(start_paused = true)]
async fn test_skip_to_restore_assumes_devices_moved() {
    let fake = FakeDashboard::new();
    fake.fail(Method::Post, RELEASE, 403, "Insufficient permissions");
    let (sink, mut migration) = migration(&fake);

    assert_eq!(migration.run().await, MigrationState::Failed);
    assert_eq!(migration.failed_step(), Some(MigrationState::Unclaiming));
    assert!(fake.calls_to(Method::Post, CLAIM).is_empty());

    migration.skip_to_restore().unwrap();
    assert_eq!(migration.state(), MigrationState::Restoring);
    assert_eq!(migration.run().await, MigrationState::Complete);

    let report = migration.report();
    assert_eq!(report.migrated.len(), 2);
    assert!(report.restore.is_some());
    assert!(fake.calls_to(Method::Post, CLAIM).is_empty());
    assert!(mentions(&sink, "User skipped migration step"));
}

#[tokio::test(start_paused = true)]
async fn test_removal_failure_only_warns() {
    let fake = FakeDashboard::new();
    fake.fail(Method::Post, "/networks/SN1/devices/remove", 400, "Device not in network");
    let (sink, mut migration) = migration(&fake);

    assert_eq!(migration.run().await, MigrationState::Complete);
    assert_eq!(migration.report().removal_warnings, 1);
    assert_eq!(lines_of(&sink, LineKind::Warn).len(), 1);
    assert!(lines_of(&sink, LineKind::Fail).is_empty());
    // Q2 has no network and is not removed.
    assert_eq!(fake.calls_to(Method::Post, "/networks/SN1/devices/remove").len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_settle_delay_separates_unclaim_and_claim() {
    let fake = FakeDashboard::new();
    let (_sink, mut migration) = migration(&fake);

    let mut unclaimed_at = None;
    while !migration.state().is_terminal() {
        let before = migration.state();
        migration.step().await;
        if before == MigrationState::Unclaiming {
            unclaimed_at = Some(Instant::now());
        }
        if before == MigrationState::AwaitingSync {
            let waited = unclaimed_at.unwrap().elapsed();
            assert!(waited >= Duration::from_secs(30), "waited {waited:?}");
        }
    }
    assert_eq!(migration.state(), MigrationState::Complete);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_during_settle_delay_fails_the_step() {
    let fake = FakeDashboard::new();
    let cancel = CancellationToken::new();
    let mut plan = plan(&fake);
    plan.source = plan.source.with_cancel(cancel.clone());
    let mut migration = Migration::new(plan, RunLog::silent()).unwrap();
    while migration.state() != MigrationState::AwaitingSync {
        migration.step().await;
    }

    cancel.cancel();

    assert_eq!(migration.step().await, MigrationState::Failed);
    assert_eq!(migration.failed_step(), Some(MigrationState::AwaitingSync));
    assert!(fake.calls_to(Method::Post, CLAIM).is_empty());
}

#[tokio::test]
async fn test_empty_device_list_is_rejected() {
    let fake = FakeDashboard::new();
    let mut plan = plan(&fake);
    plan.devices.clear();
    assert!(Migration::new(plan, RunLog::silent()).is_err());
}

#[tokio::test(start_paused = true)]
async fn test_safety_snapshot_is_taken_when_missing() {
    let fake = FakeDashboard::new();
    let mut plan = plan(&fake);
    plan.snapshot = None;
    let mut migration = Migration::new(plan, RunLog::silent()).unwrap();

    migration.step().await;

    assert_eq!(migration.state(), MigrationState::RemovingFromSource);
    let snapshot = migration.snapshot().unwrap();
    assert_eq!(snapshot.devices.len(), 2);
    assert!(snapshot.network_configs.contains_key("SN1"));
}

#[tokio::test]
async fn test_idle_writes_a_full_archive_when_asked() {
    let fake = FakeDashboard::new();
    fake.get("/organizations/SRC", json!({"id": "SRC", "name": "Old Org"}));
    fake.get("/organizations/SRC/networks", json!([]));
    fake.get("/organizations/SRC/devices?perPage=1000", json!([]));
    fake.get("/organizations/SRC/admins", json!([{"id": "a1", "name": "Ops"}]));
    let dir = tempfile::tempdir().unwrap();
    let mut plan = plan(&fake);
    plan.archive_dir = Some(dir.path().join("archives"));
    let sink = Arc::new(MemorySink::new());
    let mut migration = Migration::new(plan, RunLog::new(sink.clone())).unwrap();

    migration.step().await;

    assert_eq!(migration.state(), MigrationState::RemovingFromSource);
    let path = migration.archive().unwrap().clone();
    assert!(path.starts_with(dir.path().join("archives")));
    assert!(
        path.file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("meraki-full-backup-old-org-")
    );
    assert!(std::fs::metadata(&path).unwrap().len() > 0);
    assert!(
        lines_of(&sink, LineKind::Success)
            .iter()
            .any(|l| l.starts_with("Full backup saved to"))
    );
    assert_eq!(migration.report().archive, Some(path));
}

#[tokio::test]
async fn test_failed_archive_parks_idle_before_any_device_is_touched() {
    let fake = FakeDashboard::new();
    let dir = tempfile::tempdir().unwrap();
    let mut plan = plan(&fake);
    plan.archive_dir = Some(dir.path().to_path_buf());
    let mut migration = Migration::new(plan, RunLog::silent()).unwrap();

    assert_eq!(migration.run().await, MigrationState::Failed);

    assert_eq!(migration.failed_step(), Some(MigrationState::Idle));
    assert!(migration.archive().is_none());
    assert!(fake.writes().is_empty());
}
