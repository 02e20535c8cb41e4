//! Integration tests for the `meraport` binary.
//!
//! Argument parsing, error exit codes and a couple of end-to-end runs against
//! a wiremock relay proxy. Nothing here touches the user's configuration.
#![allow(clippy::unwrap_used)]

use std::io::Write;
use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

/// `meraport` with env isolation: no profile, no key, config dirs pointing
/// at a path that does not exist.
fn meraport_cmd() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("meraport");
    cmd.env("HOME", "/tmp/meraport-cli-test-nonexistent")
        .env("XDG_CONFIG_HOME", "/tmp/meraport-cli-test-nonexistent")
        .env_remove("MERAPORT_PROFILE")
        .env_remove("MERAPORT_API_KEY")
        .env_remove("MERAPORT_REGION")
        .env_remove("MERAPORT_ORG")
        .env_remove("MERAPORT_OUTPUT")
        .env_remove("MERAPORT_GATEWAY__TRANSPORT")
        .env_remove("MERAPORT_GATEWAY__PROXY_URL");
    cmd
}

/// Same, routed through a relay proxy at `proxy`.
fn proxied_cmd(proxy: &str) -> assert_cmd::Command {
    let mut cmd = meraport_cmd();
    cmd.env("MERAPORT_GATEWAY__TRANSPORT", "proxy")
        .env("MERAPORT_GATEWAY__PROXY_URL", format!("{proxy}/api/proxy"))
        .env("MERAPORT_API_KEY", "test-key");
    cmd
}

async fn answer(server: &MockServer, endpoint: &str, body: serde_json::Value) {
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "endpoint": endpoint })))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

fn write_zip(path: &Path, entries: &[(&str, serde_json::Value)]) {
    let file = std::fs::File::create(path).unwrap();
    let mut zip = zip::ZipWriter::new(file);
    for (name, value) in entries {
        zip.start_file(*name, zip::write::SimpleFileOptions::default())
            .unwrap();
        zip.write_all(value.to_string().as_bytes()).unwrap();
    }
    zip.finish().unwrap();
}

fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let output = meraport_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("Usage"));
}

#[test]
fn test_help_lists_commands() {
    meraport_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("backup")
            .and(predicate::str::contains("restore"))
            .and(predicate::str::contains("migrate")),
    );
}

#[test]
fn test_version_flag() {
    meraport_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("meraport"));
}

#[test]
fn test_completions_zsh() {
    meraport_cmd()
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

#[test]
fn test_config_path() {
    meraport_cmd()
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("meraport").and(predicate::str::contains("config.toml")));
}

// ── Usage errors ────────────────────────────────────────────────────

#[test]
fn test_selective_backup_requires_serials() {
    meraport_cmd()
        .args(["backup", "selective", "--org", "O1"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--serial"));
}

#[test]
fn test_migrate_requires_destination() {
    meraport_cmd()
        .args(["migrate", "--serial", "Q1", "--to-network", "N1"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--to-org"));
}

#[test]
fn test_migrate_help_offers_archive_dir() {
    meraport_cmd()
        .args(["migrate", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--archive-dir"));
}

#[test]
fn test_missing_credentials_exit_code() {
    meraport_cmd()
        .arg("orgs")
        .assert()
        .code(3)
        .stderr(predicate::str::contains("No API key configured"));
}

#[test]
fn test_unknown_region_is_rejected() {
    meraport_cmd()
        .args(["orgs", "--api-key", "k", "--region", "eu"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("region"));
}

#[test]
fn test_networks_need_an_organization() {
    meraport_cmd()
        .args(["networks", "--api-key", "k"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("No organization selected"));
}

// ── Restore input ───────────────────────────────────────────────────

#[test]
fn test_restore_rejects_garbage_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("snapshot.json");
    std::fs::write(&path, "{ not json").unwrap();

    meraport_cmd()
        .args(["restore", "--api-key", "k", "--yes"])
        .arg(&path)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("not a usable backup"));
}

#[test]
fn test_restore_archive_without_devices_needs_network() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("backup.zip");
    write_zip(
        &path,
        &[("organization/details.json", json!({"id": "O1", "name": "Acme"}))],
    );

    meraport_cmd()
        .args(["restore", "--api-key", "k", "--yes"])
        .arg(&path)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("holds no devices"));
}

// ── End to end through a relay proxy ────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn test_orgs_plain_output() {
    let server = MockServer::start().await;
    answer(
        &server,
        "/organizations",
        json!([{"id": "O1", "name": "Acme"}, {"id": "O2", "name": "Globex"}]),
    )
    .await;

    let uri = server.uri();
    let output = tokio::task::spawn_blocking(move || {
        proxied_cmd(&uri).args(["orgs", "-o", "plain"]).output().unwrap()
    })
    .await
    .unwrap();

    assert!(output.status.success(), "{}", combined_output(&output));
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "O1\nO2");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_full_backup_writes_archive() {
    let server = MockServer::start().await;
    answer(&server, "/organizations/O1", json!({"id": "O1", "name": "Acme Corp"})).await;
    answer(&server, "/organizations/O1/networks", json!([])).await;
    answer(&server, "/organizations/O1/devices?perPage=1000", json!([])).await;
    answer(&server, "/organizations/O1/admins", json!([{"id": "A1", "name": "Ops"}])).await;

    let dir = tempfile::tempdir().unwrap();
    let out_dir = dir.path().to_path_buf();
    let uri = server.uri();
    let output = tokio::task::spawn_blocking(move || {
        proxied_cmd(&uri)
            .args(["backup", "full", "--org", "O1", "--out-dir"])
            .arg(&out_dir)
            .output()
            .unwrap()
    })
    .await
    .unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));

    let archive = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().path())
        .find(|p| {
            p.file_name()
                .unwrap()
                .to_string_lossy()
                .starts_with("meraki-full-backup-acme-corp-")
        })
        .expect("archive written");

    let mut zip = zip::ZipArchive::new(std::fs::File::open(archive).unwrap()).unwrap();
    assert!(zip.by_name("organization/details.json").is_ok());
    assert!(zip.by_name("organization/admins.json").is_ok());
}
