//! Zip layout of an exhaustive backup.
//!
//! ```text
//! manifest.json
//! organization/details.json
//! organization/<entry>.json
//! networks/<safe-name>_<id>/details.json
//! networks/<safe-name>_<id>/<entry>.json
//! networks/<safe-name>_<id>/wireless_ssid_<n>_<entry>.json
//! devices/<safe-name>_<serial>/details.json
//! devices/<safe-name>_<serial>/<entry>.json
//! ```
//!
//! File names are part of the format; archives written by older builds
//! must keep parsing.

use std::collections::BTreeMap;
use std::io::{Cursor, Read, Write};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::backup::BackupReport;
use crate::error::CoreError;
use crate::log::RunLog;
use crate::model::{Device, Network};

pub const ORGANIZATION_DIR: &str = "organization";
pub const NETWORKS_DIR: &str = "networks";
pub const DEVICES_DIR: &str = "devices";
pub const DETAILS_FILE: &str = "details.json";
pub const MANIFEST_FILE: &str = "manifest.json";

// ── Naming ──────────────────────────────────────────────────────────

/// Replace every character outside `[A-Za-z0-9_.-]` with `_`.
pub fn safe_filename(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// `meraki-full-backup-<org>-<unix-millis>.zip`
pub fn backup_filename(org_name: &str, at: DateTime<Utc>) -> String {
    let org = org_name
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
        .to_lowercase();
    format!(
        "meraki-full-backup-{}-{}.zip",
        safe_filename(&org),
        at.timestamp_millis()
    )
}

pub fn network_dir(network: &Network) -> String {
    format!(
        "{NETWORKS_DIR}/{}_{}",
        safe_filename(&network.name),
        network.id
    )
}

pub fn device_dir(device: &Device) -> String {
    format!(
        "{DEVICES_DIR}/{}_{}",
        safe_filename(device.display_name()),
        device.serial
    )
}

// ── Manifest ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub created_at: DateTime<Utc>,
    pub organization_id: String,
    #[serde(default)]
    pub tool_version: String,
}

impl Manifest {
    pub fn new(organization_id: impl Into<String>) -> Self {
        Self {
            created_at: Utc::now(),
            organization_id: organization_id.into(),
            tool_version: env!("CARGO_PKG_VERSION").to_owned(),
        }
    }
}

// ── Archive ─────────────────────────────────────────────────────────

/// A finished exhaustive backup.
#[derive(Debug, Clone)]
pub struct Archive {
    pub filename: String,
    pub bytes: Vec<u8>,
    pub report: BackupReport,
}

// ── Writer ──────────────────────────────────────────────────────────

/// Collects pretty-printed JSON files and packs them into a zip.
#[derive(Debug, Default)]
pub struct ArchiveBuilder {
    files: BTreeMap<String, Vec<u8>>,
}

impl ArchiveBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_json(&mut self, path: impl Into<String>, value: &Value) -> Result<(), CoreError> {
        let bytes = serde_json::to_vec_pretty(value)?;
        self.files.insert(path.into(), bytes);
        Ok(())
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn finish(self) -> Result<Vec<u8>, CoreError> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .unix_permissions(0o644);

        for (path, bytes) in &self.files {
            zip.start_file(path.as_str(), options)?;
            zip.write_all(bytes)?;
        }

        let cursor = zip.finish()?;
        debug!(files = self.files.len(), "archive written");
        Ok(cursor.into_inner())
    }
}

// ── Reader ──────────────────────────────────────────────────────────

/// All entries of an archive, loaded into memory.
#[derive(Debug, Default)]
pub struct ArchiveReader {
    files: BTreeMap<String, Vec<u8>>,
}

impl ArchiveReader {
    pub fn open(bytes: &[u8]) -> Result<Self, CoreError> {
        let mut zip = ZipArchive::new(Cursor::new(bytes)).map_err(|e| CoreError::InvalidArchive {
            message: format!("unreadable zip container ({e})"),
        })?;

        let mut files = BTreeMap::new();
        for index in 0..zip.len() {
            let mut entry = zip.by_index(index)?;
            if entry.is_dir() {
                continue;
            }
            let Some(enclosed) = entry.enclosed_name() else {
                warn!(name = entry.name(), "skipping unsafe archive entry");
                continue;
            };
            let path = enclosed
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            let mut buf = Vec::with_capacity(usize::try_from(entry.size()).unwrap_or(0));
            entry.read_to_end(&mut buf)?;
            files.insert(path, buf);
        }
        Ok(Self { files })
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    /// Parse `path` as JSON. Missing files and `null` give `None`; a file
    /// that does not parse is reported on `log` and also gives `None`.
    pub fn read_json(&self, path: &str, log: &RunLog) -> Option<Value> {
        let bytes = self.files.get(path)?;
        match serde_json::from_slice::<Value>(bytes) {
            Ok(Value::Null) => None,
            Ok(value) => Some(value),
            Err(e) => {
                log.warn(format!("Could not parse JSON from {path}: {e}"));
                None
            }
        }
    }

    /// Immediate subfolders of `dir`, sorted.
    pub fn folders(&self, dir: &str) -> Vec<String> {
        let prefix = format!("{dir}/");
        let mut out: Vec<String> = Vec::new();
        for path in self.files.keys() {
            let Some(rest) = path.strip_prefix(&prefix) else {
                continue;
            };
            if let Some((folder, _)) = rest.split_once('/') {
                if !folder.is_empty() && out.last().map(String::as_str) != Some(folder) {
                    out.push(folder.to_owned());
                }
            }
        }
        out
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}
