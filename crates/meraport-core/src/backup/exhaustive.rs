use std::collections::BTreeMap;

use chrono::Utc;
use futures_util::future::join_all;
use serde_json::Value;
use tracing::debug;

use super::{BackupReport, Fetched, ensure_live};
use crate::archive::{
    Archive, ArchiveBuilder, DETAILS_FILE, MANIFEST_FILE, Manifest, ORGANIZATION_DIR,
    backup_filename, device_dir, network_dir,
};
use crate::catalog::{self, Entry};
use crate::client::Dashboard;
use crate::error::CoreError;
use crate::log::RunLog;
use crate::model::snapshot::ssid_numbers;
use crate::model::{Device, Network, ProductType};

/// One file to fetch: where it goes in the archive and where it comes from.
struct Job {
    entry: &'static Entry,
    archive_path: String,
    endpoint: String,
}

/// Captured documents of one scope, keyed by entry file stem.
type Captured = BTreeMap<&'static str, Value>;

/// Capture every catalog entry of an organization into a zip archive.
///
/// Organization details and the network and device inventories are
/// prerequisites; failing to read them aborts the run. Every other entry
/// is captured, skipped or failed on its own.
pub async fn backup_exhaustive(
    client: &Dashboard,
    org_id: &str,
    log: &RunLog,
) -> Result<Archive, CoreError> {
    log.info("Starting exhaustive backup");
    let organization = client.organization(org_id).await?;

    log.info("Fetching core inventories (networks and devices)...");
    let (networks, devices) = tokio::try_join!(client.networks(org_id), client.devices(org_id))?;
    log.info(format!(
        "Found {} networks and {} devices",
        networks.len(),
        devices.len()
    ));

    let mut run = Run::new(client, log);

    // Organization
    log.info(format!("Backing up organization: {}", organization.name));
    run.details(
        &format!("{ORGANIZATION_DIR}/{DETAILS_FILE}"),
        &serde_json::to_value(&organization)?,
    )?;
    let root = format!("/organizations/{org_id}");
    let jobs = catalog::organization_entries()
        .map(|entry| Job {
            entry,
            archive_path: format!("{ORGANIZATION_DIR}/{}", entry.file_name()),
            endpoint: format!("{root}{}", entry.path),
        })
        .collect();
    run.fetch_all(jobs).await?;
    ensure_live(client)?;

    // Networks
    for network in &networks {
        run.network(network).await?;
        ensure_live(client)?;
    }

    // Devices
    for device in &devices {
        run.device(device).await?;
        ensure_live(client)?;
    }

    let manifest = Manifest::new(org_id);
    run.builder
        .insert_json(MANIFEST_FILE, &serde_json::to_value(&manifest)?)?;

    log.info("Generating backup ZIP file...");
    let Run {
        builder, report, ..
    } = run;
    let bytes = builder.finish()?;
    log.success(format!("Backup complete: {}", report.summary()));

    Ok(Archive {
        filename: backup_filename(&organization.name, Utc::now()),
        bytes,
        report,
    })
}

/// Accumulating state of one exhaustive run.
struct Run<'a> {
    client: &'a Dashboard,
    log: &'a RunLog,
    builder: ArchiveBuilder,
    report: BackupReport,
}

impl<'a> Run<'a> {
    fn new(client: &'a Dashboard, log: &'a RunLog) -> Self {
        Self {
            client,
            log,
            builder: ArchiveBuilder::new(),
            report: BackupReport::default(),
        }
    }

    /// Inventory records are already in hand; write them straight in.
    fn details(&mut self, path: &str, record: &Value) -> Result<(), CoreError> {
        self.builder.insert_json(path, record)?;
        self.log.success(format!("Success: {path}"));
        Ok(())
    }

    async fn network(&mut self, network: &Network) -> Result<(), CoreError> {
        self.log.info(format!(
            "Backing up network: {} ({})",
            network.name, network.id
        ));
        let dir = network_dir(network);
        self.details(
            &format!("{dir}/{DETAILS_FILE}"),
            &serde_json::to_value(network)?,
        )?;

        let products = network.products();
        let root = format!("/networks/{}", network.id);
        let jobs = catalog::network_entries(&products)
            .map(|entry| Job {
                entry,
                archive_path: format!("{dir}/{}", entry.file_name()),
                endpoint: format!("{root}{}", entry.path),
            })
            .collect();
        let captured = self.fetch_all(jobs).await?;

        if !products.contains(&ProductType::Wireless) {
            return Ok(());
        }
        let numbers = ssid_numbers(
            catalog::NETWORK
                .iter()
                .find(|e| e.slot_key() == Some(catalog::SSIDS_KEY))
                .and_then(|e| captured.get(e.file)),
        );
        if numbers.is_empty() {
            return Ok(());
        }

        debug!(network = %network.id, ssids = numbers.len(), "fanning out per-SSID entries");
        let jobs = numbers
            .iter()
            .flat_map(|n| catalog::ssid_entries().map(move |entry| (n, entry)))
            .map(|(n, entry)| Job {
                entry,
                archive_path: format!("{dir}/{}", entry.ssid_file_name(*n)),
                endpoint: format!("{root}/wireless/ssids/{n}{}", entry.path),
            })
            .collect();
        self.fetch_all(jobs).await?;
        Ok(())
    }

    async fn device(&mut self, device: &Device) -> Result<(), CoreError> {
        self.log.info(format!(
            "Backing up device: {} ({})",
            device.display_name(),
            device.serial
        ));
        let dir = device_dir(device);
        self.details(
            &format!("{dir}/{DETAILS_FILE}"),
            &serde_json::to_value(device)?,
        )?;

        let root = format!("/devices/{}", device.serial);
        let jobs = catalog::device_entries(&device.model)
            .map(|entry| Job {
                entry,
                archive_path: format!("{dir}/{}", entry.file_name()),
                endpoint: format!("{root}{}", entry.path),
            })
            .collect();
        self.fetch_all(jobs).await?;
        Ok(())
    }

    /// Fetch a scope's entries concurrently; the gateway bounds the actual
    /// parallelism. Each outcome is logged as it lands, then merged.
    async fn fetch_all(&mut self, jobs: Vec<Job>) -> Result<Captured, CoreError> {
        let client = self.client;
        let log = self.log;
        let outcomes = join_all(jobs.into_iter().map(|job| async move {
            let fetched = Fetched::get(client, &job.endpoint).await;
            fetched.log(log, &job.archive_path);
            (job, fetched)
        }))
        .await;

        let mut captured = Captured::new();
        for (job, fetched) in outcomes {
            self.report.record(&job.archive_path, &fetched);
            if let Some(value) = fetched.into_value() {
                self.builder.insert_json(job.archive_path, &value)?;
                captured.insert(job.entry.file, value);
            }
        }
        Ok(captured)
    }
}
