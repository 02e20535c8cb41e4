//! Device migration between two organizations as an explicit state machine.
//!
//! ```text
//! Idle → RemovingFromSource → Unclaiming → AwaitingSync → Claiming
//!      → AddingToNetwork → Restoring → Complete
//! ```
//!
//! Every state has one executor. A fatal executor error parks the machine
//! in `Failed` and remembers the step; from there only an explicit
//! [`Migration::retry`] or [`Migration::skip_to_restore`] moves it again.

use std::path::PathBuf;
use std::time::Duration;

use futures_util::future::join_all;
use serde::Serialize;
use strum::Display;

use crate::backup::{backup_exhaustive, backup_selected};
use crate::client::Dashboard;
use crate::error::CoreError;
use crate::log::RunLog;
use crate::model::{Device, Organization, Snapshot};
use crate::restore::{RestorePlan, RestoreReport, restore_snapshot};

/// Inventory propagation delay between unclaim and claim. The Dashboard
/// rejects claims of serials it still considers owned elsewhere.
pub const SETTLE_DELAY: Duration = Duration::from_secs(30);

// ── State ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize)]
pub enum MigrationState {
    Idle,
    RemovingFromSource,
    Unclaiming,
    AwaitingSync,
    Claiming,
    AddingToNetwork,
    Restoring,
    Complete,
    Failed,
}

impl MigrationState {
    /// Successor after a successful step.
    fn next(self) -> Self {
        match self {
            Self::Idle => Self::RemovingFromSource,
            Self::RemovingFromSource => Self::Unclaiming,
            Self::Unclaiming => Self::AwaitingSync,
            Self::AwaitingSync => Self::Claiming,
            Self::Claiming => Self::AddingToNetwork,
            Self::AddingToNetwork => Self::Restoring,
            Self::Restoring | Self::Complete => Self::Complete,
            Self::Failed => Self::Failed,
        }
    }

    /// `Complete` and `Failed` wait for the caller.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Failed)
    }
}

// ── Plan & report ───────────────────────────────────────────────────

/// Inputs of one migration run.
#[derive(Debug, Clone)]
pub struct MigrationPlan {
    pub source: Dashboard,
    pub destination: Dashboard,
    pub source_org: Organization,
    pub destination_org_id: String,
    pub destination_network_id: String,
    pub devices: Vec<Device>,
    /// Pre-migration backup. Taken automatically in `Idle` when absent.
    pub snapshot: Option<Snapshot>,
    /// Where `Idle` writes a full archive of the source organization.
    /// No archive is taken when unset.
    pub archive_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    pub state: MigrationState,
    pub failed_step: Option<MigrationState>,
    pub error: Option<String>,
    /// Serials assumed to be in the destination network.
    pub migrated: Vec<String>,
    pub removal_warnings: usize,
    pub restore: Option<RestoreReport>,
    pub archive: Option<PathBuf>,
}

// ── Machine ─────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct Migration {
    plan: MigrationPlan,
    log: RunLog,
    state: MigrationState,
    failed_step: Option<MigrationState>,
    error: Option<String>,
    migrated: Vec<String>,
    removal_warnings: usize,
    restore: Option<RestoreReport>,
    archive: Option<PathBuf>,
}

impl Migration {
    /// Validate prerequisites and park the machine in `Idle`.
    pub fn new(plan: MigrationPlan, log: RunLog) -> Result<Self, CoreError> {
        if plan.devices.is_empty() {
            return Err(CoreError::validation("no devices selected for migration"));
        }
        if plan.destination_network_id.is_empty() {
            return Err(CoreError::validation("no destination network selected"));
        }
        Ok(Self {
            plan,
            log,
            state: MigrationState::Idle,
            failed_step: None,
            error: None,
            migrated: Vec::new(),
            removal_warnings: 0,
            restore: None,
            archive: None,
        })
    }

    pub fn state(&self) -> MigrationState {
        self.state
    }

    /// Step that failed, while the machine is `Failed`.
    pub fn failed_step(&self) -> Option<MigrationState> {
        self.failed_step
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn snapshot(&self) -> Option<&Snapshot> {
        self.plan.snapshot.as_ref()
    }

    /// Full archive written in `Idle`, if one was requested.
    pub fn archive(&self) -> Option<&PathBuf> {
        self.archive.as_ref()
    }

    fn serials(&self) -> Vec<String> {
        self.plan.devices.iter().map(|d| d.serial.clone()).collect()
    }

    /// Run the executor of the current state once.
    pub async fn step(&mut self) -> MigrationState {
        let current = self.state;
        let outcome = match current {
            MigrationState::Idle => self.prepare().await,
            MigrationState::RemovingFromSource => self.remove_from_source().await,
            MigrationState::Unclaiming => self.unclaim().await,
            MigrationState::AwaitingSync => self.await_sync().await,
            MigrationState::Claiming => self.claim().await,
            MigrationState::AddingToNetwork => self.add_to_network().await,
            MigrationState::Restoring => self.restore_configuration().await,
            MigrationState::Complete | MigrationState::Failed => return current,
        };

        match outcome {
            Ok(()) => {
                self.state = current.next();
                if self.state == MigrationState::Complete {
                    self.log.success("Migration complete!");
                }
            }
            Err(e) => {
                self.log.fail(format!(
                    "A critical error occurred during {current}: {e}"
                ));
                self.error = Some(e.to_string());
                self.failed_step = Some(current);
                self.state = MigrationState::Failed;
            }
        }
        self.state
    }

    /// Step until `Complete` or `Failed`.
    pub async fn run(&mut self) -> MigrationState {
        while !self.state.is_terminal() {
            self.step().await;
        }
        self.state
    }

    /// Re-enter the step that failed.
    pub fn retry(&mut self) -> Result<(), CoreError> {
        let step = self.parked()?;
        self.log.info(format!("Retrying step: {step}"));
        self.state = step;
        self.failed_step = None;
        self.error = None;
        Ok(())
    }

    /// Assume the failed step was fixed by hand and jump to `Restoring`
    /// with every device counted as migrated.
    pub fn skip_to_restore(&mut self) -> Result<(), CoreError> {
        self.parked()?;
        self.log.skip(
            "User skipped migration step. Assuming devices were manually moved. Proceeding to restore...",
        );
        self.migrated = self.serials();
        self.state = MigrationState::Restoring;
        self.failed_step = None;
        self.error = None;
        Ok(())
    }

    fn parked(&self) -> Result<MigrationState, CoreError> {
        match (self.state, self.failed_step) {
            (MigrationState::Failed, Some(step)) => Ok(step),
            (state, _) => Err(CoreError::validation(format!(
                "migration is {state}, not waiting on a failed step"
            ))),
        }
    }

    pub fn report(&self) -> MigrationReport {
        MigrationReport {
            state: self.state,
            failed_step: self.failed_step,
            error: self.error.clone(),
            migrated: self.migrated.clone(),
            removal_warnings: self.removal_warnings,
            restore: self.restore.clone(),
            archive: self.archive.clone(),
        }
    }

    // ── Executors ────────────────────────────────────────────────────

    async fn prepare(&mut self) -> Result<(), CoreError> {
        self.log.info(format!(
            "[{}] Starting device migration of {} devices",
            MigrationState::Idle,
            self.plan.devices.len()
        ));
        self.write_archive().await?;
        if self.plan.snapshot.is_some() {
            return Ok(());
        }
        self.log
            .info("Taking a safety backup of the selected devices before migrating...");
        let snapshot = backup_selected(
            &self.plan.source,
            &self.plan.source_org,
            &self.plan.devices,
            &self.log,
        )
        .await?;
        self.plan.snapshot = Some(snapshot);
        Ok(())
    }

    /// Full backup of the source organization, written once; a retried
    /// `Idle` keeps the archive it already has.
    async fn write_archive(&mut self) -> Result<(), CoreError> {
        let Some(dir) = self.plan.archive_dir.clone() else {
            return Ok(());
        };
        if self.archive.is_some() {
            return Ok(());
        }
        self.log.info(format!(
            "Taking a full backup of \"{}\" before migrating...",
            self.plan.source_org.name
        ));
        let archive =
            backup_exhaustive(&self.plan.source, &self.plan.source_org.id, &self.log).await?;
        tokio::fs::create_dir_all(&dir).await?;
        let path = dir.join(&archive.filename);
        tokio::fs::write(&path, &archive.bytes).await?;
        self.log
            .success(format!("Full backup saved to {}", path.display()));
        self.archive = Some(path);
        Ok(())
    }

    async fn remove_from_source(&mut self) -> Result<(), CoreError> {
        self.log.info(format!(
            "[{}] Removing {} devices from their source networks...",
            MigrationState::RemovingFromSource,
            self.plan.devices.len()
        ));
        let source = &self.plan.source;
        let log = &self.log;

        let outcomes = join_all(self.plan.devices.iter().map(|device| async move {
            let Some(network_id) = device.network_id.as_deref() else {
                log.skip(format!(
                    "Device {} ({}) is not in a network, skipping removal.",
                    device.display_name(),
                    device.serial
                ));
                return true;
            };
            match source.remove_device(network_id, &device.serial).await {
                Ok(()) => {
                    log.success(format!(
                        "Removed {} ({}) from network {network_id}.",
                        device.display_name(),
                        device.serial
                    ));
                    true
                }
                Err(e) if e.is_auth() => {
                    log.warn(format!(
                        "Not permitted to remove {} from network {network_id} ({e}). Continuing; unclaim will fail if the key lacks access.",
                        device.display_name()
                    ));
                    false
                }
                Err(e) => {
                    log.warn(format!(
                        "Failed to remove {} from source network ({e}). It might be already unassigned. Continuing...",
                        device.display_name()
                    ));
                    false
                }
            }
        }))
        .await;

        if source.is_cancelled() {
            return Err(CoreError::Cancelled);
        }
        self.removal_warnings = outcomes.iter().filter(|ok| !**ok).count();
        self.log.info("All devices processed for network removal.");
        Ok(())
    }

    async fn unclaim(&mut self) -> Result<(), CoreError> {
        let serials = self.serials();
        self.log.info(format!(
            "[{}] Unclaiming {} devices from source organization \"{}\"...",
            MigrationState::Unclaiming,
            serials.len(),
            self.plan.source_org.name
        ));
        self.plan
            .source
            .release_from_inventory(&self.plan.source_org.id, &serials)
            .await?;
        self.log
            .success("Devices unclaimed from source inventory successfully.");
        Ok(())
    }

    async fn await_sync(&mut self) -> Result<(), CoreError> {
        self.log.info(format!(
            "[{}] Waiting {} seconds for Meraki cloud to synchronize inventory...",
            MigrationState::AwaitingSync,
            SETTLE_DELAY.as_secs()
        ));
        tokio::select! {
            () = tokio::time::sleep(SETTLE_DELAY) => Ok(()),
            () = self.plan.source.cancel_token().cancelled() => Err(CoreError::Cancelled),
            () = self.plan.destination.cancel_token().cancelled() => Err(CoreError::Cancelled),
        }
    }

    async fn claim(&mut self) -> Result<(), CoreError> {
        let serials = self.serials();
        self.log.info(format!(
            "[{}] Claiming {} devices to destination organization {}...",
            MigrationState::Claiming,
            serials.len(),
            self.plan.destination_org_id
        ));
        self.plan
            .destination
            .claim_into_inventory(&self.plan.destination_org_id, &serials)
            .await?;
        self.log
            .success("Devices claimed to destination inventory successfully.");
        Ok(())
    }

    async fn add_to_network(&mut self) -> Result<(), CoreError> {
        let serials = self.serials();
        self.log.info(format!(
            "[{}] Adding {} devices to destination network {}...",
            MigrationState::AddingToNetwork,
            serials.len(),
            self.plan.destination_network_id
        ));
        self.plan
            .destination
            .claim_into_network(&self.plan.destination_network_id, &serials)
            .await?;
        self.log
            .success("Successfully added all devices to the destination network.");
        self.migrated = serials;
        Ok(())
    }

    async fn restore_configuration(&mut self) -> Result<(), CoreError> {
        self.log.info(format!(
            "[{}] Restoring configuration onto {} migrated devices...",
            MigrationState::Restoring,
            self.migrated.len()
        ));
        let Some(snapshot) = &self.plan.snapshot else {
            self.log.warn("No backup available; nothing to restore.");
            return Ok(());
        };
        let plan = RestorePlan {
            serials: self.migrated.clone(),
            destination_network: Some(self.plan.destination_network_id.clone()),
            source_networks: None,
        };
        let report = restore_snapshot(&self.plan.destination, snapshot, &plan, &self.log).await?;
        self.restore = Some(report);
        Ok(())
    }
}
