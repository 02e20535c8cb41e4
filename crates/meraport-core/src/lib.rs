// meraport-core: Backup, restore and migration engines built on meraport-api.

pub mod archive;
pub mod backup;
pub mod catalog;
pub mod client;
pub mod error;
pub mod log;
pub mod migration;
pub mod model;
pub mod parser;
pub mod restore;

// ── Primary re-exports ──────────────────────────────────────────────
pub use archive::Archive;
pub use backup::{BackupReport, backup_exhaustive, backup_selected};
pub use client::Dashboard;
pub use error::CoreError;
pub use log::{ChannelSink, LineKind, LogLine, LogSink, MemorySink, RunLog, TracingSink};
pub use migration::{Migration, MigrationPlan, MigrationReport, MigrationState};
pub use model::{
    Capture, Device, DeviceBackup, DeviceConfig, ModelFamily, Network, Organization,
    ProductType, ResourceMap, Snapshot,
};
pub use parser::parse_archive;
pub use restore::{RestorePlan, RestoreReport, restore_device, restore_network, restore_snapshot};
