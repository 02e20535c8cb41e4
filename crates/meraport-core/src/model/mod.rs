// ── Domain model ──
//
// Inventory records (organizations, networks, devices) keep every field the
// Dashboard returned so they can be written back to an archive verbatim.
// The snapshot types hold captured sub-resources as opaque JSON documents.

pub mod inventory;
pub mod snapshot;

// ── Re-exports ──────────────────────────────────────────────────────

pub use inventory::{Device, ModelFamily, Network, Organization, ProductType};
pub use snapshot::{Capture, DeviceBackup, DeviceConfig, ResourceMap, Snapshot, is_empty_document};
