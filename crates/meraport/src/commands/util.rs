//! Shared helpers for command handlers.

use std::io::IsTerminal;
use std::path::Path;

use meraport_core::{Dashboard, Device, RunLog, Snapshot, parse_archive};

use crate::error::CliError;

/// Prompt for confirmation, auto-approving if `--yes` was passed.
pub fn confirm(message: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !std::io::stdin().is_terminal() {
        return Err(CliError::NonInteractiveRequiresYes {
            action: message.into(),
        });
    }
    dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(prompt_err)
}

/// Map a dialoguer / interactive I/O failure into CliError.
pub fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

/// Load a full `.zip` archive or a `.json` snapshot.
pub fn load_backup(path: &Path, log: &RunLog) -> Result<Snapshot, CliError> {
    let bytes = std::fs::read(path)?;
    let invalid = |reason: String| CliError::InvalidBackup {
        path: path.display().to_string(),
        reason,
    };
    let is_zip = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"));
    if is_zip {
        parse_archive(&bytes, log).map_err(|e| invalid(e.to_string()))
    } else {
        Snapshot::from_json(&bytes).map_err(|e| invalid(e.to_string()))
    }
}

/// Resolve serials against the organization inventory, in the order given.
pub async fn select_devices(
    client: &Dashboard,
    org_id: &str,
    serials: &[String],
) -> Result<Vec<Device>, CliError> {
    let inventory = client.devices(org_id).await?;
    serials
        .iter()
        .map(|serial| {
            inventory
                .iter()
                .find(|d| d.serial.eq_ignore_ascii_case(serial))
                .cloned()
                .ok_or_else(|| CliError::NotFound {
                    resource_type: "device".into(),
                    identifier: serial.clone(),
                    list_command: "devices".into(),
                })
        })
        .collect()
}

/// Write bytes, creating parent directories.
pub fn write_file(path: &Path, bytes: &[u8]) -> Result<(), CliError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, bytes)?;
    Ok(())
}
