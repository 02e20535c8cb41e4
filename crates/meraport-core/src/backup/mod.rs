// ── Backup engines ──
//
// Both engines walk the catalog with the same per-entry discipline: a
// document is captured, skipped (404, `null`, `[]`), or failed. Only missing
// prerequisites abort a run; entry failures are logged and the walk goes on.

mod exhaustive;
mod selective;

pub use exhaustive::backup_exhaustive;
pub use selective::backup_selected;

use serde::Serialize;
use serde_json::Value;

use crate::client::Dashboard;
use crate::error::CoreError;
use crate::log::RunLog;

/// Outcome of fetching one catalog entry.
#[derive(Debug)]
pub(crate) enum Fetched {
    Captured(Value),
    Skipped,
    Failed(CoreError),
}

impl Fetched {
    pub(crate) async fn get(client: &Dashboard, endpoint: &str) -> Self {
        match client.get(endpoint).await {
            Ok(Some(Value::Array(items))) if items.is_empty() => Self::Skipped,
            Ok(Some(value)) => Self::Captured(value),
            Ok(None) => Self::Skipped,
            Err(e) => Self::Failed(e),
        }
    }

    /// Emit the outcome line for `label` (archive path or endpoint).
    pub(crate) fn log(&self, log: &RunLog, label: &str) {
        match self {
            Self::Captured(_) => log.success(format!("Success: {label}")),
            Self::Skipped => log.skip(format!("Skipped (no data/not configured): {label}")),
            Self::Failed(e) => log.fail(format!("FAILED: {label} ({e})")),
        }
    }

    pub(crate) fn into_value(self) -> Option<Value> {
        match self {
            Self::Captured(value) => Some(value),
            Self::Skipped | Self::Failed(_) => None,
        }
    }
}

/// Tally of entry outcomes for one backup run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BackupReport {
    pub captured: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Labels of the entries that failed, in completion order.
    pub failures: Vec<String>,
}

impl BackupReport {
    pub(crate) fn record(&mut self, label: &str, fetched: &Fetched) {
        match fetched {
            Fetched::Captured(_) => self.captured += 1,
            Fetched::Skipped => self.skipped += 1,
            Fetched::Failed(_) => {
                self.failed += 1;
                self.failures.push(label.to_owned());
            }
        }
    }

    pub fn total(&self) -> usize {
        self.captured + self.skipped + self.failed
    }

    pub fn summary(&self) -> String {
        format!(
            "{} captured, {} skipped, {} failed",
            self.captured, self.skipped, self.failed
        )
    }
}

/// Abort between scopes once the run was cancelled. In-flight fetches of the
/// current scope have already settled as failures by then.
pub(crate) fn ensure_live(client: &Dashboard) -> Result<(), CoreError> {
    if client.is_cancelled() {
        Err(CoreError::Cancelled)
    } else {
        Ok(())
    }
}
