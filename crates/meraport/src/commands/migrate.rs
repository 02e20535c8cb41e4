//! `migrate`: move devices between organizations and restore their configuration.
//!
//! The engine parks itself in `Failed` when a step cannot proceed; this
//! handler asks the operator whether to retry the step, skip ahead to the
//! restore (devices moved by hand) or stop.

use std::io::IsTerminal;

use dialoguer::Select;

use meraport_core::{Migration, MigrationPlan, MigrationReport, MigrationState, RunLog};

use crate::cli::{GlobalOpts, MigrateArgs};
use crate::config::Session;
use crate::error::CliError;
use crate::output::{self, LiveLog};

use super::util;

enum Recovery {
    Retry,
    SkipToRestore,
    Abort,
}

pub async fn handle(session: &Session, args: MigrateArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let source = session.dashboard(global)?;
    let destination = match args.to_profile.as_deref() {
        Some(name) => session.dashboard_for_profile(name)?,
        None => source.clone(),
    };

    let source_org_id = session.org_id(args.from_org.as_deref())?;
    let source_org = source.organization(&source_org_id).await?;
    let devices = util::select_devices(&source, &source_org_id, &args.serials).await?;
    let snapshot = args
        .snapshot
        .as_deref()
        .map(|path| util::load_backup(path, &RunLog::silent()))
        .transpose()?;

    let prompt = format!(
        "Move {} devices from \"{}\" to organization {} / network {}? They go offline during the move.",
        devices.len(),
        source_org.name,
        args.to_org,
        args.to_network
    );
    if !util::confirm(&prompt, global.yes)? {
        return Ok(());
    }

    let plan = MigrationPlan {
        source,
        destination,
        source_org,
        destination_org_id: args.to_org,
        destination_network_id: args.to_network,
        devices,
        snapshot,
        archive_dir: args.archive_dir,
    };

    let (log, live) = LiveLog::start(global, "Migrating");
    let outcome = drive(plan, log, &live, session).await;
    live.finish().await;
    let report = outcome?;

    let out = output::render_single(global.output, &report, detail, |r| r.migrated.join("\n"));
    output::print_output(&out, global.quiet);
    Ok(())
}

/// Run the machine to completion, consulting the operator on each failure.
/// The machine (and with it the log) is dropped before returning.
async fn drive(
    plan: MigrationPlan,
    log: RunLog,
    live: &LiveLog,
    session: &Session,
) -> Result<MigrationReport, CliError> {
    let mut migration = Migration::new(plan, log)?;
    loop {
        if migration.run().await == MigrationState::Complete {
            return Ok(migration.report());
        }
        let step = migration
            .failed_step()
            .map_or_else(|| "unknown step".to_owned(), |s| s.to_string());
        let reason = migration.error().unwrap_or_default().to_owned();
        if session.cancel.is_cancelled() {
            return Err(CliError::Cancelled);
        }

        match live.suspend(|| ask_recovery(&step, &reason))? {
            Recovery::Retry => migration.retry()?,
            Recovery::SkipToRestore => migration.skip_to_restore()?,
            Recovery::Abort => return Err(CliError::MigrationFailed { step, reason }),
        }
    }
}

fn ask_recovery(step: &str, reason: &str) -> Result<Recovery, CliError> {
    if !std::io::stdin().is_terminal() {
        return Ok(Recovery::Abort);
    }
    let choices = [
        "Retry this step",
        "Skip to restore (devices were moved manually)",
        "Abort",
    ];
    let picked = Select::new()
        .with_prompt(format!("{step} failed: {reason}"))
        .items(&choices)
        .default(0)
        .interact()
        .map_err(util::prompt_err)?;
    Ok(match picked {
        0 => Recovery::Retry,
        1 => Recovery::SkipToRestore,
        _ => Recovery::Abort,
    })
}

fn detail(report: &MigrationReport) -> String {
    let mut lines = vec![format!(
        "Migration {}: {} devices moved",
        report.state,
        report.migrated.len()
    )];
    if let Some(archive) = &report.archive {
        lines.push(format!("Full backup: {}", archive.display()));
    }
    if report.removal_warnings > 0 {
        lines.push(format!(
            "{} devices could not be removed from their source network",
            report.removal_warnings
        ));
    }
    if let Some(restore) = &report.restore {
        lines.push(restore.summary());
    }
    lines.join("\n")
}
