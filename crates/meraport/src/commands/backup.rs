//! `backup full` and `backup selective`.

use std::path::PathBuf;

use chrono::Utc;

use meraport_core::archive::safe_filename;
use meraport_core::{backup_exhaustive, backup_selected};

use crate::cli::{BackupArgs, BackupCommand, GlobalOpts};
use crate::config::Session;
use crate::error::CliError;
use crate::output::{self, LiveLog};

use super::util;

pub async fn handle(session: &Session, args: BackupArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let client = session.dashboard(global)?;

    match args.command {
        BackupCommand::Full { org, out_dir } => {
            let org_id = session.org_id(org.org.as_deref())?;

            let (log, live) = LiveLog::start(global, "Backing up organization");
            let result = backup_exhaustive(&client, &org_id, &log).await;
            drop(log);
            live.finish().await;
            let archive = result?;

            let path = out_dir.join(&archive.filename);
            util::write_file(&path, &archive.bytes)?;
            output::print_output(
                &format!("{}\n{}", archive.report.summary(), path.display()),
                global.quiet,
            );
            Ok(())
        }

        BackupCommand::Selective { org, serials, out } => {
            let org_id = session.org_id(org.org.as_deref())?;
            let organization = client.organization(&org_id).await?;
            let devices = util::select_devices(&client, &org_id, &serials).await?;

            let (log, live) = LiveLog::start(global, "Backing up selected devices");
            let result = backup_selected(&client, &organization, &devices, &log).await;
            drop(log);
            live.finish().await;
            let snapshot = result?;

            let path = out.unwrap_or_else(|| {
                PathBuf::from(format!(
                    "meraport-snapshot-{}-{}.json",
                    safe_filename(&organization.name),
                    Utc::now().format("%Y%m%d-%H%M%S")
                ))
            });
            util::write_file(&path, snapshot.to_json_pretty()?.as_bytes())?;
            output::print_output(
                &format!(
                    "{} devices, {} networks captured\n{}",
                    snapshot.devices.len(),
                    snapshot.network_configs.len(),
                    path.display()
                ),
                global.quiet,
            );
            Ok(())
        }
    }
}
