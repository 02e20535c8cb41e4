//! `restore`: replay a full archive or selective snapshot.

use meraport_core::{RestorePlan, RestoreReport, RunLog, restore_snapshot};

use crate::cli::{GlobalOpts, RestoreArgs};
use crate::config::Session;
use crate::error::CliError;
use crate::output::{self, LiveLog};

use super::util;

pub async fn handle(session: &Session, args: RestoreArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let client = session.dashboard(global)?;
    let snapshot = util::load_backup(&args.input, &RunLog::silent())?;

    let serials = if args.serials.is_empty() {
        snapshot.devices.iter().map(|d| d.serial.clone()).collect()
    } else {
        args.serials
    };
    if serials.is_empty() && args.network.is_none() {
        return Err(CliError::Validation {
            field: "restore".into(),
            reason: "the backup holds no devices; pass --network to restore network settings"
                .into(),
        });
    }

    let target = match &args.network {
        Some(network) => format!("{} devices and network {network}", serials.len()),
        None => format!("{} devices", serials.len()),
    };
    let prompt = format!(
        "Overwrite configuration of {target} from the {} backup of {}?",
        snapshot.created_at.format("%Y-%m-%d %H:%M UTC"),
        snapshot.source_org_name
    );
    if !util::confirm(&prompt, global.yes)? {
        return Ok(());
    }

    let plan = RestorePlan {
        serials,
        destination_network: args.network,
        source_networks: (!args.source_networks.is_empty()).then_some(args.source_networks),
    };

    let (log, live) = LiveLog::start(global, "Restoring");
    let result = restore_snapshot(&client, &snapshot, &plan, &log).await;
    drop(log);
    live.finish().await;
    let report = result?;

    let out = output::render_single(global.output, &report, RestoreReport::summary, |r| {
        r.devices_restored.to_string()
    });
    output::print_output(&out, global.quiet);
    Ok(())
}
