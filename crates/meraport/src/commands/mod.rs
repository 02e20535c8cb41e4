//! Command dispatch: bridges CLI args -> engines -> output formatting.

pub mod backup;
pub mod config_cmd;
pub mod inventory;
pub mod migrate;
pub mod restore;
pub mod util;

use crate::cli::{Command, GlobalOpts};
use crate::config::Session;
use crate::error::CliError;

/// Dispatch a Dashboard-bound command to its handler.
pub async fn dispatch(cmd: Command, session: &Session, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Orgs => inventory::orgs(session, global).await,
        Command::Networks(args) => inventory::networks(session, args, global).await,
        Command::Devices(args) => inventory::devices(session, args, global).await,
        Command::Backup(args) => backup::handle(session, args, global).await,
        Command::Restore(args) => restore::handle(session, args, global).await,
        Command::Migrate(args) => migrate::handle(session, args, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => Ok(()),
    }
}
