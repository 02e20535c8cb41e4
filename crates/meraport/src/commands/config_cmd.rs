//! Config subcommand handlers.

use meraport_config::{Profile, config_path, load_config, save_config, store_api_key};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::active_profile_name;
use crate::error::CliError;
use crate::output;

use super::util::prompt_err;

const REDACTED: &str = "********";

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Path => {
            output::print_output(&config_path().display().to_string(), global.quiet);
            Ok(())
        }

        ConfigCommand::Show => {
            let mut cfg = load_config()?;
            for profile in cfg.profiles.values_mut() {
                if profile.api_key.is_some() {
                    profile.api_key = Some(REDACTED.into());
                }
            }
            let rendered = toml::to_string_pretty(&cfg).map_err(|e| CliError::Validation {
                field: "config".into(),
                reason: format!("failed to serialize config: {e}"),
            })?;
            output::print_output(&rendered, global.quiet);
            Ok(())
        }

        ConfigCommand::SetKey => {
            let mut cfg = load_config()?;
            let profile_name = active_profile_name(global, &cfg);

            let key = match global.api_key.clone() {
                Some(key) => key,
                None => rpassword::prompt_password(format!("API key for '{profile_name}': "))
                    .map_err(prompt_err)?,
            };
            if key.trim().is_empty() {
                return Err(CliError::Validation {
                    field: "api_key".into(),
                    reason: "API key cannot be empty".into(),
                });
            }

            store_api_key(&profile_name, key.trim())?;

            // Make sure the profile exists so the keyring entry is found later.
            if !cfg.profiles.contains_key(&profile_name) {
                cfg.profiles.insert(profile_name.clone(), Profile::default());
                save_config(&cfg)?;
            }
            if !global.quiet {
                eprintln!("API key for '{profile_name}' stored in the system keyring");
            }
            Ok(())
        }
    }
}
