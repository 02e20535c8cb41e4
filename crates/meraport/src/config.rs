//! CLI-side configuration: profile selection and flag overrides on top of
//! `meraport-config`.

use std::str::FromStr;

use secrecy::SecretString;
use tokio_util::sync::CancellationToken;

use meraport_api::{Account, Gateway, Region};
use meraport_config::{Config, build_gateway, config_path, load_config, profile_to_account};
use meraport_core::Dashboard;

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Everything a Dashboard-bound command needs.
pub struct Session {
    pub config: Config,
    pub profile_name: String,
    pub gateway: Gateway,
    pub cancel: CancellationToken,
}

impl Session {
    /// Load config and build the process-wide gateway. Ctrl-C cancels
    /// every in-flight and queued call made through this session.
    pub fn open(global: &GlobalOpts) -> Result<Self, CliError> {
        let config = load_config()?;
        let profile_name = active_profile_name(global, &config);
        let gateway = build_gateway(&config.gateway)?;

        let cancel = CancellationToken::new();
        let on_interrupt = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupt received, aborting");
                on_interrupt.cancel();
            }
        });

        Ok(Self {
            config,
            profile_name,
            gateway,
            cancel,
        })
    }

    /// Dashboard for the active profile (with `--api-key` / `--region` overrides).
    pub fn dashboard(&self, global: &GlobalOpts) -> Result<Dashboard, CliError> {
        let account = resolve_account(global, &self.config, &self.profile_name)?;
        Ok(self.dashboard_for(account))
    }

    /// Dashboard for another named profile; flags do not apply to it.
    pub fn dashboard_for_profile(&self, name: &str) -> Result<Dashboard, CliError> {
        let profile = self
            .config
            .profiles
            .get(name)
            .ok_or_else(|| profile_not_found(name, &self.config))?;
        Ok(self.dashboard_for(profile_to_account(profile, name)?))
    }

    fn dashboard_for(&self, account: Account) -> Dashboard {
        Dashboard::new(self.gateway.clone(), account).with_cancel(self.cancel.clone())
    }

    /// `--org` if given, otherwise the active profile's `org_id`.
    pub fn org_id(&self, explicit: Option<&str>) -> Result<String, CliError> {
        explicit
            .map(str::to_owned)
            .or_else(|| {
                self.config
                    .profiles
                    .get(&self.profile_name)
                    .and_then(|p| p.org_id.clone())
            })
            .ok_or(CliError::NoOrganization)
    }
}

/// `--profile`, then `default_profile`, then `"default"`.
pub fn active_profile_name(global: &GlobalOpts, cfg: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| cfg.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

pub fn parse_region(value: &str) -> Result<Region, CliError> {
    Region::from_str(value).map_err(|_| CliError::Validation {
        field: "region".into(),
        reason: format!("expected 'com' or 'in', got '{value}'"),
    })
}

fn resolve_account(global: &GlobalOpts, cfg: &Config, profile_name: &str) -> Result<Account, CliError> {
    let profile = cfg.profiles.get(profile_name);
    let region = match global.region.as_deref() {
        Some(value) => parse_region(value)?,
        None => profile.map(|p| p.region).unwrap_or_default(),
    };

    if let Some(ref key) = global.api_key {
        return Ok(Account::new(SecretString::from(key.clone()), region));
    }

    let Some(profile) = profile else {
        if global.profile.is_some() {
            return Err(profile_not_found(profile_name, cfg));
        }
        return Err(CliError::NoCredentials {
            profile: profile_name.into(),
        });
    };
    let mut account = profile_to_account(profile, profile_name)?;
    account.region = region;
    Ok(account)
}

fn profile_not_found(name: &str, cfg: &Config) -> CliError {
    let available = cfg.profiles.keys().cloned().collect::<Vec<_>>().join(", ");
    CliError::ProfileNotFound {
        name: name.into(),
        available: if available.is_empty() {
            "(none)".into()
        } else {
            available
        },
        path: config_path().display().to_string(),
    }
}
