//! Configuration for meraport.
//!
//! TOML profiles (one per Dashboard account), gateway tuning, API-key
//! resolution (env var, OS keyring, plaintext) and translation into the
//! runtime `Account` / `Gateway` types. Engines never read this crate's
//! files themselves; the CLI hands them the translated values.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use meraport_api::{
    Account, DirectTransport, Gateway, GatewayConfig, ProxyTransport, Region, Transport,
    TransportConfig,
};

const KEYRING_SERVICE: &str = "meraport";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("profile '{0}' not found")]
    UnknownProfile(String),

    #[error("no API key configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("could not set up the API transport: {0}")]
    Transport(#[from] meraport_api::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level `config.toml`.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Profile used when `--profile` is not given.
    pub default_profile: Option<String>,

    #[serde(default)]
    pub gateway: GatewaySettings,

    /// Named Dashboard accounts.
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            gateway: GatewaySettings::default(),
            profiles: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Look up a profile by name, falling back to `default_profile`.
    pub fn profile(&self, name: Option<&str>) -> Result<(String, &Profile), ConfigError> {
        let name = name
            .or(self.default_profile.as_deref())
            .unwrap_or("default");
        self.profiles
            .get(name)
            .map(|p| (name.to_owned(), p))
            .ok_or_else(|| ConfigError::UnknownProfile(name.to_owned()))
    }
}

/// How requests leave the process.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// JSON relay endpoint that forwards to the vendor.
    Proxy,
    /// Straight to the regional API with bearer auth.
    #[default]
    Direct,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GatewaySettings {
    #[serde(default)]
    pub transport: TransportKind,

    /// Relay endpoint, required when `transport = "proxy"`.
    pub proxy_url: Option<String>,

    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            transport: TransportKind::default(),
            proxy_url: None,
            max_concurrent: default_max_concurrent(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout(),
        }
    }
}

fn default_max_concurrent() -> usize {
    9
}
fn default_max_retries() -> u32 {
    3
}
fn default_timeout() -> u64 {
    30
}

/// A named Dashboard account.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Profile {
    #[serde(default)]
    pub region: Region,

    /// API key (plaintext; prefer keyring or env var).
    pub api_key: Option<String>,

    /// Environment variable name containing the API key.
    pub api_key_env: Option<String>,

    /// Organization used when a command needs one and none is given.
    pub org_id: Option<String>,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "meraport", "meraport").map_or_else(
        || {
            let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
            p.push(".config");
            p.push("meraport");
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

// ── Loading & saving ────────────────────────────────────────────────

/// Load defaults, then `config.toml`, then `MERAPORT_*` variables
/// (`MERAPORT_GATEWAY__MAX_CONCURRENT=4`).
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let config = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("MERAPORT_").split("__"))
        .extract()?;
    Ok(config)
}

pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, toml::to_string_pretty(cfg)?)?;
    Ok(())
}

// ── Credentials ─────────────────────────────────────────────────────

fn keyring_entry(profile_name: &str) -> Result<keyring::Entry, ConfigError> {
    Ok(keyring::Entry::new(
        KEYRING_SERVICE,
        &format!("{profile_name}/api-key"),
    )?)
}

/// Resolve an API key: profile env var, then OS keyring, then plaintext.
pub fn resolve_api_key(profile: &Profile, profile_name: &str) -> Result<SecretString, ConfigError> {
    if let Some(ref env_name) = profile.api_key_env {
        if let Ok(val) = std::env::var(env_name) {
            return Ok(SecretString::from(val));
        }
    }

    if let Ok(entry) = keyring_entry(profile_name) {
        if let Ok(secret) = entry.get_password() {
            return Ok(SecretString::from(secret));
        }
    }

    if let Some(ref key) = profile.api_key {
        return Ok(SecretString::from(key.clone()));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
    })
}

/// Store a profile's API key in the OS keyring.
pub fn store_api_key(profile_name: &str, key: &str) -> Result<(), ConfigError> {
    keyring_entry(profile_name)?.set_password(key)?;
    Ok(())
}

/// Build the runtime account for a profile.
pub fn profile_to_account(profile: &Profile, profile_name: &str) -> Result<Account, ConfigError> {
    let key = resolve_api_key(profile, profile_name)?;
    Ok(Account::new(key, profile.region))
}

// ── Gateway ─────────────────────────────────────────────────────────

pub fn gateway_config(settings: &GatewaySettings) -> Result<GatewayConfig, ConfigError> {
    if settings.max_concurrent == 0 {
        return Err(ConfigError::Validation {
            field: "gateway.max_concurrent".into(),
            reason: "must be at least 1".into(),
        });
    }
    Ok(GatewayConfig {
        max_concurrent: settings.max_concurrent,
        max_retries: settings.max_retries,
        ..GatewayConfig::default()
    })
}

/// Build the process-wide gateway over the configured transport.
pub fn build_gateway(settings: &GatewaySettings) -> Result<Gateway, ConfigError> {
    let transport_config = TransportConfig {
        timeout: Duration::from_secs(settings.timeout_secs),
        ..TransportConfig::default()
    };
    let transport: Arc<dyn Transport> = match settings.transport {
        TransportKind::Direct => Arc::new(DirectTransport::new(&transport_config)?),
        TransportKind::Proxy => {
            let Some(url) = settings.proxy_url.as_deref() else {
                return Err(ConfigError::Validation {
                    field: "gateway.proxy_url".into(),
                    reason: "required when transport is \"proxy\"".into(),
                });
            };
            url::Url::parse(url).map_err(|e| ConfigError::Validation {
                field: "gateway.proxy_url".into(),
                reason: e.to_string(),
            })?;
            Arc::new(ProxyTransport::new(url, &transport_config)?)
        }
    };
    Ok(Gateway::new(transport, gateway_config(settings)?))
}
