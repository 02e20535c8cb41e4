//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with help text.

use miette::Diagnostic;
use thiserror::Error;

use meraport_config::ConfigError;
use meraport_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const INTERRUPTED: i32 = 130;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────

    #[error("Could not reach the Meraki Dashboard API")]
    #[diagnostic(
        code(meraport::connection_failed),
        help(
            "{reason}\n\
             Check network access, or the proxy_url in the [gateway] section."
        )
    )]
    ConnectionFailed { reason: String },

    // ── Authentication ───────────────────────────────────────────────

    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(meraport::auth_failed),
        help(
            "Verify the API key has access to this organization.\n\
             Run: meraport config set-key --profile {profile}"
        )
    )]
    AuthFailed { profile: String, message: String },

    #[error("No API key configured for profile '{profile}'")]
    #[diagnostic(
        code(meraport::no_credentials),
        help(
            "Store one with: meraport config set-key --profile {profile}\n\
             Or set MERAPORT_API_KEY, or api_key_env in the profile."
        )
    )]
    NoCredentials { profile: String },

    // ── Resources ────────────────────────────────────────────────────

    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(meraport::not_found),
        help("Run: meraport {list_command} to see what is available")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    #[error("No organization selected")]
    #[diagnostic(
        code(meraport::no_org),
        help("Pass --org, or set org_id in the profile. Run: meraport orgs")
    )]
    NoOrganization,

    // ── API ──────────────────────────────────────────────────────────

    #[error("{message}")]
    #[diagnostic(code(meraport::api_error))]
    ApiError { message: String },

    // ── Backups ──────────────────────────────────────────────────────

    #[error("{path} is not a usable backup")]
    #[diagnostic(
        code(meraport::invalid_backup),
        help("{reason}\nExpected a full backup .zip or a selective backup .json.")
    )]
    InvalidBackup { path: String, reason: String },

    #[error("Migration stopped during {step}")]
    #[diagnostic(
        code(meraport::migration_failed),
        help(
            "{reason}\n\
             Devices may be partially moved. Check both organizations' inventories before rerunning."
        )
    )]
    MigrationFailed { step: String, reason: String },

    #[error("Operation aborted")]
    #[diagnostic(code(meraport::cancelled))]
    Cancelled,

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(meraport::validation))]
    Validation { field: String, reason: String },

    #[error("'{action}' requires confirmation")]
    #[diagnostic(
        code(meraport::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(meraport::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Config file: {path}"
        )
    )]
    ProfileNotFound {
        name: String,
        available: String,
        path: String,
    },

    #[error(transparent)]
    #[diagnostic(code(meraport::config))]
    Config(Box<ConfigError>),

    // ── IO / Serialization ────────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    #[diagnostic(code(meraport::json))]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::NotFound { .. } | Self::ProfileNotFound { .. } => exit_code::NOT_FOUND,
            Self::Validation { .. }
            | Self::NonInteractiveRequiresYes { .. }
            | Self::NoOrganization => exit_code::USAGE,
            Self::Cancelled => exit_code::INTERRUPTED,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { reason } => CliError::ConnectionFailed { reason },

            CoreError::AuthenticationFailed { message } => CliError::AuthFailed {
                profile: "current".into(),
                message,
            },

            CoreError::NotFound {
                entity_type,
                identifier,
            } => CliError::NotFound {
                list_command: list_command_for(&entity_type).into(),
                resource_type: entity_type,
                identifier,
            },

            CoreError::ValidationFailed { message } => CliError::Validation {
                field: "input".into(),
                reason: message,
            },

            CoreError::InvalidArchive { message } => CliError::InvalidBackup {
                path: "archive".into(),
                reason: message,
            },

            CoreError::Zip(e) => CliError::InvalidBackup {
                path: "archive".into(),
                reason: e.to_string(),
            },

            CoreError::Cancelled => CliError::Cancelled,

            CoreError::Io(e) => CliError::Io(e),
            CoreError::Json(e) => CliError::Json(e),

            e @ (CoreError::Api { .. } | CoreError::Internal(_)) => CliError::ApiError {
                message: e.to_string(),
            },
        }
    }
}

fn list_command_for(entity_type: &str) -> &'static str {
    match entity_type.to_ascii_lowercase().as_str() {
        "network" => "networks",
        "device" => "devices",
        _ => "orgs",
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::NoCredentials { profile } => CliError::NoCredentials { profile },
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::Io(e) => CliError::Io(e),
            other => CliError::Config(Box::new(other)),
        }
    }
}
