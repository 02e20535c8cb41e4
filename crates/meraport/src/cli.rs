//! Clap derive structures for the `meraport` CLI.
//!
//! Only depends on clap so `build.rs` can include it for man pages.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// meraport -- Meraki Dashboard backup, restore and migration
#[derive(Debug, Parser)]
#[command(
    name = "meraport",
    version,
    about = "Back up, restore and migrate Meraki Dashboard configuration",
    long_about = "Back up, restore and migrate Meraki Dashboard configuration.\n\n\
        Full backups capture every readable organization, network and device\n\
        setting into a zip archive. Selective backups capture what is needed to\n\
        restore a set of devices. Migrations move devices between organizations\n\
        and replay their configuration.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Account profile to use
    #[arg(long, short = 'p', env = "MERAPORT_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Dashboard API key (overrides profile)
    #[arg(long, env = "MERAPORT_API_KEY", global = true, hide_env = true)]
    pub api_key: Option<String>,

    /// Dashboard deployment: com or in (overrides profile)
    #[arg(long, env = "MERAPORT_REGION", global = true)]
    pub region: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "MERAPORT_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// Plain text, one identifier per line (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List organizations the API key can access
    #[command(alias = "org")]
    Orgs,

    /// List networks of an organization
    #[command(alias = "net", alias = "n")]
    Networks(OrgArgs),

    /// List devices of an organization with live status
    #[command(alias = "dev", alias = "d")]
    Devices(DevicesArgs),

    /// Capture configuration into an archive or snapshot
    #[command(alias = "b")]
    Backup(BackupArgs),

    /// Replay a backup onto devices and a network
    Restore(RestoreArgs),

    /// Move devices to another organization and restore their configuration
    Migrate(MigrateArgs),

    /// Manage CLI configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Inventory ────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct OrgArgs {
    /// Organization ID (defaults to the profile's org_id)
    #[arg(long, env = "MERAPORT_ORG")]
    pub org: Option<String>,
}

#[derive(Debug, Args)]
pub struct DevicesArgs {
    #[command(flatten)]
    pub org: OrgArgs,

    /// Only devices assigned to this network
    #[arg(long)]
    pub network: Option<String>,
}

// ── Backup ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct BackupArgs {
    #[command(subcommand)]
    pub command: BackupCommand,
}

#[derive(Debug, Subcommand)]
pub enum BackupCommand {
    /// Capture the whole organization into a zip archive
    Full {
        #[command(flatten)]
        org: OrgArgs,

        /// Directory the archive is written to
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },

    /// Capture selected devices and their networks into a JSON snapshot
    Selective {
        #[command(flatten)]
        org: OrgArgs,

        /// Device serial (repeatable)
        #[arg(long = "serial", short = 's', required = true)]
        serials: Vec<String>,

        /// Snapshot file (defaults to a timestamped name in the current directory)
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

// ── Restore ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct RestoreArgs {
    /// Backup to restore from: a full `.zip` archive or a `.json` snapshot
    pub input: PathBuf,

    /// Destination device serial (repeatable; defaults to every backed-up device)
    #[arg(long = "serial", short = 's')]
    pub serials: Vec<String>,

    /// Destination network for captured network settings
    #[arg(long)]
    pub network: Option<String>,

    /// Only replay this source network (repeatable)
    #[arg(long = "source-network")]
    pub source_networks: Vec<String>,
}

// ── Migrate ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct MigrateArgs {
    /// Source organization ID (defaults to the profile's org_id)
    #[arg(long)]
    pub from_org: Option<String>,

    /// Profile of the destination account (defaults to the source profile)
    #[arg(long)]
    pub to_profile: Option<String>,

    /// Destination organization ID
    #[arg(long)]
    pub to_org: String,

    /// Destination network ID
    #[arg(long)]
    pub to_network: String,

    /// Device serial to migrate (repeatable)
    #[arg(long = "serial", short = 's', required = true)]
    pub serials: Vec<String>,

    /// Use this snapshot instead of taking a fresh backup
    #[arg(long)]
    pub snapshot: Option<PathBuf>,

    /// Write a full archive of the source organization here before any
    /// device is moved
    #[arg(long)]
    pub archive_dir: Option<PathBuf>,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show the resolved configuration (API keys redacted)
    Show,

    /// Print the config file path
    Path,

    /// Store a profile's API key in the system keyring
    SetKey,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
