use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum, ValueHint, builder::BoolishValueParser};

use crate::domain::events::ChangeKind;

/// Command-line arguments for the cfpurge binary.
#[derive(Debug, Parser)]
#[command(
    name = "cfpurge",
    version,
    about = "Cloudflare edge-cache purging for CMS content"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(
        long = "config-file",
        env = "CFPURGE_CONFIG_FILE",
        value_name = "PATH",
        value_hint = ValueHint::FilePath,
        global = true
    )]
    pub config_file: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: GlobalOverrides,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// List the zones visible to the configured credentials.
    Zones,
    /// Show the site settings panel (values, read-only fields, zone choices).
    Settings,
    /// Run the purge coordinator for an ad-hoc content object.
    Purge(PurgeArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct GlobalOverrides {
    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new(),
        global = true
    )]
    pub log_json: Option<bool>,

    /// Override the site's canonical base URL.
    #[arg(long = "site-base-url", value_name = "URL", global = true)]
    pub site_base_url: Option<String>,

    /// Override the site settings file.
    #[arg(
        long = "site-settings-file",
        value_name = "PATH",
        value_hint = ValueHint::FilePath,
        global = true
    )]
    pub site_settings_file: Option<PathBuf>,

    /// Override the write purge policy (always|opt_in).
    #[arg(long = "purge-write-policy", value_name = "POLICY", global = true)]
    pub purge_write_policy: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EventArg {
    Write,
    Publish,
    Delete,
}

impl From<EventArg> for ChangeKind {
    fn from(value: EventArg) -> Self {
        match value {
            EventArg::Write => ChangeKind::Write,
            EventArg::Publish => ChangeKind::Publish,
            EventArg::Delete => ChangeKind::Delete,
        }
    }
}

#[derive(Debug, Args, Clone)]
pub struct PurgeArgs {
    /// Lifecycle event to simulate.
    #[arg(long, value_enum, default_value_t = EventArg::Publish)]
    pub event: EventArg,

    /// Treat the object as having separate draft and live versions.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub versioned: bool,

    /// Report the object as opted in to purging on plain writes.
    #[arg(long = "opt-in-write", action = clap::ArgAction::SetTrue)]
    pub opt_in_write: bool,

    /// Identifier used in logs.
    #[arg(long = "object-id", value_name = "ID", default_value = "cli")]
    pub object_id: String,

    /// Site-relative links to purge.
    #[arg(value_name = "LINK", required = true)]
    pub links: Vec<String>,
}
