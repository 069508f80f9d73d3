//! Configuration layer: typed settings with layered precedence (file → env → CLI).

mod cli;

use std::{path::PathBuf, str::FromStr, time::Duration};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

use crate::application::coordinator::WritePolicy;
use crate::domain::types::{ConfigValue, SitePath};
use crate::infra::cloudflare::DEFAULT_API_BASE;

pub use cli::{CliArgs, Command, EventArg, GlobalOverrides, PurgeArgs};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "cfpurge";
const ENV_PREFIX: &str = "CFPURGE";
const DEFAULT_BASE_URL: &str = "http://localhost/";
const DEFAULT_SETTINGS_FILE: &str = "site-settings.toml";
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub cloudflare: CloudflareSettings,
    pub site: SiteSettings,
    pub purge: PurgeSettings,
    pub logging: LoggingSettings,
}

/// Static purge configuration layer plus API client options.
#[derive(Debug, Clone)]
pub struct CloudflareSettings {
    pub email: Option<String>,
    pub auth_key: Option<String>,
    pub zone_identifier: Option<String>,
    pub paths: Option<ConfigValue>,
    pub hide_site_config: bool,
    pub api_base: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct SiteSettings {
    pub base_url: SitePath,
    pub settings_file: PathBuf,
}

#[derive(Debug, Clone)]
pub struct PurgeSettings {
    pub write_policy: WritePolicy,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;
    raw.apply_overrides(&cli.overrides);

    Settings::from_raw(raw)
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    cloudflare: RawCloudflareSettings,
    site: RawSiteSettings,
    purge: RawPurgeSettings,
    logging: RawLoggingSettings,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCloudflareSettings {
    email: Option<String>,
    auth_key: Option<String>,
    zone_identifier: Option<String>,
    paths: Option<ConfigValue>,
    hide_site_config: Option<bool>,
    api_base: Option<String>,
    timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSiteSettings {
    base_url: Option<String>,
    settings_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawPurgeSettings {
    write_policy: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

impl RawSettings {
    fn apply_overrides(&mut self, overrides: &GlobalOverrides) {
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(url) = overrides.site_base_url.as_ref() {
            self.site.base_url = Some(url.clone());
        }
        if let Some(path) = overrides.site_settings_file.as_ref() {
            self.site.settings_file = Some(path.clone());
        }
        if let Some(policy) = overrides.purge_write_policy.as_ref() {
            self.purge.write_policy = Some(policy.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            cloudflare,
            site,
            purge,
            logging,
        } = raw;

        let cloudflare = build_cloudflare_settings(cloudflare)?;
        let site = build_site_settings(site)?;
        let purge = build_purge_settings(purge)?;
        let logging = build_logging_settings(logging)?;

        Ok(Self {
            cloudflare,
            site,
            purge,
            logging,
        })
    }
}

fn build_cloudflare_settings(
    cloudflare: RawCloudflareSettings,
) -> Result<CloudflareSettings, LoadError> {
    let api_base = cloudflare
        .api_base
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| DEFAULT_API_BASE.to_string());
    Url::parse(&api_base)
        .map_err(|err| LoadError::invalid("cloudflare.api_base", format!("{err}")))?;

    let timeout_seconds = cloudflare.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECS);
    if timeout_seconds == 0 {
        return Err(LoadError::invalid(
            "cloudflare.timeout_seconds",
            "must be greater than zero",
        ));
    }

    Ok(CloudflareSettings {
        email: non_blank(cloudflare.email),
        auth_key: non_blank(cloudflare.auth_key),
        zone_identifier: non_blank(cloudflare.zone_identifier),
        paths: cloudflare.paths.filter(|paths| !paths.is_blank()),
        hide_site_config: cloudflare.hide_site_config.unwrap_or(false),
        api_base,
        timeout: Duration::from_secs(timeout_seconds),
    })
}

fn build_site_settings(site: RawSiteSettings) -> Result<SiteSettings, LoadError> {
    let raw_base = site
        .base_url
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
    let parsed = Url::parse(raw_base.trim())
        .map_err(|err| LoadError::invalid("site.base_url", format!("{err}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(LoadError::invalid(
            "site.base_url",
            format!("unsupported scheme `{}`", parsed.scheme()),
        ));
    }
    let base_url = SitePath::normalize(&raw_base)
        .ok_or_else(|| LoadError::invalid("site.base_url", "must not be empty"))?;

    let settings_file = site
        .settings_file
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SETTINGS_FILE));
    if settings_file.as_os_str().is_empty() {
        return Err(LoadError::invalid(
            "site.settings_file",
            "path must not be empty",
        ));
    }

    Ok(SiteSettings {
        base_url,
        settings_file,
    })
}

fn build_purge_settings(purge: RawPurgeSettings) -> Result<PurgeSettings, LoadError> {
    let write_policy = match purge.write_policy {
        Some(value) => WritePolicy::from_str(&value)
            .map_err(|reason| LoadError::invalid("purge.write_policy", reason))?,
        None => WritePolicy::default(),
    };

    Ok(PurgeSettings { write_policy })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}
