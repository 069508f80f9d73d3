//! Layered purge configuration.
//!
//! Two tiers feed every lookup:
//!
//! - the **static layer**, loaded once from the deployment configuration;
//! - the **site layer**, admin-editable settings re-read on every call.
//!
//! A non-blank static value always wins. The site layer is consulted only
//! when the static layer leaves a field blank and `hide_site_config` is off.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, warn};

use crate::application::provider::{EdgeCacheProvider, ProviderError};
use crate::application::repos::SiteSettingsRepo;
use crate::domain::entities::SiteSettingsRecord;
use crate::domain::types::{ConfigValue, Credentials, SitePath, Zone};

const SITE_FIELD_PREFIX: &str = "Cloudflare";

/// Purge configuration fields subject to layered resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigField {
    Email,
    AuthKey,
    ZoneIdentifier,
    Paths,
}

impl ConfigField {
    pub const ALL: [ConfigField; 4] = [
        ConfigField::Email,
        ConfigField::AuthKey,
        ConfigField::ZoneIdentifier,
        ConfigField::Paths,
    ];

    /// Field name in the static layer.
    pub fn static_key(self) -> &'static str {
        match self {
            ConfigField::Email => "Email",
            ConfigField::AuthKey => "AuthKey",
            ConfigField::ZoneIdentifier => "ZoneIdentifier",
            ConfigField::Paths => "Paths",
        }
    }

    /// Field name in the site layer.
    pub fn site_key(self) -> String {
        format!("{SITE_FIELD_PREFIX}{}", self.static_key())
    }
}

/// Deploy-time purge settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticPurgeConfig {
    pub email: Option<String>,
    pub auth_key: Option<String>,
    pub zone_identifier: Option<String>,
    pub paths: Option<ConfigValue>,
    pub hide_site_config: bool,
}

impl StaticPurgeConfig {
    /// Non-blank static value for `field`.
    pub fn value(&self, field: ConfigField) -> Option<ConfigValue> {
        let value = match field {
            ConfigField::Email => self.email.clone().map(ConfigValue::Text),
            ConfigField::AuthKey => self.auth_key.clone().map(ConfigValue::Text),
            ConfigField::ZoneIdentifier => self.zone_identifier.clone().map(ConfigValue::Text),
            ConfigField::Paths => self.paths.clone(),
        };
        value.filter(|value| !value.is_blank())
    }

    /// True when the static layer pins `field`, making the site value read-only.
    pub fn defines(&self, field: ConfigField) -> bool {
        self.value(field).is_some()
    }
}

impl From<&crate::config::CloudflareSettings> for StaticPurgeConfig {
    fn from(settings: &crate::config::CloudflareSettings) -> Self {
        Self {
            email: settings.email.clone(),
            auth_key: settings.auth_key.clone(),
            zone_identifier: settings.zone_identifier.clone(),
            paths: settings.paths.clone(),
            hide_site_config: settings.hide_site_config,
        }
    }
}

/// Fully resolved configuration for one purge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurgeConfig {
    pub credential_email: String,
    pub credential_key: String,
    pub zone_id: String,
    pub site_paths: Vec<SitePath>,
    pub hide_site_config: bool,
}

impl PurgeConfig {
    pub fn credentials(&self) -> Credentials {
        Credentials::new(self.credential_email.clone(), self.credential_key.clone())
    }

    /// True when a remote purge can be attempted.
    pub fn can_purge(&self) -> bool {
        !self.credential_email.is_empty()
            && !self.credential_key.is_empty()
            && !self.zone_id.is_empty()
    }
}

#[derive(Debug, Error)]
pub enum ZoneListError {
    #[error("could not fetch the zone list: {0}")]
    Provider(#[from] ProviderError),
}

pub struct ConfigResolver {
    static_layer: StaticPurgeConfig,
    site_settings: Arc<dyn SiteSettingsRepo>,
}

impl ConfigResolver {
    pub fn new(static_layer: StaticPurgeConfig, site_settings: Arc<dyn SiteSettingsRepo>) -> Self {
        Self {
            static_layer,
            site_settings,
        }
    }

    pub fn static_layer(&self) -> &StaticPurgeConfig {
        &self.static_layer
    }

    /// Resolve `field` to a flat string; absence is the empty string.
    pub async fn resolve(&self, field: ConfigField) -> String {
        self.resolve_raw(field)
            .await
            .map(|value| value.join("\n"))
            .unwrap_or_default()
    }

    /// Resolve `field` keeping its raw shape.
    pub async fn resolve_raw(&self, field: ConfigField) -> Option<ConfigValue> {
        if let Some(value) = self.static_layer.value(field) {
            return Some(value);
        }

        let site = self.load_site_layer().await?;
        site_value(&site, field)
    }

    /// Normalized site paths; empty when none are configured.
    pub async fn resolve_paths(&self) -> Vec<SitePath> {
        self.resolve_raw(ConfigField::Paths)
            .await
            .map(|value| normalize_paths(&value))
            .unwrap_or_default()
    }

    pub async fn resolve_credentials(&self) -> Credentials {
        let site = self.site_layer_for(&[ConfigField::Email, ConfigField::AuthKey]).await;
        Credentials::new(
            self.pick(ConfigField::Email, site.as_ref()),
            self.pick(ConfigField::AuthKey, site.as_ref()),
        )
    }

    /// Resolve every field, reading the site layer at most once.
    pub async fn resolve_config(&self) -> PurgeConfig {
        let site = self.site_layer_for(&ConfigField::ALL).await;
        let site_paths = self
            .static_layer
            .value(ConfigField::Paths)
            .or_else(|| site.as_ref().and_then(|site| site_value(site, ConfigField::Paths)))
            .map(|value| normalize_paths(&value))
            .unwrap_or_default();

        PurgeConfig {
            credential_email: self.pick(ConfigField::Email, site.as_ref()),
            credential_key: self.pick(ConfigField::AuthKey, site.as_ref()),
            zone_id: self.pick(ConfigField::ZoneIdentifier, site.as_ref()),
            site_paths,
            hide_site_config: self.static_layer.hide_site_config,
        }
    }

    /// List zones for the resolved credentials.
    ///
    /// Missing credentials are not an error: no remote call is made and the
    /// list is empty.
    pub async fn list_zones(
        &self,
        provider: &dyn EdgeCacheProvider,
    ) -> Result<Vec<Zone>, ZoneListError> {
        let credentials = self.resolve_credentials().await;
        if !credentials.is_complete() {
            debug!("zone listing skipped: credentials not configured");
            return Ok(Vec::new());
        }

        let zones = provider.list_zones(&credentials).await?;
        Ok(zones)
    }

    fn pick(&self, field: ConfigField, site: Option<&SiteSettingsRecord>) -> String {
        self.static_layer
            .value(field)
            .or_else(|| site.and_then(|site| site_value(site, field)))
            .map(|value| value.join("\n"))
            .unwrap_or_default()
    }

    async fn site_layer_for(&self, fields: &[ConfigField]) -> Option<SiteSettingsRecord> {
        if fields.iter().all(|field| self.static_layer.defines(*field)) {
            return None;
        }
        self.load_site_layer().await
    }

    async fn load_site_layer(&self) -> Option<SiteSettingsRecord> {
        if self.static_layer.hide_site_config {
            return None;
        }

        match self.site_settings.load_site_settings().await {
            Ok(record) => Some(record),
            Err(err) => {
                warn!(
                    error = %err,
                    "failed to load site settings; treating purge settings as absent"
                );
                None
            }
        }
    }
}

fn site_value(record: &SiteSettingsRecord, field: ConfigField) -> Option<ConfigValue> {
    let raw = match field {
        ConfigField::Email => &record.cloudflare_email,
        ConfigField::AuthKey => &record.cloudflare_auth_key,
        ConfigField::ZoneIdentifier => &record.cloudflare_zone_identifier,
        ConfigField::Paths => &record.cloudflare_paths,
    };
    let value = ConfigValue::Text(raw.clone());
    (!value.is_blank()).then_some(value)
}

/// Split, trim and normalize raw path entries, discarding blank ones.
pub fn normalize_paths(value: &ConfigValue) -> Vec<SitePath> {
    value
        .entries()
        .into_iter()
        .filter_map(SitePath::normalize)
        .collect()
}
