//! Admin settings panel model for the purge configuration.
//!
//! Fields pinned by the static layer are shown read-only with the static
//! value; everything else shows the editable site value.

use serde::Serialize;
use tracing::warn;

use crate::application::provider::EdgeCacheProvider;
use crate::application::repos::SiteSettingsRepo;
use crate::application::resolver::{ConfigField, ConfigResolver};
use crate::domain::entities::SiteSettingsRecord;
use crate::domain::types::{ConfigValue, Zone};

pub const ZONE_FETCH_ERROR: &str = "Could not fetch the Zone list from Cloudflare.";
pub const ZONE_CHOOSE_LABEL: &str = "(Choose the Zone where the cache will be purged)";
pub const ZONE_NO_CREDENTIALS_LABEL: &str = "(You must provide valid credentials to select a Zone.)";
pub const PATHS_HELP: &str = "If this site is available under multiple paths, you can specify \
each one on a different line. If you only use one path to reach the site, you can leave this \
field blank.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PanelField {
    pub name: String,
    pub label: &'static str,
    pub value: String,
    pub read_only: bool,
    pub help: Option<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ZoneField {
    pub field: PanelField,
    pub choices: Vec<Zone>,
    pub empty_label: &'static str,
    pub error: Option<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SettingsPanel {
    pub email: PanelField,
    pub auth_key: PanelField,
    pub zone: ZoneField,
    pub paths: PanelField,
}

impl SettingsPanel {
    /// Build the panel; `None` when the static layer hides site settings.
    pub async fn build(
        resolver: &ConfigResolver,
        site_settings: &dyn SiteSettingsRepo,
        provider: &dyn EdgeCacheProvider,
    ) -> Option<Self> {
        let static_layer = resolver.static_layer();
        if static_layer.hide_site_config {
            return None;
        }

        let site = site_settings.load_site_settings().await.unwrap_or_else(|err| {
            warn!(error = %err, "failed to load site settings for the settings panel");
            SiteSettingsRecord::default()
        });

        let field = |field: ConfigField, label: &'static str, site_value: &str| {
            let pinned = static_layer.value(field);
            PanelField {
                name: field.site_key(),
                label,
                read_only: pinned.is_some(),
                value: pinned
                    .map(|value| display_value(&value))
                    .unwrap_or_else(|| site_value.to_string()),
                help: None,
            }
        };

        let email = field(ConfigField::Email, "Cloudflare Email", &site.cloudflare_email);
        let auth_key = field(
            ConfigField::AuthKey,
            "Cloudflare Auth Key",
            &site.cloudflare_auth_key,
        );
        let mut paths = field(ConfigField::Paths, "Cloudflare Paths", &site.cloudflare_paths);
        if !paths.read_only {
            paths.help = Some(PATHS_HELP);
        }

        let (choices, error) = match resolver.list_zones(provider).await {
            Ok(zones) => (zones, None),
            Err(err) => {
                warn!(error = %err, "zone list unavailable for the settings panel");
                (Vec::new(), Some(ZONE_FETCH_ERROR))
            }
        };
        let empty_label = if choices.is_empty() {
            ZONE_NO_CREDENTIALS_LABEL
        } else {
            ZONE_CHOOSE_LABEL
        };
        let zone = ZoneField {
            field: field(
                ConfigField::ZoneIdentifier,
                "Cloudflare Zone",
                &site.cloudflare_zone_identifier,
            ),
            choices,
            empty_label,
            error,
        };

        Some(Self {
            email,
            auth_key,
            zone,
            paths,
        })
    }
}

/// One line of text: entries trimmed, blanks dropped, joined with `, `.
fn display_value(value: &ConfigValue) -> String {
    value
        .entries()
        .into_iter()
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;

    use super::*;
    use crate::application::provider::ProviderError;
    use crate::application::repos::RepoError;
    use crate::application::resolver::StaticPurgeConfig;
    use crate::domain::types::{Credentials, PurgeTarget};

    struct StubSettings(SiteSettingsRecord);

    #[async_trait]
    impl SiteSettingsRepo for StubSettings {
        async fn load_site_settings(&self) -> Result<SiteSettingsRecord, RepoError> {
            Ok(self.0.clone())
        }
    }

    struct StubProvider {
        fail: bool,
    }

    #[async_trait]
    impl EdgeCacheProvider for StubProvider {
        async fn list_zones(&self, _credentials: &Credentials) -> Result<Vec<Zone>, ProviderError> {
            if self.fail {
                return Err(ProviderError::api("Authentication error", 10000));
            }
            Ok(vec![Zone {
                id: "zone-1".into(),
                name: "example.com".into(),
            }])
        }

        async fn purge_files(
            &self,
            _credentials: &Credentials,
            _zone_id: &str,
            _targets: &[PurgeTarget],
        ) -> Result<(), ProviderError> {
            unreachable!("not used in these tests")
        }
    }

    fn site() -> SiteSettingsRecord {
        SiteSettingsRecord {
            cloudflare_email: "site@example.com".into(),
            cloudflare_auth_key: "site-key".into(),
            cloudflare_zone_identifier: "zone-1".into(),
            cloudflare_paths: "https://example.com".into(),
        }
    }

    async fn panel(
        static_layer: StaticPurgeConfig,
        record: SiteSettingsRecord,
        fail: bool,
    ) -> Option<SettingsPanel> {
        let repo = Arc::new(StubSettings(record));
        let resolver = ConfigResolver::new(static_layer, repo.clone());
        SettingsPanel::build(&resolver, repo.as_ref(), &StubProvider { fail }).await
    }

    #[tokio::test]
    async fn hidden_when_site_config_is_hidden() {
        let static_layer = StaticPurgeConfig {
            hide_site_config: true,
            ..Default::default()
        };
        assert!(panel(static_layer, site(), false).await.is_none());
    }

    #[tokio::test]
    async fn static_fields_are_read_only() {
        let static_layer = StaticPurgeConfig {
            email: Some("ops@example.com".into()),
            paths: Some(ConfigValue::List(vec![
                "https://a.com".into(),
                "https://b.com".into(),
            ])),
            ..Default::default()
        };
        let panel = panel(static_layer, site(), false).await.expect("panel");

        assert!(panel.email.read_only);
        assert_eq!(panel.email.value, "ops@example.com");
        assert!(!panel.auth_key.read_only);
        assert_eq!(panel.auth_key.value, "site-key");
        assert!(panel.paths.read_only);
        assert_eq!(panel.paths.value, "https://a.com, https://b.com");
        assert!(panel.paths.help.is_none());
        assert_eq!(panel.email.name, "CloudflareEmail");
    }

    #[tokio::test]
    async fn static_text_paths_are_shown_on_one_line() {
        let static_layer = StaticPurgeConfig {
            paths: Some(ConfigValue::Text(
                "https://a.com\n\n  https://b.com/  \n".into(),
            )),
            ..Default::default()
        };
        let panel = panel(static_layer, site(), false).await.expect("panel");

        assert!(panel.paths.read_only);
        assert_eq!(panel.paths.value, "https://a.com, https://b.com/");
    }

    #[tokio::test]
    async fn zone_choices_are_listed() {
        let panel = panel(StaticPurgeConfig::default(), site(), false)
            .await
            .expect("panel");

        assert_eq!(panel.zone.choices.len(), 1);
        assert_eq!(panel.zone.empty_label, ZONE_CHOOSE_LABEL);
        assert!(panel.zone.error.is_none());
        assert_eq!(panel.paths.help, Some(PATHS_HELP));
    }

    #[tokio::test]
    async fn zone_error_is_reported() {
        let panel = panel(StaticPurgeConfig::default(), site(), true)
            .await
            .expect("panel");

        assert!(panel.zone.choices.is_empty());
        assert_eq!(panel.zone.error, Some(ZONE_FETCH_ERROR));
        assert_eq!(panel.zone.empty_label, ZONE_NO_CREDENTIALS_LABEL);
    }

    #[tokio::test]
    async fn missing_credentials_show_hint() {
        let panel = panel(
            StaticPurgeConfig::default(),
            SiteSettingsRecord::default(),
            false,
        )
        .await
        .expect("panel");

        assert!(panel.zone.choices.is_empty());
        assert!(panel.zone.error.is_none());
        assert_eq!(panel.zone.empty_label, ZONE_NO_CREDENTIALS_LABEL);
    }
}
