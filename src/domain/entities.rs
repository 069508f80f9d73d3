//! Domain entities mirrored from the per-site settings store.

use serde::{Deserialize, Serialize};

/// Admin-editable, per-site purge settings.
///
/// Every field is free text; an empty string means "not configured".
/// `cloudflare_paths` holds one site path per line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteSettingsRecord {
    pub cloudflare_email: String,
    pub cloudflare_auth_key: String,
    pub cloudflare_zone_identifier: String,
    pub cloudflare_paths: String,
}
