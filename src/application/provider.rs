//! Remote edge-cache provider seam.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::types::{Credentials, PurgeTarget, Zone};

#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider answered with an error payload.
    #[error("{message} (code {code})")]
    Api { message: String, code: i64 },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("failed to decode provider response: {0}")]
    Decode(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl ProviderError {
    pub fn api(message: impl Into<String>, code: i64) -> Self {
        Self::Api {
            message: message.into(),
            code,
        }
    }
}

/// Capabilities of the CDN provider used by this subsystem.
#[async_trait]
pub trait EdgeCacheProvider: Send + Sync {
    /// List every zone visible to `credentials`.
    async fn list_zones(&self, credentials: &Credentials) -> Result<Vec<Zone>, ProviderError>;

    /// Evict `targets` from the edge cache of `zone_id`.
    async fn purge_files(
        &self,
        credentials: &Credentials,
        zone_id: &str,
        targets: &[PurgeTarget],
    ) -> Result<(), ProviderError>;
}
