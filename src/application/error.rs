use thiserror::Error;

use crate::application::resolver::ZoneListError;
use crate::application::settings_panel::SettingsPanel;
use crate::config::LoadError;
use crate::infra::error::InfraError;

/// Errors surfaced at the binary boundary.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] LoadError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error(transparent)]
    Zones(#[from] ZoneListError),
    #[error("site settings are hidden by the deployment configuration")]
    SettingsHidden,
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }

    /// Unwrap an optional settings panel, reporting a hidden panel as an error.
    pub fn require_panel(panel: Option<SettingsPanel>) -> Result<SettingsPanel, Self> {
        panel.ok_or(Self::SettingsHidden)
    }
}
