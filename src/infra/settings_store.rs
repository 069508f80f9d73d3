//! Site settings stores backing the mutable configuration layer.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, warn};

use crate::application::repos::{RepoError, SiteSettingsRepo};
use crate::domain::entities::SiteSettingsRecord;

/// Process-local settings, updated by whoever embeds the purge subsystem.
#[derive(Debug, Default)]
pub struct InMemorySiteSettings {
    record: RwLock<SiteSettingsRecord>,
}

impl InMemorySiteSettings {
    pub fn new(record: SiteSettingsRecord) -> Self {
        Self {
            record: RwLock::new(record),
        }
    }

    /// Replace the stored settings; the next resolution picks them up.
    pub fn replace(&self, record: SiteSettingsRecord) {
        *self.write() = record;
    }

    // Records are swapped whole, so a poisoned lock still holds a complete one.
    fn read(&self) -> RwLockReadGuard<'_, SiteSettingsRecord> {
        self.record.read().unwrap_or_else(|poisoned| {
            warn!(op = "load", "recovered poisoned site settings lock");
            poisoned.into_inner()
        })
    }

    fn write(&self) -> RwLockWriteGuard<'_, SiteSettingsRecord> {
        self.record.write().unwrap_or_else(|poisoned| {
            warn!(op = "replace", "recovered poisoned site settings lock");
            poisoned.into_inner()
        })
    }
}

#[async_trait]
impl SiteSettingsRepo for InMemorySiteSettings {
    async fn load_site_settings(&self) -> Result<SiteSettingsRecord, RepoError> {
        Ok(self.read().clone())
    }
}

/// Settings kept in a TOML file, re-read on every load.
///
/// A missing file means no site settings have been saved yet.
#[derive(Debug, Clone)]
pub struct TomlSiteSettingsStore {
    path: PathBuf,
}

impl TomlSiteSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SiteSettingsRepo for TomlSiteSettingsStore {
    async fn load_site_settings(&self) -> Result<SiteSettingsRecord, RepoError> {
        let contents = match fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "site settings file not found");
                return Ok(SiteSettingsRecord::default());
            }
            Err(err) => return Err(RepoError::from_persistence(err)),
        };

        toml::from_str(&contents).map_err(|err| RepoError::InvalidInput {
            message: format!("{}: {err}", self.path.display()),
        })
    }
}
