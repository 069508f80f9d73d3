//! Value types shared by the purge subsystem.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Absolute URL prefix under which the site is reachable.
///
/// Always ends with exactly one trailing `/`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct SitePath(String);

impl SitePath {
    /// Normalize a raw path entry; blank input yields `None`.
    pub fn normalize(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }

        let stem = trimmed.trim_end_matches('/');
        Some(Self(format!("{stem}/")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SitePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fully-qualified URL sent to the edge cache for eviction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PurgeTarget(String);

impl PurgeTarget {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PurgeTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PurgeTarget {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// A CDN zone as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone {
    pub id: String,
    pub name: String,
}

/// Account credentials used for every provider call.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub auth_key: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, auth_key: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            auth_key: auth_key.into(),
        }
    }

    pub fn is_complete(&self) -> bool {
        !self.email.is_empty() && !self.auth_key.is_empty()
    }
}

// The auth key never reaches the logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("auth_key", &if self.auth_key.is_empty() { "" } else { "***" })
            .finish()
    }
}

/// Raw value of a layered configuration field.
///
/// Path lists may arrive either as free text (one entry per line) or as an
/// already-structured list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Text(String),
    List(Vec<String>),
}

impl ConfigValue {
    /// True when the value carries no non-blank content.
    pub fn is_blank(&self) -> bool {
        match self {
            ConfigValue::Text(text) => text.trim().is_empty(),
            ConfigValue::List(items) => items.iter().all(|item| item.trim().is_empty()),
        }
    }

    /// Flatten into a single string, joining list entries with `separator`.
    pub fn join(&self, separator: &str) -> String {
        match self {
            ConfigValue::Text(text) => text.clone(),
            ConfigValue::List(items) => items.join(separator),
        }
    }

    /// Individual entries; text is split on newlines.
    pub fn entries(&self) -> Vec<&str> {
        match self {
            ConfigValue::Text(text) => text.lines().collect(),
            ConfigValue::List(items) => items.iter().map(String::as_str).collect(),
        }
    }
}
