//! Content lifecycle events and the purge decisions derived from them.

use std::fmt;

use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

/// Lifecycle notification emitted by the CMS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    /// The object was saved.
    Write,
    /// A version is about to become live.
    Publish,
    /// The object was deleted.
    Delete,
}

impl ChangeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ChangeKind::Write => "write",
            ChangeKind::Publish => "publish",
            ChangeKind::Delete => "delete",
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One lifecycle callback, built per hook invocation and never stored.
#[derive(Debug, Clone)]
pub struct PurgeEvent {
    /// Correlation id for logs.
    pub id: Uuid,
    pub object_id: String,
    pub change_kind: ChangeKind,
    pub is_versioned: bool,
    pub relative_links: Vec<String>,
    pub timestamp: OffsetDateTime,
}

impl PurgeEvent {
    pub fn new(
        object_id: impl Into<String>,
        change_kind: ChangeKind,
        is_versioned: bool,
        relative_links: Vec<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            object_id: object_id.into(),
            change_kind,
            is_versioned,
            relative_links,
            timestamp: OffsetDateTime::now_utc(),
        }
    }
}

/// Which cached renditions of an object must be evicted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PurgeMode {
    Live,
    Draft,
    Both,
}

impl PurgeMode {
    pub fn includes_live(self) -> bool {
        matches!(self, PurgeMode::Live | PurgeMode::Both)
    }

    pub fn includes_draft(self) -> bool {
        matches!(self, PurgeMode::Draft | PurgeMode::Both)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PurgeMode::Live => "live",
            PurgeMode::Draft => "draft",
            PurgeMode::Both => "both",
        }
    }
}

impl fmt::Display for PurgeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The object exposes no way to derive a URL.
    NoLinks,
    /// A plain write on an object that did not opt in to write purges.
    WriteNotOptedIn,
    /// Email, auth key or zone id resolved to empty.
    MissingCredentials,
}

impl SkipReason {
    pub fn as_str(self) -> &'static str {
        match self {
            SkipReason::NoLinks => "no_links",
            SkipReason::WriteNotOptedIn => "write_not_opted_in",
            SkipReason::MissingCredentials => "missing_credentials",
        }
    }
}

/// Outcome of evaluating one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "detail")]
pub enum PurgeDecision {
    Skipped(SkipReason),
    Purge(PurgeMode),
}

impl fmt::Display for PurgeDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PurgeDecision::Skipped(reason) => write!(f, "skipped({})", reason.as_str()),
            PurgeDecision::Purge(mode) => write!(f, "purge_{mode}"),
        }
    }
}
