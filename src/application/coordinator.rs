//! Purge coordination for content lifecycle events.
//!
//! Each hook evaluates one event:
//!
//! ```text
//! IDLE -> EVALUATING -> (SKIPPED | PURGE_LIVE | PURGE_DRAFT | PURGE_BOTH) -> DONE
//! ```
//!
//! Hooks return a [`PurgeReport`] rather than a `Result`: purging is
//! best-effort cache maintenance and its failures never reach the content
//! write that triggered it.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

use metrics::{counter, histogram};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::application::provider::{EdgeCacheProvider, ProviderError};
use crate::application::resolver::{ConfigResolver, PurgeConfig};
use crate::application::targets::{PurgeTargetBuilder, to_stage_variant};
use crate::domain::content::{PurgeSubject, resolve_links};
use crate::domain::events::{ChangeKind, PurgeDecision, PurgeEvent, PurgeMode, SkipReason};
use crate::domain::types::PurgeTarget;

const METRIC_PURGE_REQUESTS: &str = "cfpurge_purge_requests_total";
const METRIC_PURGE_FAILURES: &str = "cfpurge_purge_failures_total";
const METRIC_PURGE_SKIPPED: &str = "cfpurge_purge_skipped_total";
const METRIC_PURGE_MS: &str = "cfpurge_purge_ms";

/// Whether a plain write on a non-versioned object purges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WritePolicy {
    /// Every write purges.
    #[default]
    Always,
    /// Only objects whose `purge_on_write` returns `Some(true)`.
    OptIn,
}

impl FromStr for WritePolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "always" => Ok(WritePolicy::Always),
            "opt_in" => Ok(WritePolicy::OptIn),
            other => Err(format!(
                "unknown write policy `{other}` (expected `always` or `opt_in`)"
            )),
        }
    }
}

/// Select the purge mode for `event`.
///
/// `write_opt_in` is the subject's answer to `purge_on_write`; it only
/// matters for non-versioned writes under [`WritePolicy::OptIn`].
pub fn decide(event: &PurgeEvent, policy: WritePolicy, write_opt_in: bool) -> PurgeDecision {
    if event.relative_links.is_empty() {
        return PurgeDecision::Skipped(SkipReason::NoLinks);
    }

    let mode = match (event.change_kind, event.is_versioned) {
        (ChangeKind::Publish, _) => PurgeMode::Live,
        (ChangeKind::Write, true) => PurgeMode::Draft,
        (ChangeKind::Write, false) => {
            if policy == WritePolicy::OptIn && !write_opt_in {
                return PurgeDecision::Skipped(SkipReason::WriteNotOptedIn);
            }
            PurgeMode::Live
        }
        (ChangeKind::Delete, true) => PurgeMode::Both,
        (ChangeKind::Delete, false) => PurgeMode::Live,
    };
    PurgeDecision::Purge(mode)
}

#[derive(Debug, Error)]
pub enum PurgeError {
    #[error("malformed purge input: {0}")]
    MalformedInput(String),
    #[error("remote purge failed: {0}")]
    RemoteCall(#[from] ProviderError),
}

/// Which cached rendition a single purge call targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PurgeVariant {
    Live,
    Draft,
}

impl PurgeVariant {
    pub fn as_str(self) -> &'static str {
        match self {
            PurgeVariant::Live => "live",
            PurgeVariant::Draft => "draft",
        }
    }
}

impl fmt::Display for PurgeVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "error")]
pub enum CallOutcome {
    Purged,
    Failed(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct PurgeCall {
    pub variant: PurgeVariant,
    pub targets: Vec<PurgeTarget>,
    pub outcome: CallOutcome,
}

/// What happened while handling one lifecycle event.
#[derive(Debug, Clone, Serialize)]
pub struct PurgeReport {
    pub event_id: Uuid,
    pub object_id: String,
    pub change_kind: ChangeKind,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub decision: PurgeDecision,
    pub calls: Vec<PurgeCall>,
}

impl PurgeReport {
    fn new(event: &PurgeEvent, decision: PurgeDecision) -> Self {
        Self {
            event_id: event.id,
            object_id: event.object_id.clone(),
            change_kind: event.change_kind,
            timestamp: event.timestamp,
            decision,
            calls: Vec::new(),
        }
    }

    /// True when no remote call failed.
    pub fn is_clean(&self) -> bool {
        self.calls
            .iter()
            .all(|call| call.outcome == CallOutcome::Purged)
    }
}

/// Orchestrates edge-cache purges for CMS lifecycle hooks.
pub struct PurgeCoordinator {
    resolver: Arc<ConfigResolver>,
    builder: PurgeTargetBuilder,
    provider: Arc<dyn EdgeCacheProvider>,
    write_policy: WritePolicy,
}

impl PurgeCoordinator {
    pub fn new(
        resolver: Arc<ConfigResolver>,
        builder: PurgeTargetBuilder,
        provider: Arc<dyn EdgeCacheProvider>,
        write_policy: WritePolicy,
    ) -> Self {
        Self {
            resolver,
            builder,
            provider,
            write_policy,
        }
    }

    /// A version of `subject` is about to become live.
    pub async fn on_before_publish(&self, subject: &dyn PurgeSubject) -> PurgeReport {
        self.handle(subject, ChangeKind::Publish).await
    }

    /// `subject` was saved.
    pub async fn on_after_write(&self, subject: &dyn PurgeSubject) -> PurgeReport {
        self.handle(subject, ChangeKind::Write).await
    }

    /// `subject` was deleted.
    pub async fn on_after_delete(&self, subject: &dyn PurgeSubject) -> PurgeReport {
        self.handle(subject, ChangeKind::Delete).await
    }

    pub async fn handle(&self, subject: &dyn PurgeSubject, change_kind: ChangeKind) -> PurgeReport {
        let event = PurgeEvent::new(
            subject.object_id(),
            change_kind,
            subject.is_versioned(),
            resolve_links(subject),
        );
        let write_opt_in = subject.purge_on_write() == Some(true);
        let decision = decide(&event, self.write_policy, write_opt_in);
        self.dispatch(&event, decision).await
    }

    /// Execute `decision` for `event`.
    #[instrument(
        skip_all,
        fields(
            event_id = %event.id,
            object_id = %event.object_id,
            change_kind = %event.change_kind,
            occurred_at = %event.timestamp,
        )
    )]
    pub async fn dispatch(&self, event: &PurgeEvent, decision: PurgeDecision) -> PurgeReport {
        let mode = match decision {
            PurgeDecision::Skipped(reason) => return skipped(event, reason),
            PurgeDecision::Purge(mode) => mode,
        };

        let config = self.resolver.resolve_config().await;
        if !config.can_purge() {
            return skipped(event, SkipReason::MissingCredentials);
        }

        debug!(
            %mode,
            link_count = event.relative_links.len(),
            path_count = config.site_paths.len(),
            "purge decision made"
        );

        let mut report = PurgeReport::new(event, decision);
        let live_targets = self.builder.build(&event.relative_links, &config.site_paths);

        if mode.includes_live() {
            let call = self
                .run_call(&config, PurgeVariant::Live, live_targets.clone())
                .await;
            report.calls.push(call);
        }

        if mode.includes_draft() {
            let staged = to_stage_variant(&live_targets);
            let call = self.run_call(&config, PurgeVariant::Draft, staged).await;
            report.calls.push(call);
        }

        report
    }

    async fn run_call(
        &self,
        config: &PurgeConfig,
        variant: PurgeVariant,
        targets: Vec<PurgeTarget>,
    ) -> PurgeCall {
        let outcome = match self.purge(config, variant, &targets).await {
            Ok(count) => {
                info!(
                    %variant,
                    zone_id = %config.zone_id,
                    target_count = count,
                    "edge cache purged"
                );
                CallOutcome::Purged
            }
            Err(err) => {
                counter!(METRIC_PURGE_FAILURES, "variant" => variant.as_str()).increment(1);
                match &err {
                    PurgeError::MalformedInput(_) => {
                        warn!(%variant, error = %err, "purge skipped")
                    }
                    PurgeError::RemoteCall(_) => info!(
                        %variant,
                        zone_id = %config.zone_id,
                        error = %err,
                        "edge cache purge failed"
                    ),
                }
                CallOutcome::Failed(err.to_string())
            }
        };

        PurgeCall {
            variant,
            targets,
            outcome,
        }
    }

    async fn purge(
        &self,
        config: &PurgeConfig,
        variant: PurgeVariant,
        targets: &[PurgeTarget],
    ) -> Result<usize, PurgeError> {
        if targets.is_empty() {
            return Err(PurgeError::MalformedInput(
                "no valid purge targets".to_string(),
            ));
        }

        counter!(METRIC_PURGE_REQUESTS, "variant" => variant.as_str()).increment(1);
        let started_at = Instant::now();
        let result = self
            .provider
            .purge_files(&config.credentials(), &config.zone_id, targets)
            .await;
        histogram!(METRIC_PURGE_MS, "variant" => variant.as_str())
            .record(started_at.elapsed().as_secs_f64() * 1000.0);

        result?;
        Ok(targets.len())
    }
}

fn skipped(event: &PurgeEvent, reason: SkipReason) -> PurgeReport {
    debug!(reason = reason.as_str(), "purge skipped");
    counter!(METRIC_PURGE_SKIPPED, "reason" => reason.as_str()).increment(1);
    PurgeReport::new(event, PurgeDecision::Skipped(reason))
}
