//! Absolute purge target construction.

use std::collections::HashSet;

use tracing::warn;
use url::Url;

use crate::domain::types::{PurgeTarget, SitePath};

const STAGE_PARAM: &str = "stage";
const STAGE_VALUE: &str = "Stage";

/// Builds absolute purge targets from site-relative links.
#[derive(Debug, Clone)]
pub struct PurgeTargetBuilder {
    base_url: SitePath,
}

impl PurgeTargetBuilder {
    /// `base_url` is the site's canonical absolute base URL, used when no
    /// site paths are configured.
    pub fn new(base_url: SitePath) -> Self {
        Self { base_url }
    }

    /// Cross every site path with every relative link.
    ///
    /// Targets are ordered path-major; duplicates keep their first position.
    pub fn build(&self, relative_links: &[String], site_paths: &[SitePath]) -> Vec<PurgeTarget> {
        if relative_links.is_empty() {
            return Vec::new();
        }

        let fallback;
        let paths = if site_paths.is_empty() {
            fallback = [self.base_url.clone()];
            &fallback[..]
        } else {
            site_paths
        };

        let mut seen = HashSet::new();
        let mut targets = Vec::with_capacity(paths.len() * relative_links.len());
        for path in paths {
            for link in relative_links {
                let target = format!("{path}{}", link.trim_start_matches('/'));
                if seen.insert(target.clone()) {
                    targets.push(PurgeTarget::new(target));
                }
            }
        }
        targets
    }
}

/// Rewrite targets to their draft-preview variant.
///
/// Sets `stage=Stage` (in place when already present), keeps every other
/// query pair in order and drops the fragment. Targets that are not absolute
/// URLs are logged and dropped.
pub fn to_stage_variant(targets: &[PurgeTarget]) -> Vec<PurgeTarget> {
    targets
        .iter()
        .filter_map(|target| match stage_url(target.as_str()) {
            Ok(url) => Some(PurgeTarget::new(url)),
            Err(err) => {
                warn!(
                    target_url = %target,
                    error = %err,
                    "dropping malformed purge target from draft variant"
                );
                None
            }
        })
        .collect()
}

fn stage_url(raw: &str) -> Result<String, url::ParseError> {
    let mut url = Url::parse(raw)?;

    let mut pairs: Vec<(String, String)> = Vec::new();
    let mut staged = false;
    for (key, value) in url.query_pairs() {
        if key == STAGE_PARAM {
            if !staged {
                pairs.push((STAGE_PARAM.to_string(), STAGE_VALUE.to_string()));
                staged = true;
            }
            continue;
        }
        pairs.push((key.into_owned(), value.into_owned()));
    }
    if !staged {
        pairs.push((STAGE_PARAM.to_string(), STAGE_VALUE.to_string()));
    }

    url.set_fragment(None);
    url.set_query(None);
    url.query_pairs_mut().extend_pairs(pairs);

    Ok(url.into())
}
