//! Cloudflare edge-cache purging for CMS content.
//!
//! Content lifecycle hooks (write, publish, delete) feed the
//! [`PurgeCoordinator`](application::coordinator::PurgeCoordinator), which
//! derives absolute URLs from the changed object, resolves the layered purge
//! configuration and asks the edge cache provider to evict them. Purge
//! failures are logged and contained; they never fail the content write.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
