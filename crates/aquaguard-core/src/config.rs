// ── Engine configuration ──
//
// Plain runtime settings for the sync engine. Loading them from disk is
// the config crate's job; this crate never reads files for settings.

use std::time::Duration;

use aquaguard_api::transport::NODE_TIMEOUT;

use crate::cache::STATUS_TTL;
use crate::failure::OFFLINE_THRESHOLD;
use crate::model::NotificationRules;
use crate::pool::MAX_WORKERS;

/// Shortest allowed poll interval.
pub const MIN_POLL_INTERVAL_MS: u64 = 1000;

/// Default poll interval.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 3000;

/// Runtime settings for the poll orchestrator.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Clamped to at least [`MIN_POLL_INTERVAL_MS`].
    pub poll_interval_ms: u64,
    pub max_workers: usize,
    pub offline_threshold: u32,
    pub status_ttl: Duration,
    /// Per-call timeout for HTTP nodes.
    pub node_timeout: Duration,
    /// Record transitions in the change log.
    pub change_logging: bool,
    pub notification_rules: NotificationRules,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            max_workers: MAX_WORKERS,
            offline_threshold: OFFLINE_THRESHOLD,
            status_ttl: STATUS_TTL,
            node_timeout: NODE_TIMEOUT,
            change_logging: false,
            notification_rules: NotificationRules::new(),
        }
    }
}

/// Clamp a requested interval to the allowed minimum.
pub fn clamp_interval(ms: u64) -> u64 {
    ms.max(MIN_POLL_INTERVAL_MS)
}
