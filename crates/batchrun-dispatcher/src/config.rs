//! Dispatcher configuration.

use std::time::Duration;

use batchrun_core::intake::{DEFAULT_CONCURRENCY_LIMIT, MAX_BATCH_ITEMS, MAX_CONCURRENCY_LIMIT};
use batchrun_core::IntakeLimits;

/// Dispatcher configuration.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// HTTP server bind address.
    pub bind_addr: String,

    /// Concurrency used when a batch does not request one.
    pub default_concurrency: usize,

    /// Hard concurrency ceiling no batch may exceed.
    pub max_concurrency: usize,

    /// Hard maximum number of items per batch.
    pub max_items: usize,

    /// Per-item execution timeout enforced by the scheduler.
    pub item_timeout: Option<Duration>,

    /// Request timeout for the HTTP executor's client.
    pub http_timeout: Duration,
}

impl DispatcherConfig {
    /// Intake bounds derived from this configuration.
    pub fn intake_limits(&self) -> IntakeLimits {
        IntakeLimits {
            max_items: self.max_items,
            default_concurrency: self.default_concurrency,
            max_concurrency: self.max_concurrency,
        }
    }
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            bind_addr: "[::1]:50052".to_string(),
            default_concurrency: DEFAULT_CONCURRENCY_LIMIT,
            max_concurrency: MAX_CONCURRENCY_LIMIT,
            max_items: MAX_BATCH_ITEMS,
            item_timeout: None,
            http_timeout: Duration::from_secs(30),
        }
    }
}
