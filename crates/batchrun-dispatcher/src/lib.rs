//! BatchRun Dispatcher Library
//!
//! Runs batches of heterogeneous requests under a hard concurrency ceiling,
//! isolating per-item failures, and returns one ordered result per batch.
//! Includes the HTTP executor, Prometheus-style metrics, and the REST API
//! served by `batchrun-server`.

pub mod aggregator;
pub mod config;
pub mod dispatcher;
pub mod executor;
pub mod http;
pub mod metrics;
pub mod scheduler;
pub mod state;

pub use aggregator::ResultAggregator;
pub use config::DispatcherConfig;
pub use dispatcher::{DispatchError, Dispatcher};
pub use executor::{ExecutorError, HttpExecutor, ItemExecutor};
pub use metrics::DispatchMetrics;
pub use scheduler::{FanOutScheduler, SchedulerError};
pub use state::AppState;
