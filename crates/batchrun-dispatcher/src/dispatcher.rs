//! Batch submission interface.

use std::sync::Arc;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use batchrun_core::{normalize, BatchRequest, BatchResult, IntakeLimits, ValidationError};

use crate::config::DispatcherConfig;
use crate::executor::ItemExecutor;
use crate::metrics::DispatchMetrics;
use crate::scheduler::{FanOutScheduler, SchedulerError};

/// Why a dispatch produced no result.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The request was rejected before anything ran.
    #[error("Invalid batch: {0}")]
    Validation(#[from] ValidationError),

    /// The batch was aborted while running.
    #[error("Batch aborted: {0}")]
    Scheduler(#[from] SchedulerError),
}

/// Validates batch requests and runs them through the fan-out scheduler.
///
/// Every call builds its own batch; nothing is shared between dispatches
/// except the executor and the process-wide metrics.
pub struct Dispatcher {
    limits: IntakeLimits,
    scheduler: FanOutScheduler,
    metrics: Arc<DispatchMetrics>,
}

impl Dispatcher {
    /// Create a new Dispatcher.
    pub fn new(config: &DispatcherConfig, executor: Arc<dyn ItemExecutor>) -> Self {
        let metrics = Arc::new(DispatchMetrics::default());
        let scheduler = FanOutScheduler::new(executor, metrics.clone())
            .with_item_timeout(config.item_timeout);

        Self {
            limits: config.intake_limits(),
            scheduler,
            metrics,
        }
    }

    /// Run a batch to completion.
    pub async fn dispatch(&self, request: BatchRequest) -> Result<BatchResult, DispatchError> {
        self.dispatch_with_cancel(request, CancellationToken::new())
            .await
    }

    /// Run a batch to completion, stopping admission when `cancel` fires.
    pub async fn dispatch_with_cancel(
        &self,
        request: BatchRequest,
        cancel: CancellationToken,
    ) -> Result<BatchResult, DispatchError> {
        let batch = match normalize(request, &self.limits) {
            Ok(batch) => batch,
            Err(e) => {
                self.record_rejection(&e);
                return Err(e.into());
            }
        };

        let batch_id = batch.id.clone();
        info!(
            batch_id = %batch_id,
            items = batch.len(),
            concurrency_limit = batch.concurrency_limit,
            "Dispatching batch"
        );

        match self.scheduler.run(batch, cancel).await {
            Ok(result) => {
                self.metrics.batch_completed();
                Ok(result)
            }
            Err(e) => {
                self.metrics.batch_aborted();
                error!(batch_id = %batch_id, error = %e, "Batch aborted");
                Err(e.into())
            }
        }
    }

    /// Count and log a batch rejected before scheduling.
    ///
    /// Also used by callers that fail to decode a request before it reaches
    /// [`Dispatcher::dispatch`].
    pub fn record_rejection(&self, error: &ValidationError) {
        self.metrics.batch_rejected();
        warn!(field = %error.field(), error = %error, "Rejected batch");
    }

    /// Intake bounds in effect.
    pub fn limits(&self) -> &IntakeLimits {
        &self.limits
    }

    /// Process-wide dispatch metrics.
    pub fn metrics(&self) -> &Arc<DispatchMetrics> {
        &self.metrics
    }
}
