//! Fan-out scheduler - runs a batch's items under a concurrency cap.
//!
//! A single loop owns the batch. It admits pending items in index order while
//! fewer than `concurrency_limit` are running, then waits for the next
//! completion, the batch deadline, or cancellation. Slot accounting and the
//! terminal tally are only touched by that loop.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;
use thiserror::Error;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use batchrun_core::{
    Batch, BatchId, BatchResult, CoreError, ItemError, NotRunReason, Outcome, Target, WorkItem,
};

use crate::aggregator::ResultAggregator;
use crate::executor::{ExecutorError, ItemExecutor};
use crate::metrics::{DispatchMetrics, InFlightGuard};

/// Scheduler errors. Any of these aborts the whole batch.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("Executor unavailable: {0}")]
    ExecutorUnavailable(String),

    #[error("Item task failed: {0}")]
    TaskFailed(String),

    #[error("Invalid item transition: {0}")]
    InvalidTransition(#[from] CoreError),

    #[error("Aggregation error: {0}")]
    Aggregation(String),
}

type Completion = (usize, Result<Value, ExecutorError>);

/// State of one batch while it runs.
struct Execution {
    batch_id: BatchId,
    items: Vec<WorkItem>,
    limit: usize,
    /// Index of the next pending item.
    next: usize,
    stopped: Option<NotRunReason>,
    in_flight: JoinSet<Completion>,
    /// Dropped with the execution, which also aborts whatever is still in
    /// `in_flight`.
    gauge: InFlightGuard,
    aggregator: ResultAggregator,
}

impl Execution {
    fn new(batch: Batch, metrics: Arc<DispatchMetrics>) -> Self {
        let aggregator = ResultAggregator::new(batch.items.len());
        Self {
            batch_id: batch.id,
            items: batch.items,
            limit: batch.concurrency_limit.max(1),
            next: 0,
            stopped: None,
            in_flight: JoinSet::new(),
            gauge: InFlightGuard::new(metrics),
            aggregator,
        }
    }

    fn can_admit(&self) -> bool {
        self.stopped.is_none() && self.next < self.items.len() && self.in_flight.len() < self.limit
    }
}

/// Bounded-concurrency fan-out scheduler.
pub struct FanOutScheduler {
    executor: Arc<dyn ItemExecutor>,
    item_timeout: Option<Duration>,
    metrics: Arc<DispatchMetrics>,
}

impl FanOutScheduler {
    /// Create a new FanOutScheduler.
    pub fn new(executor: Arc<dyn ItemExecutor>, metrics: Arc<DispatchMetrics>) -> Self {
        Self {
            executor,
            item_timeout: None,
            metrics,
        }
    }

    /// Builder method to set the per-item timeout.
    pub fn with_item_timeout(mut self, item_timeout: Option<Duration>) -> Self {
        self.item_timeout = item_timeout;
        self
    }

    /// Run every item of `batch` and return the ordered result.
    ///
    /// Returns once every item is terminal. When the deadline elapses or
    /// `cancel` fires, pending items are recorded as not run and running
    /// items are left to finish. On a scheduler error, running items are
    /// aborted and no result is produced.
    pub async fn run(
        &self,
        batch: Batch,
        cancel: CancellationToken,
    ) -> Result<BatchResult, SchedulerError> {
        let started = Instant::now();
        let deadline_at = batch.deadline.map(|d| tokio::time::Instant::now() + d);
        let mut execution = Execution::new(batch, Arc::clone(&self.metrics));

        info!(
            batch_id = %execution.batch_id,
            items = execution.items.len(),
            concurrency_limit = execution.limit,
            deadline_at = ?deadline_at,
            "Starting batch execution"
        );

        if let Err(err) = self.drive(&mut execution, deadline_at, &cancel).await {
            let abandoned = execution.gauge.held();
            execution.in_flight.abort_all();
            warn!(
                batch_id = %execution.batch_id,
                error = %err,
                abandoned,
                "Batch aborted"
            );
            return Err(err);
        }

        let elapsed_ms = started.elapsed().as_millis() as u64;
        let result = execution
            .aggregator
            .finish(execution.batch_id, elapsed_ms)?;

        info!(
            batch_id = %result.batch_id,
            succeeded = result.succeeded_count,
            failed = result.failed_count,
            cancelled = result.cancelled_count,
            elapsed_ms,
            "Batch execution finished"
        );

        Ok(result)
    }

    async fn drive(
        &self,
        execution: &mut Execution,
        deadline_at: Option<tokio::time::Instant>,
        cancel: &CancellationToken,
    ) -> Result<(), SchedulerError> {
        if cancel.is_cancelled() {
            self.stop_admitting(execution, NotRunReason::Cancelled)?;
        }

        loop {
            self.admit_ready(execution)?;

            if execution.in_flight.is_empty() {
                break;
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled(), if execution.stopped.is_none() => {
                    self.stop_admitting(execution, NotRunReason::Cancelled)?;
                }
                _ = wait_until(deadline_at), if execution.stopped.is_none() => {
                    self.stop_admitting(execution, NotRunReason::Deadline)?;
                }
                joined = execution.in_flight.join_next() => {
                    let Some(joined) = joined else {
                        break;
                    };
                    execution.gauge.release();
                    let (index, result) =
                        joined.map_err(|e| SchedulerError::TaskFailed(e.to_string()))?;
                    self.complete_item(execution, index, result)?;
                }
            }
        }

        Ok(())
    }

    /// Admit pending items in index order until every slot is taken.
    fn admit_ready(&self, execution: &mut Execution) -> Result<(), SchedulerError> {
        while execution.can_admit() {
            let index = execution.next;
            let item = &mut execution.items[index];
            item.start()?;
            let target = item.target.clone();

            execution.gauge.acquire();
            debug!(
                batch_id = %execution.batch_id,
                index,
                running = execution.in_flight.len() + 1,
                "Admitting item"
            );

            let executor = Arc::clone(&self.executor);
            let item_timeout = self.item_timeout;
            execution.in_flight.spawn(async move {
                let result = execute_item(executor.as_ref(), &target, item_timeout).await;
                (index, result)
            });
            execution.next += 1;
        }
        Ok(())
    }

    fn complete_item(
        &self,
        execution: &mut Execution,
        index: usize,
        result: Result<Value, ExecutorError>,
    ) -> Result<(), SchedulerError> {
        let item = execution.items.get_mut(index).ok_or_else(|| {
            SchedulerError::Aggregation(format!("completion for unknown index {index}"))
        })?;

        let outcome = match result {
            Ok(payload) => {
                item.succeed()?;
                debug!(batch_id = %execution.batch_id, index, "Item succeeded");
                Outcome::success(index, payload, item.elapsed_ms())
            }
            Err(ExecutorError::Item(error)) => {
                item.fail()?;
                warn!(batch_id = %execution.batch_id, index, error = %error, "Item failed");
                Outcome::error(index, error, item.elapsed_ms())
            }
            Err(ExecutorError::Unavailable(reason)) => {
                return Err(SchedulerError::ExecutorUnavailable(reason));
            }
        };

        self.metrics.item_recorded(outcome.status);
        execution.aggregator.record(outcome)
    }

    /// Stop admitting and record every remaining pending item as not run.
    fn stop_admitting(
        &self,
        execution: &mut Execution,
        reason: NotRunReason,
    ) -> Result<(), SchedulerError> {
        execution.stopped = Some(reason);
        info!(
            batch_id = %execution.batch_id,
            reason = %reason,
            running = execution.in_flight.len(),
            skipped = execution.items.len() - execution.next,
            "Stopped admitting items"
        );

        for item in &mut execution.items[execution.next..] {
            item.cancel()?;
            let outcome = Outcome::cancelled(item.index, reason);
            self.metrics.item_recorded(outcome.status);
            execution.aggregator.record(outcome)?;
        }
        execution.next = execution.items.len();
        Ok(())
    }
}

async fn execute_item(
    executor: &dyn ItemExecutor,
    target: &Target,
    item_timeout: Option<Duration>,
) -> Result<Value, ExecutorError> {
    match item_timeout {
        Some(limit) => tokio::time::timeout(limit, executor.execute(target))
            .await
            .unwrap_or_else(|_| Err(ItemError::Timeout.into())),
        None => executor.execute(target).await,
    }
}

async fn wait_until(deadline: Option<tokio::time::Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}
