//! Result aggregation.
//!
//! Outcomes arrive in completion order. The aggregator places each one in the
//! slot of its index and only builds a [`BatchResult`] once every
//! slot is filled exactly once.

use batchrun_core::{BatchId, BatchResult, Outcome};

use crate::scheduler::SchedulerError;

/// Collects terminal outcomes for one batch.
#[derive(Debug)]
pub struct ResultAggregator {
    slots: Vec<Option<Outcome>>,
}

impl ResultAggregator {
    /// Create an aggregator expecting `expected` outcomes.
    pub fn new(expected: usize) -> Self {
        Self {
            slots: vec![None; expected],
        }
    }

    /// Record one terminal outcome.
    ///
    /// An index outside the batch or an index recorded twice is an internal
    /// error; the outcome is not stored.
    pub fn record(&mut self, outcome: Outcome) -> Result<(), SchedulerError> {
        let index = outcome.index;
        let expected = self.slots.len();
        let slot = self.slots.get_mut(index).ok_or_else(|| {
            SchedulerError::Aggregation(format!(
                "outcome index {index} out of range for batch of {expected}"
            ))
        })?;

        if slot.is_some() {
            return Err(SchedulerError::Aggregation(format!(
                "duplicate outcome for index {index}"
            )));
        }

        *slot = Some(outcome);
        Ok(())
    }

    /// Build the final result, in index order.
    pub fn finish(self, batch_id: BatchId, elapsed_ms: u64) -> Result<BatchResult, SchedulerError> {
        let mut outcomes = Vec::with_capacity(self.slots.len());
        for (index, slot) in self.slots.into_iter().enumerate() {
            let outcome = slot.ok_or_else(|| {
                SchedulerError::Aggregation(format!("missing outcome for index {index}"))
            })?;
            outcomes.push(outcome);
        }

        Ok(BatchResult::from_ordered(batch_id, outcomes, elapsed_ms))
    }
}
