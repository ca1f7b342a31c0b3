//! Per-item outcomes and the final batch result.

use crate::{BatchId, ItemError, NotRunReason, OutcomeStatus};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Terminal result of one WorkItem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    /// Mirrors the WorkItem's index.
    pub index: usize,

    /// Success, error, or never run.
    pub status: OutcomeStatus,

    /// Executor payload on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,

    /// Structured failure on error or cancellation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<ItemError>,

    /// Execution time, absent for items that never ran.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

impl Outcome {
    /// Outcome of an item whose executor returned a payload.
    pub fn success(index: usize, payload: Value, duration_ms: Option<u64>) -> Self {
        Self {
            index,
            status: OutcomeStatus::Success,
            payload: Some(payload),
            error_detail: None,
            duration_ms,
        }
    }

    /// Outcome of an item whose executor failed.
    pub fn error(index: usize, error: ItemError, duration_ms: Option<u64>) -> Self {
        Self {
            index,
            status: OutcomeStatus::Error,
            payload: None,
            error_detail: Some(error),
            duration_ms,
        }
    }

    /// Outcome of an item that was never admitted.
    pub fn cancelled(index: usize, reason: NotRunReason) -> Self {
        Self {
            index,
            status: OutcomeStatus::Cancelled,
            payload: None,
            error_detail: Some(ItemError::NotRun { reason }),
            duration_ms: None,
        }
    }
}

/// The single, final response for one batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResult {
    /// Batch this result belongs to.
    pub batch_id: BatchId,

    /// One outcome per item, in index order.
    pub outcomes: Vec<Outcome>,

    pub succeeded_count: usize,
    pub failed_count: usize,
    pub cancelled_count: usize,

    /// Wall-clock time of the whole batch.
    pub elapsed_ms: u64,
}

impl BatchResult {
    /// Build a result from outcomes that are already in index order.
    pub fn from_ordered(batch_id: BatchId, outcomes: Vec<Outcome>, elapsed_ms: u64) -> Self {
        let mut succeeded_count = 0;
        let mut failed_count = 0;
        let mut cancelled_count = 0;

        for outcome in &outcomes {
            match outcome.status {
                OutcomeStatus::Success => succeeded_count += 1,
                OutcomeStatus::Error => failed_count += 1,
                OutcomeStatus::Cancelled => cancelled_count += 1,
            }
        }

        Self {
            batch_id,
            outcomes,
            succeeded_count,
            failed_count,
            cancelled_count,
            elapsed_ms,
        }
    }

    /// Number of outcomes.
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_ordered_tallies() {
        let outcomes = vec![
            Outcome::success(0, json!({"ok": true}), Some(5)),
            Outcome::error(1, ItemError::Timeout, Some(30)),
            Outcome::cancelled(2, NotRunReason::Deadline),
        ];
        let result = BatchResult::from_ordered(BatchId::new("b"), outcomes, 40);

        assert_eq!(result.total(), 3);
        assert_eq!(result.succeeded_count, 1);
        assert_eq!(result.failed_count, 1);
        assert_eq!(result.cancelled_count, 1);
    }

    #[test]
    fn test_empty_result() {
        let result = BatchResult::from_ordered(BatchId::new("b"), Vec::new(), 0);
        assert!(result.outcomes.is_empty());
        assert_eq!(result.succeeded_count, 0);
        assert_eq!(result.failed_count, 0);
        assert_eq!(result.cancelled_count, 0);
    }

    #[test]
    fn test_outcome_wire_shape() {
        let outcome = Outcome::error(1, ItemError::Timeout, None);
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(
            json,
            json!({"index": 1, "status": "ERROR", "error_detail": {"kind": "timeout"}})
        );
    }
}
