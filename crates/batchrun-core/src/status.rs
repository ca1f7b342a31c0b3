//! Status enums for work items and outcomes.

use serde::{Deserialize, Serialize};

/// Lifecycle state of a WorkItem inside one batch execution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemState {
    /// Waiting for an admission slot.
    #[default]
    Pending,
    /// Admitted and executing.
    Running,
    /// Executor returned a payload.
    Succeeded,
    /// Executor returned an error.
    Failed,
    /// Never admitted because the batch stopped admitting work.
    Cancelled,
}

impl ItemState {
    /// Returns true if the item is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Cancelled)
    }
}

/// Status reported for one item in the final result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutcomeStatus {
    Success,
    Error,
    Cancelled,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(!ItemState::Pending.is_terminal());
        assert!(!ItemState::Running.is_terminal());
        assert!(ItemState::Succeeded.is_terminal());
        assert!(ItemState::Failed.is_terminal());
        assert!(ItemState::Cancelled.is_terminal());
    }

    #[test]
    fn test_outcome_status_wire_names() {
        assert_eq!(
            serde_json::to_value(OutcomeStatus::Cancelled).unwrap(),
            serde_json::json!("CANCELLED")
        );
    }
}
