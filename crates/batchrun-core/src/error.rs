//! Core domain errors.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Core domain errors for BatchRun.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A work item was moved to a state its current state cannot reach.
    #[error("Invalid state transition for item {index}: {from} -> {to}")]
    InvalidStateTransition {
        index: usize,
        from: String,
        to: String,
    },
}

/// A batch request was rejected before any work item was created.
///
/// Every variant names the offending field, and the item index where one
/// applies, so the caller can correct the batch and resubmit it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The body could not be decoded as a batch request.
    #[error("body: {message}")]
    MalformedBody { message: String },

    /// The `items` field is absent.
    #[error("items: field is required")]
    MissingItems,

    /// The batch is larger than the configured maximum.
    #[error("items: batch has {count} items, maximum is {max}")]
    TooManyItems { count: usize, max: usize },

    /// An item has an empty endpoint.
    #[error("items[{index}].endpoint: target must not be empty")]
    EmptyTarget { index: usize },

    /// An item names a method the dispatcher does not support.
    #[error("items[{index}].method: unsupported method '{method}'")]
    UnsupportedMethod { index: usize, method: String },

    /// The requested concurrency limit is zero.
    #[error("concurrency_limit: must be at least 1")]
    ZeroConcurrency,

    /// The requested concurrency limit is above the hard ceiling.
    #[error("concurrency_limit: {requested} exceeds the ceiling of {ceiling}")]
    ConcurrencyAboveCeiling { requested: usize, ceiling: usize },

    /// The requested deadline is zero.
    #[error("deadline_ms: must be greater than zero")]
    ZeroDeadline,
}

impl ValidationError {
    /// Name of the offending field.
    pub fn field(&self) -> String {
        match self {
            Self::MalformedBody { .. } => "body".to_string(),
            Self::MissingItems | Self::TooManyItems { .. } => "items".to_string(),
            Self::EmptyTarget { index } => format!("items[{index}].endpoint"),
            Self::UnsupportedMethod { index, .. } => format!("items[{index}].method"),
            Self::ZeroConcurrency | Self::ConcurrencyAboveCeiling { .. } => {
                "concurrency_limit".to_string()
            }
            Self::ZeroDeadline => "deadline_ms".to_string(),
        }
    }
}

/// Why a pending item was never admitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotRunReason {
    /// The batch deadline elapsed first.
    Deadline,
    /// The caller cancelled the batch.
    Cancelled,
}

impl fmt::Display for NotRunReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Deadline => write!(f, "deadline"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Failure of a single work item.
///
/// Recorded in that item's outcome; never aborts the batch.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ItemError {
    /// The executor did not answer in time.
    #[error("timeout")]
    Timeout,

    /// The target answered with a non-success status.
    #[error("non-success status {status}")]
    Status { status: u16, body: String },

    /// The request never got a response.
    #[error("transport error: {message}")]
    Transport { message: String },

    /// The target could not be turned into a request.
    #[error("invalid target: {message}")]
    InvalidTarget { message: String },

    /// Any other executor-reported failure.
    #[error("{message}")]
    Failed { message: String },

    /// The item was still pending when the batch stopped admitting work.
    #[error("not run: {reason}")]
    NotRun { reason: NotRunReason },
}

impl ItemError {
    /// Create a generic failure.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }

    /// Create a transport failure.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_names_field() {
        let err = ValidationError::EmptyTarget { index: 3 };
        assert_eq!(err.field(), "items[3].endpoint");
        assert!(err.to_string().contains("items[3]"));
    }

    #[test]
    fn test_item_error_wire_shape() {
        let json = serde_json::to_value(ItemError::Timeout).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "timeout"}));

        let json = serde_json::to_value(ItemError::NotRun {
            reason: NotRunReason::Deadline,
        })
        .unwrap();
        assert_eq!(
            json,
            serde_json::json!({"kind": "not_run", "reason": "deadline"})
        );
    }

    #[test]
    fn test_timeout_display() {
        assert_eq!(ItemError::Timeout.to_string(), "timeout");
    }
}
