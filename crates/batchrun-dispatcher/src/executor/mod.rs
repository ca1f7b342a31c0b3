//! Per-item executor capability.
//!
//! The scheduler hands each admitted item's target to an [`ItemExecutor`] and
//! records whatever it returns. Executors never retry on their own behalf.

mod http;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use batchrun_core::{ItemError, Target};

pub use http::HttpExecutor;

/// Errors an executor can report.
#[derive(Debug, Error)]
pub enum ExecutorError {
    /// This one item failed. Recorded in its outcome.
    #[error(transparent)]
    Item(#[from] ItemError),

    /// The executor cannot serve any item. Aborts the whole batch.
    #[error("executor unavailable: {0}")]
    Unavailable(String),
}

/// Performs one unit of work for one item.
#[async_trait]
pub trait ItemExecutor: Send + Sync {
    /// Execute a target, returning an opaque payload on success.
    async fn execute(&self, target: &Target) -> Result<Value, ExecutorError>;
}
