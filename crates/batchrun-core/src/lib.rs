//! BatchRun Core Domain Types
//!
//! This crate contains pure domain types with no dependencies on:
//! - Network/HTTP
//! - Async runtime specifics
//!
//! It covers the batch intake step (validation and normalization of a raw
//! batch request) and the types the dispatcher moves through a batch
//! execution: work items, outcomes, and the final ordered result.

pub mod batch;
pub mod error;
pub mod ids;
pub mod intake;
pub mod outcome;
pub mod status;
pub mod target;

// Re-export commonly used types
pub use batch::{Batch, WorkItem};
pub use error::{CoreError, ItemError, NotRunReason, ValidationError};
pub use ids::BatchId;
pub use intake::{normalize, BatchRequest, IntakeLimits, RequestDescriptor};
pub use outcome::{BatchResult, Outcome};
pub use status::{ItemState, OutcomeStatus};
pub use target::{Method, Target};
