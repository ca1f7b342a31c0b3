//! HTTP request handlers.

mod batches;
mod health;

pub use batches::submit_batch;
pub use health::{health_check, metrics_handler};
