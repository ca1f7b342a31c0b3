//! Client library for the BatchRun dispatcher.
//!
//! Provides an HTTP client for submitting batches and reading server health
//! and metrics.

pub mod error;
pub mod http;

pub use error::ClientError;
pub use http::HttpClient;
