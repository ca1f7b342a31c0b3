//! HTTP response types.

use serde::{Deserialize, Serialize};

/// Error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error category: `validation_error` or `scheduler_error`.
    pub error: String,

    /// Human-readable description.
    pub message: String,

    /// Offending field, for validation errors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_secs: i64,
    pub in_flight: usize,
}
