//! Shared application state.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::dispatcher::Dispatcher;

/// Shared application state.
pub struct AppState {
    /// Batch dispatcher serving all requests.
    pub dispatcher: Dispatcher,

    /// When the server started.
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Create a new AppState wrapped in Arc.
    pub fn new(dispatcher: Dispatcher) -> Arc<Self> {
        Arc::new(Self {
            dispatcher,
            started_at: Utc::now(),
        })
    }

    /// Seconds since the server started.
    pub fn uptime_secs(&self) -> i64 {
        (Utc::now() - self.started_at).num_seconds()
    }
}
