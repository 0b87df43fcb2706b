//! Dispatcher configuration.

use std::time::Duration;

use crate::error::{DispatcherError, DispatcherResult};

/// Dispatcher configuration.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Maximum messages requested per poll
    pub max_messages: i32,
    /// Long-poll wait per receive call, in seconds
    pub wait_seconds: i32,
    /// Fixed delay after a failed cycle
    pub backoff: Duration,
    /// Destination bucket passed to every worker
    pub destination_bucket: String,
}

impl DispatcherConfig {
    /// Create config from environment variables.
    pub fn from_env() -> DispatcherResult<Self> {
        Ok(Self {
            max_messages: std::env::var("DISPATCHER_MAX_MESSAGES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1),
            wait_seconds: std::env::var("DISPATCHER_WAIT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),
            backoff: Duration::from_secs(
                std::env::var("DISPATCHER_BACKOFF_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(5),
            ),
            destination_bucket: std::env::var("DEST_BUCKET")
                .map_err(|_| DispatcherError::config("DEST_BUCKET not set"))?,
        })
    }
}
