//! Dispatcher error types.

use thiserror::Error;

pub type DispatcherResult<T> = Result<T, DispatcherError>;

#[derive(Debug, Error)]
pub enum DispatcherError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Notification parse error: {0}")]
    Parse(#[from] vtc_models::ParseError),

    #[error("Submission failed for {failed} of {total} objects")]
    Submission { failed: usize, total: usize },

    #[error("Queue error: {0}")]
    Queue(#[from] vtc_queue::QueueError),

    #[error("{failed} of {total} messages failed this cycle")]
    Cycle { failed: usize, total: usize },
}

impl DispatcherError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
