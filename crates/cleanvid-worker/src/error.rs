//! Monitor error types.

use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Metrics error: {0}")]
    Metrics(String),

    #[error("State error: {0}")]
    State(#[from] cleanvid_state::StateError),

    #[error("Queue error: {0}")]
    Queue(#[from] cleanvid_queue::QueueError),
}

impl WorkerError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Errors the monitor must stop on instead of retrying next cycle.
    ///
    /// Unreadable or corrupted state needs an operator; everything else is
    /// retried on the next cycle.
    pub fn is_fatal(&self) -> bool {
        matches!(self, WorkerError::ConfigError(_) | WorkerError::State(_))
    }
}
