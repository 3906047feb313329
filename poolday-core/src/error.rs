//! Error types for poolday.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors that can occur in poolday operations.
#[derive(Error, Debug)]
pub enum PoolDayError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid scope: {0}")]
    InvalidScope(String),

    #[error("Remote store unavailable: {0}")]
    RemoteUnavailable(String),

    #[error("Remote store rejected the request: {0}")]
    RemoteRejected(String),

    #[error("Remote request timed out after {}", humantime::format_duration(*.0))]
    RemoteTimeout(Duration),

    #[error("Remote provider '{0}' not found in PATH")]
    ProviderNotInstalled(String),

    #[error("Queue at {} is owned by another process", .0.display())]
    QueueLocked(PathBuf),

    #[error("Queue error: {0}")]
    Queue(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl PoolDayError {
    /// Transient failures that a later sync may succeed on without user action.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PoolDayError::RemoteUnavailable(_)
                | PoolDayError::RemoteTimeout(_)
                | PoolDayError::ProviderNotInstalled(_)
                | PoolDayError::Io(_)
        )
    }
}

/// Result type alias for poolday operations.
pub type PoolDayResult<T> = Result<T, PoolDayError>;
