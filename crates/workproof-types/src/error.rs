use thiserror::Error;

use crate::task::{TaskEvent, TaskStatus};

#[derive(Debug, Error)]
pub enum WorkproofError {
    #[error("State transition error: cannot transition from {from:?} via {event:?}")]
    InvalidStateTransition { from: TaskStatus, event: TaskEvent },

    #[error("Task not found: {0}")]
    TaskNotFound(uuid::Uuid),

    #[error("Unknown task type: {0}")]
    UnknownTaskType(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Seal search exhausted for block {index} after {attempts} attempts")]
    SealExhausted { index: u64, attempts: u64 },

    #[error("Seal task failed: {0}")]
    SealTask(String),

    #[error("Chain integrity error: {0}")]
    ChainIntegrity(String),

    #[error("Signing error: {0}")]
    Signing(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<std::io::Error> for WorkproofError {
    fn from(e: std::io::Error) -> Self {
        WorkproofError::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for WorkproofError {
    fn from(e: serde_json::Error) -> Self {
        WorkproofError::Serialization(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, WorkproofError>;
