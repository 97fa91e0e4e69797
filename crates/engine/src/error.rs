//! Engine error types

use courier_core::storage::StorageError;
use thiserror::Error;

/// Errors from scheduling a delivery
#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("scheduled time must be in the future")]
    InvalidSchedule,
    #[error("no usable credential for {0}")]
    Unauthenticated(String),
    #[error("credential backend error: {0}")]
    Credential(String),
    #[error("send failed: {code}")]
    Transport { code: String },
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Errors from cancelling a delivery
#[derive(Debug, Error)]
pub enum CancelError {
    #[error("delivery cannot be cancelled")]
    NotCancellable,
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Errors from the delivery worker
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}
