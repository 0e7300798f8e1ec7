use thiserror::Error;
use std::io;
use super::StoreError;

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Task panicked: {0}")]
    TaskPanic(String),

    #[error("Search step failed: {0}")]
    Search(String),

    #[error("Aggregation step failed: {0}")]
    Aggregate(String),

    #[error("Notification failed: {0}")]
    Notify(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Task queue closed")]
    QueueClosed,
}

pub type WorkerResult<T> = Result<T, WorkerError>;
