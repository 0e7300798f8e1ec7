// Error types for the web layer, the progress store and the background workers.
use thiserror::Error;

pub mod response;
pub mod store;
pub mod worker;

pub use store::{StoreError, StoreResult};
pub use worker::{WorkerError, WorkerResult};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication error: {0}")]
    Auth(String),

    // #[from] lets handlers use `?` on progress store calls directly.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("File error: {0}")]
    File(#[from] std::io::Error),

    #[error("Task error: {0}")]
    Task(String),

    #[error("Upload error: {0}")]
    Upload(String),

    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),
}

// Custom result type
pub type AppResult<T> = Result<T, AppError>;
