//! Shared error types for the services crate.

use thiserror::Error;

use storage::repository::StorageError;

/// Errors emitted by the classifier collaborator.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ClassifierError {
    #[error("classifier unavailable: {0}")]
    Unavailable(String),
}

/// Errors emitted by `SessionService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionServiceError {
    #[error("invalid session duration: {minutes} minutes")]
    InvalidDuration { minutes: i64 },

    #[error("session is still running; no result yet")]
    NotFinished,

    #[error(transparent)]
    Storage(#[from] StorageError),
}
