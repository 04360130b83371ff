//! Error types for AgenticTasks.
//!
//! User-facing failures (`AlreadyExists`, `InvalidCredentials`,
//! `IndexOutOfRange`, `InvalidTaskNumber`, `NotAuthenticated`, `NotFound`)
//! are returned to the caller. Infrastructure failures
//! (`PersistenceUnavailable`, `LogUnavailable`, `SerializationError`, `Io`)
//! are caught at the worker boundary and routed to the error channel
//! instead of aborting.

/// Task store error types covering all operations.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    #[error("Account already exists: {0}")]
    AlreadyExists(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Task index {index} out of range (task count {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Invalid task number {0}: task numbers start at 1")]
    InvalidTaskNumber(usize),

    #[error("No account is logged in")]
    NotAuthenticated,

    #[error("Account not found: {0}")]
    NotFound(String),

    #[error("Persistence unavailable: {0}")]
    PersistenceUnavailable(String),

    #[error("Log unavailable: {0}")]
    LogUnavailable(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TaskError {
    /// Return `true` for errors caused by the caller's input rather than by
    /// the storage or logging infrastructure.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::AlreadyExists(_)
                | Self::InvalidCredentials
                | Self::IndexOutOfRange { .. }
                | Self::InvalidTaskNumber(_)
                | Self::NotAuthenticated
                | Self::NotFound(_)
        )
    }
}

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, TaskError>;
