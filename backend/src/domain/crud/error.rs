//! Failures that escape the result envelope.

use thiserror::Error;

use super::Operation;
use crate::domain::ports::EntityRepositoryError;

/// Unexpected failure of a CRUD operation.
///
/// Validation problems, conflicts and missing records travel inside
/// [`CrudResult`](super::CrudResult); only panics and storage faults end up
/// here. Neither is retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CrudError {
    /// The operation panicked and was recovered at the boundary.
    #[error("{operation} failed unexpectedly: {message}")]
    Unexpected {
        /// Operation that failed.
        operation: Operation,
        /// Panic payload text.
        message: String,
    },
    /// The repository reported a storage fault.
    #[error("{operation} repository call failed: {source}")]
    Repository {
        /// Operation that failed.
        operation: Operation,
        /// Adapter error.
        source: EntityRepositoryError,
    },
}

impl CrudError {
    /// Recovered panic.
    pub fn unexpected(operation: Operation, message: impl Into<String>) -> Self {
        Self::Unexpected {
            operation,
            message: message.into(),
        }
    }

    /// Storage fault.
    #[must_use]
    pub fn repository(operation: Operation, source: EntityRepositoryError) -> Self {
        Self::Repository { operation, source }
    }

    /// Operation that failed.
    #[must_use]
    pub fn operation(&self) -> Operation {
        match self {
            Self::Unexpected { operation, .. } | Self::Repository { operation, .. } => *operation,
        }
    }
}
