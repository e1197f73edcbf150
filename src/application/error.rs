//! Application-level errors (wraps domain errors)

use thiserror::Error;

use crate::domain::DomainError;
use crate::infrastructure::BackendError;

/// Shown when the remote store failed without explaining why.
pub const GENERIC_TRANSPORT_MESSAGE: &str = "the remote store could not complete the request";

/// Application errors wrap domain errors and add application-level context.
#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("{0}")]
    Domain(#[from] DomainError),

    #[error("{message}")]
    Transport { message: String },

    #[error("{operation}: {failed} of {total} failed", total = .succeeded + .failed)]
    PartialBatchFailure {
        operation: String,
        succeeded: usize,
        failed: usize,
    },

    #[error("config error: {message}")]
    Config { message: String },
}

impl ApplicationError {
    pub fn transport(message: Option<String>) -> Self {
        Self::Transport {
            message: message
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| GENERIC_TRANSPORT_MESSAGE.to_string()),
        }
    }

    /// Local validation failure; nothing was sent to the store.
    pub fn is_validation(&self) -> bool {
        matches!(self, ApplicationError::Domain(e) if e.is_validation())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ApplicationError::Domain(DomainError::NotFound(_)))
    }
}

impl From<BackendError> for ApplicationError {
    fn from(e: BackendError) -> Self {
        match e {
            BackendError::NotFound(what) => DomainError::NotFound(what).into(),
            BackendError::Conflict(what) => DomainError::DuplicateName(what).into(),
            BackendError::Rejected { message, .. } | BackendError::Transport { message } => {
                ApplicationError::transport(message)
            }
        }
    }
}

/// Result type for application layer operations.
pub type ApplicationResult<T> = Result<T, ApplicationError>;
