//! Infrastructure-level errors (wraps application errors)

use thiserror::Error;

use crate::application::ApplicationError;

/// Failure reported by a [`TaxonomyBackend`](super::traits::TaxonomyBackend).
///
/// `message` carries the server-provided text when the store sent one.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("rejected with status {status}: {}", .message.as_deref().unwrap_or("no message"))]
    Rejected { status: u16, message: Option<String> },

    #[error("transport failure: {}", .message.as_deref().unwrap_or("no response"))]
    Transport { message: Option<String> },
}

impl BackendError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: Some(message.into()),
        }
    }
}

/// Infrastructure errors wrap application errors and add I/O-level concerns.
#[derive(Error, Debug)]
pub enum InfraError {
    #[error("{0}")]
    Application(#[from] ApplicationError),

    #[error("http client error: {context}")]
    Http {
        context: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("invalid url {url}: {message}")]
    InvalidUrl { url: String, message: String },

    #[error("selector failed: {message}")]
    Selector { message: String },
}

/// Result type for infrastructure layer operations.
pub type InfraResult<T> = Result<T, InfraError>;
