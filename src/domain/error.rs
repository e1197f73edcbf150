//! Domain-level errors (no external dependencies)

use thiserror::Error;

/// Domain errors represent violations of the taxonomy invariants.
/// They are raised locally, before anything is sent to the remote store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("node not found: {0}")]
    NotFound(String),

    #[error("invalid parent: {0}")]
    InvalidParent(String),

    #[error("individual node requires a parent group: {0}")]
    MissingParent(String),

    #[error("name already exists in scope: {0}")]
    DuplicateName(String),

    #[error("node {id} has {children} child node(s)")]
    HasChildren { id: String, children: usize },

    #[error("cycle detected in hierarchy at: {0}")]
    CycleDetected(String),
}

impl DomainError {
    /// Errors that block an operation before it is dispatched.
    pub fn is_validation(&self) -> bool {
        matches!(self, DomainError::Validation(_) | DomainError::MissingParent(_))
    }
}
