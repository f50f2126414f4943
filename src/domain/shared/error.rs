//! Domain errors

use thiserror::Error;

/// Domain result type
pub type Result<T> = std::result::Result<T, DomainError>;

#[derive(Error, Debug, Clone)]
pub enum DomainError {
    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Collaborator failure ({collaborator}): {message}")]
    Collaborator {
        collaborator: String,
        message: String,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DomainError {
    /// Wrap a collaborator failure with the collaborator name for log triage.
    pub fn collaborator(name: &str, message: impl Into<String>) -> Self {
        Self::Collaborator {
            collaborator: name.to_string(),
            message: message.into(),
        }
    }
}
