//! Centralized error handling.
//!
//! Every error here is raised synchronously to the caller and none is retried:
//! they describe configuration or programming mistakes, or a backend that
//! refused an operation.

use thiserror::Error;

use domain::DomainError;

use crate::infra::BackendError;
use crate::query::EvalError;

/// Repository error types
#[derive(Error, Debug)]
pub enum RepoError {
    /// Invalid argument (an empty entity handed to `add`)
    #[error("Invalid argument: {0}")]
    Argument(String),

    /// A predicate references a member the destination shape lacks
    #[error("cannot convert predicate from {from} to {to}: '{member}' not found")]
    ShapeConversion {
        from: String,
        to: String,
        member: String,
    },

    /// No backend member matches the entity-set convention
    #[error("entity set for {entity} not found on {context}")]
    EntitySetNotFound { entity: String, context: String },

    /// No backend entry point matches the requested operation
    #[error("Operation failed: {0}")]
    Operation(String),

    /// The adapter was used after release
    #[error("repository has been disposed")]
    Disposed,

    // External collaborator errors
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("predicate evaluation failed: {0}")]
    Evaluation(#[from] EvalError),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias
pub type RepoResult<T> = Result<T, RepoError>;

/// Convenience constructors
impl RepoError {
    pub fn argument(msg: impl Into<String>) -> Self {
        RepoError::Argument(msg.into())
    }

    pub fn operation(msg: impl Into<String>) -> Self {
        RepoError::Operation(msg.into())
    }

    /// Whether the error came from the backend reporting an untracked entity
    pub fn is_not_tracked(&self) -> bool {
        matches!(self, RepoError::Backend(BackendError::NotTracked(_)))
    }
}
