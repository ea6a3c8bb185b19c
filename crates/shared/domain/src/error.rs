//! Domain-level errors.
//!
//! These errors describe problems with entity shapes and entity values.
//! They are independent of any persistence backend.

use thiserror::Error;

/// Errors raised while describing or converting entities.
#[derive(Error, Debug)]
pub enum DomainError {
    /// A member name does not exist on the shape (or any of its ancestors)
    #[error("{shape} has no member named '{member}'")]
    UnknownMember { shape: String, member: String },

    /// An entity did not serialize to a field map
    #[error("{shape} did not serialize to a record")]
    NotARecord { shape: String },

    /// A record was handed to an object of another shape
    #[error("cannot load a {found} record into {expected}")]
    ShapeMismatch { expected: String, found: String },

    /// Record (de)serialization failed
    #[error("record conversion failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DomainError {
    /// Create an unknown member error
    pub fn unknown_member(shape: impl Into<String>, member: impl Into<String>) -> Self {
        DomainError::UnknownMember {
            shape: shape.into(),
            member: member.into(),
        }
    }
}

/// Result type alias for domain operations
pub type DomainResult<T> = Result<T, DomainError>;
