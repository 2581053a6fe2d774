//! Error types for repository operations.

use mbs_types::ObjectName;
use thiserror::Error;

/// Errors that can occur during repository operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RepositoryError {
    /// No object is bound to this name.
    #[error("instance not found: {0}")]
    NotFound(ObjectName),

    /// An object is already bound to this name.
    #[error("instance already exists: {0}")]
    AlreadyExists(ObjectName),

    /// Pattern names cannot be bound.
    #[error("cannot bind pattern name: {0}")]
    PatternName(ObjectName),

    /// The domain is reserved for the server itself.
    #[error("domain is reserved: {0}")]
    ReservedDomain(String),
}

/// Convenience type alias for repository operations.
pub type Result<T> = std::result::Result<T, RepositoryError>;
