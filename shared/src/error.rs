//! Failures reported by the storage layer.
//!
//! Storage backends never panic or leak driver errors to handlers. Every
//! failure is tagged with one of three kinds, and that tag is the only signal
//! the API uses to classify it.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The data broke one of the storage layer's own schema checks
    /// (not-null, check constraint, uniqueness).
    #[error("{0}")]
    Validation(String),

    /// An identifier was malformed or points at nothing.
    #[error("{0}")]
    Reference(String),

    /// Anything the storage layer could not classify.
    #[error("{0}")]
    Other(String),
}

impl StoreError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn reference(message: impl Into<String>) -> Self {
        Self::Reference(message.into())
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }

    /// Short label used in logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            StoreError::Validation(_) => "validation",
            StoreError::Reference(_) => "reference",
            StoreError::Other(_) => "other",
        }
    }

    /// Build the failure for an identifier string that is not a UUID.
    pub fn malformed_id(path: &str, value: &str) -> Self {
        Self::Reference(format!(
            "Cast to Uuid failed for value \"{}\" at path \"{}\"",
            value, path
        ))
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;
