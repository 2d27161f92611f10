//! Errors raised by aggregates and value types.

use thiserror::Error;

pub type DomainResult<T> = Result<T, DomainError>;

/// Deterministic failure of a domain rule.
///
/// Everything here is a decision the write model makes from its own state
/// and input; storage and transport failures live in the infra error types
/// and are never folded into this enum.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Input rejected before it reached an aggregate (bad username,
    /// weak password, wrong shape).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A command arrived that the aggregate's current state forbids.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// A uuid-backed id failed to parse.
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// The aggregate has no state to act on (e.g. replaying an empty
    /// history).
    #[error("not found")]
    NotFound,

    /// Version check lost against a concurrent writer.
    #[error("conflict: {0}")]
    Conflict(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }
}
