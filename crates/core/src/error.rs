//! Domain error model.

use thiserror::Error;

pub type DomainResult<T> = Result<T, DomainError>;

/// A deterministic failure inside the domain model.
///
/// Broken business rules that must be answered to a market participant are
/// not errors: the rule pipeline collects them as `Violation`s. A
/// `DomainError` means a handler asked an aggregate to do something its own
/// state forbids, which the processor treats as a failed attempt.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Malformed GSRN, GLN, transaction or process id.
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// The aggregate's state does not allow the operation.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// Duplicate registration of something that must be unique.
    #[error("conflict: {0}")]
    Conflict(String),
}

impl DomainError {
    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_the_offending_value() {
        let err = DomainError::invalid_id("GSRN '42' must be 18 digits");
        assert_eq!(err.to_string(), "invalid identifier: GSRN '42' must be 18 digits");
        assert_eq!(
            DomainError::not_found("process P1").to_string(),
            "not found: process P1"
        );
    }
}
