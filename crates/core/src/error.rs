//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Coarse failure classification used at the API boundary.
///
/// Every domain error maps into exactly one class:
/// - `Validation`: malformed input, rejected before any state change.
/// - `Precondition`: wrong aggregate/line state for the requested action;
///   the caller must refresh state before retrying.
/// - `Conflict`: idempotent replay or concurrent version mismatch; safe to
///   retry or already satisfied.
/// - `Resource`: insufficient stock, unknown product; surfaced verbatim,
///   never silently downgraded.
/// - `NotFound`: the addressed aggregate does not exist.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ErrorClass {
    Validation,
    Precondition,
    Conflict,
    Resource,
    NotFound,
}

/// Classification hook implemented by every domain error type.
pub trait Classify {
    fn class(&self) -> ErrorClass;
}

/// Core-level error.
///
/// Keep this focused on deterministic failures of the shared primitives
/// (identifier parsing, value validation). Richer, code-bearing errors
/// belong to the domain crates that own them.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. malformed input).
    #[error("validation failed: {0}")]
    Validation(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }
}

impl Classify for DomainError {
    fn class(&self) -> ErrorClass {
        match self {
            DomainError::Validation(_) | DomainError::InvalidId(_) => ErrorClass::Validation,
        }
    }
}
