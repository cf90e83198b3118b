//! Error types for rule construction and parsing.

use thiserror::Error;

use crate::companion::KindTarget;

/// Errors raised when a scale rule or one of its columns is invalid.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuleError {
    /// The size selector is not legal for the companion kind.
    #[error("size selector {selector} is not valid for {kind}")]
    InvalidCombination { kind: KindTarget, selector: String },

    /// Custom scale values must be finite and positive.
    #[error("invalid custom scale value: {0}")]
    InvalidCustomValue(f32),

    /// The kind name does not name a tracked companion kind.
    #[error("unknown companion kind: {0}")]
    UnknownKind(String),

    /// The size selector name is not recognised.
    #[error("unknown size selector: {0}")]
    UnknownSelector(String),

    /// Rules need a non-blank owner name.
    #[error("owner name must not be empty")]
    EmptyOwnerName,
}

/// Result type for rule operations.
pub type RuleResult<T> = Result<T, RuleError>;
