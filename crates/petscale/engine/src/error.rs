//! Error types for the PetScale engine.

use petscale_types::RuleError;
use thiserror::Error;

/// Errors surfaced by the engine's editing and persistence operations.
///
/// Tick processing never returns these; a companion that cannot be resolved
/// is skipped and retried on a later tick.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The rule was rejected at the rule store boundary.
    #[error(transparent)]
    Rule(#[from] RuleError),

    /// Rule index out of range.
    #[error("rule index {index} out of range (table has {len} rules)")]
    RuleIndexOutOfRange { index: usize, len: usize },

    /// Reading or writing the profile failed.
    #[error("profile i/o failed: {0}")]
    Io(#[from] std::io::Error),

    /// The profile could not be encoded or decoded.
    #[error("profile serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Reference data could not be loaded.
    #[error("reference data unavailable: {0}")]
    ReferenceLoad(String),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
