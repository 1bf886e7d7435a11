//! Error type for the contribution engine.

use thiserror::Error;

/// Errors produced by [`crate::engine::compute`] and the table validators.
///
/// Soft conditions such as a contribution base below the minimum wage are
/// not errors; they are reported through [`crate::models::Advisory`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// The caller broke the engine's contract: a risk class outside 1..=5,
    /// a malformed rate or cost table, an unknown procedure key, and so on.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl EngineError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        EngineError::InvalidArgument(msg.into())
    }
}

/// Convenience alias used throughout the engine.
pub type EngineResult<T> = Result<T, EngineError>;
