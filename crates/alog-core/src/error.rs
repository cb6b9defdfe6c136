//! Domain-specific error types following panic-free policy.

use thiserror::Error;

/// Errors that can occur in domain operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A built-in pattern failed to compile.
    ///
    /// Only possible at startup; callers treat it as fatal.
    #[error("Invalid pattern {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// A log line did not have the `<time> <S>/<tag>(<owner>): <message>` shape
    #[error("Malformed log line: {line:?}")]
    MalformedLine { line: String },
}

impl DomainError {
    /// Builds an `InvalidPattern` error from a regex compilation failure.
    pub fn invalid_pattern(pattern: &str, err: &regex::Error) -> Self {
        Self::InvalidPattern {
            pattern: pattern.to_string(),
            reason: err.to_string(),
        }
    }
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
