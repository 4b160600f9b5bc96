//! Engine error types
//!
//! Every internal operation either succeeds or fails with one of these
//! signals. Failures carry a stable message; several callers assert on the
//! exact text, so messages are part of the contract.

use thiserror::Error;

/// Errors raised by the object core
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EngineError {
    /// Type error (e.g. operation on a revoked proxy, strict write rejection)
    #[error("TypeError: {0}")]
    TypeError(String),

    /// Range error (e.g. invalid array length, detached-buffer resize)
    #[error("RangeError: {0}")]
    RangeError(String),

    /// Syntax error (malformed BigInt string)
    #[error("SyntaxError: {0}")]
    SyntaxError(String),

    /// Internal error (invariant breakage inside the core itself)
    #[error("InternalError: {0}")]
    InternalError(String),
}

impl EngineError {
    /// Create a type error
    pub fn type_error(msg: impl Into<String>) -> Self {
        Self::TypeError(msg.into())
    }

    /// Create a range error
    pub fn range_error(msg: impl Into<String>) -> Self {
        Self::RangeError(msg.into())
    }

    /// Create a syntax error
    pub fn syntax_error(msg: impl Into<String>) -> Self {
        Self::SyntaxError(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::InternalError(msg.into())
    }

    /// The message without the error-name prefix
    pub fn message(&self) -> &str {
        match self {
            Self::TypeError(m)
            | Self::RangeError(m)
            | Self::SyntaxError(m)
            | Self::InternalError(m) => m,
        }
    }

    /// True for `TypeError` values
    pub fn is_type_error(&self) -> bool {
        matches!(self, Self::TypeError(_))
    }

    /// True for `RangeError` values
    pub fn is_range_error(&self) -> bool {
        matches!(self, Self::RangeError(_))
    }

    /// True for `SyntaxError` values
    pub fn is_syntax_error(&self) -> bool {
        matches!(self, Self::SyntaxError(_))
    }
}

/// Result type for engine operations
pub type EngineResult<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_carries_js_error_name() {
        let e = EngineError::type_error("x is not a function");
        assert_eq!(e.to_string(), "TypeError: x is not a function");

        let e = EngineError::range_error("Invalid array length");
        assert_eq!(e.to_string(), "RangeError: Invalid array length");
    }

    #[test]
    fn test_message_strips_prefix() {
        let e = EngineError::syntax_error("Failed to parse String to BigInt");
        assert_eq!(e.message(), "Failed to parse String to BigInt");
        assert!(e.is_syntax_error());
    }
}
