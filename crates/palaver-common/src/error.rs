// ============================================
// File: crates/palaver-common/src/error.rs
// ============================================
//! # Common Error Types
//!
//! ## Creation Reason
//! Base error type shared by the palaver crates. Higher layers wrap
//! `CommonError` in their own enums via `#[from]`.
//!
//! ## ⚠️ Important Note for Next Developer
//! - Never include key material or message plaintext in error messages
//! - Nicknames are fine to include, they are public on the transport
//!
//! ## Last Modified
//! v0.1.0 - Initial error definitions

use thiserror::Error;

// ============================================
// Result Type Alias
// ============================================

/// Common result type for operations that may fail.
pub type Result<T> = std::result::Result<T, CommonError>;

// ============================================
// CommonError
// ============================================

/// Common error types shared across palaver crates.
///
/// # Example
/// ```
/// use palaver_common::error::{CommonError, Result};
///
/// fn validate_nick(nick: &str) -> Result<()> {
///     if nick.is_empty() {
///         return Err(CommonError::invalid_input("nickname", "cannot be empty"));
///     }
///     Ok(())
/// }
///
/// assert!(validate_nick("").is_err());
/// ```
#[derive(Error, Debug)]
pub enum CommonError {
    // ========================================
    // Validation Errors
    // ========================================

    /// Invalid input data provided.
    #[error("Invalid input for '{field}': {reason}")]
    InvalidInput {
        /// Name of the field or parameter
        field: String,
        /// Description of what's wrong
        reason: String,
    },

    /// Data length doesn't match expected size.
    #[error("Invalid length: expected {expected}, got {actual}")]
    InvalidLength {
        /// Expected length in bytes
        expected: usize,
        /// Actual length received
        actual: usize,
    },

    // ========================================
    // Encoding Errors
    // ========================================

    /// Failed to decode data.
    #[error("Decoding error: {context}: {details}")]
    Decoding {
        /// What was being decoded
        context: String,
        /// Error details
        details: String,
    },
}

impl CommonError {
    /// Creates an `InvalidInput` error.
    pub fn invalid_input(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Creates a `Decoding` error.
    pub fn decoding(context: impl Into<String>, details: impl Into<String>) -> Self {
        Self::Decoding {
            context: context.into(),
            details: details.into(),
        }
    }

    /// Returns `true` if the error was caused by caller-supplied input.
    #[must_use]
    pub const fn is_validation_error(&self) -> bool {
        matches!(self, Self::InvalidInput { .. } | Self::InvalidLength { .. })
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CommonError::invalid_input("nickname", "contains whitespace");
        let msg = err.to_string();
        assert!(msg.contains("nickname"));
        assert!(msg.contains("whitespace"));

        let err = CommonError::InvalidLength {
            expected: 16,
            actual: 3,
        };
        assert!(err.to_string().contains("16"));
    }

    #[test]
    fn test_error_classification() {
        assert!(CommonError::invalid_input("a", "b").is_validation_error());
        assert!(!CommonError::decoding("session id", "bad base64").is_validation_error());
    }
}
