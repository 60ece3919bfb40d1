// ============================================
// File: crates/palaver-transport/src/error.rs
// ============================================
//! # Transport Error Types
//!
//! ## Creation Reason
//! Defines error types for the chat-line layer: lines that cannot be
//! parsed, senders that cannot be resolved, and I/O on the binding.
//!
//! ## Error Categories
//! 1. **Parse Errors**: malformed lines, unresolvable sender tokens
//! 2. **Line I/O Errors**: send/receive failures, shutdown
//! 3. **Configuration Errors**: invalid line limits
//!
//! ## ⚠️ Important Note for Next Developer
//! - Parse errors must never be raised after any state was touched; the
//!   orchestrator relies on them being side-effect free
//!
//! ## Last Modified
//! v0.1.0 - Initial error definitions

use std::io;

use thiserror::Error;

use palaver_common::error::CommonError;

// ============================================
// Result Type Alias
// ============================================

/// Result type for transport operations.
pub type Result<T> = std::result::Result<T, TransportError>;

// ============================================
// TransportError
// ============================================

/// Transport layer error types.
#[derive(Error, Debug)]
pub enum TransportError {
    // ========================================
    // Parse Errors
    // ========================================

    /// Line does not have the `<sender> <COMMAND> <target> :<text>` shape.
    #[error("Malformed line: {reason}")]
    MalformedLine {
        /// What's wrong with the line
        reason: String,
    },

    /// Sender token does not follow the `:nick!user@host` convention.
    #[error("Unresolvable sender: {token:?}")]
    UnresolvableSender {
        /// The offending token
        token: String,
    },

    // ========================================
    // Line I/O Errors
    // ========================================

    /// Send operation failed.
    #[error("Failed to send to {target}: {reason}")]
    SendFailed {
        /// Destination nickname or channel
        target: String,
        /// Why send failed
        reason: String,
    },

    /// Receive operation failed.
    #[error("Failed to receive: {reason}")]
    ReceiveFailed {
        /// Why receive failed
        reason: String,
    },

    /// Transport is shutting down.
    #[error("Transport is shutting down")]
    ShuttingDown,

    // ========================================
    // Configuration Errors
    // ========================================

    /// Invalid configuration.
    #[error("Invalid configuration: {field} - {reason}")]
    InvalidConfig {
        /// Configuration field name
        field: String,
        /// Why it's invalid
        reason: String,
    },

    // ========================================
    // Wrapped Errors
    // ========================================

    /// I/O error from the system.
    #[error("I/O error: {context}")]
    Io {
        /// What was happening when the error occurred
        context: String,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Error from common crate.
    #[error(transparent)]
    Common(#[from] CommonError),
}

impl TransportError {
    // ========================================
    // Convenience Constructors
    // ========================================

    /// Creates a `MalformedLine` error.
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedLine {
            reason: reason.into(),
        }
    }

    /// Creates an `UnresolvableSender` error.
    pub fn unresolvable(token: impl Into<String>) -> Self {
        Self::UnresolvableSender {
            token: token.into(),
        }
    }

    /// Creates an `Io` error with context.
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Creates an `InvalidConfig` error.
    pub fn invalid_config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            reason: reason.into(),
        }
    }

    // ========================================
    // Error Classification
    // ========================================

    /// Returns `true` if this error came from parsing a line.
    #[must_use]
    pub const fn is_parse_error(&self) -> bool {
        matches!(
            self,
            Self::MalformedLine { .. } | Self::UnresolvableSender { .. }
        )
    }

    /// Returns `true` if this error is transient and retryable.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Io { source, .. } => matches!(
                source.kind(),
                io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted | io::ErrorKind::TimedOut
            ),
            Self::SendFailed { .. } | Self::ReceiveFailed { .. } => true,
            _ => false,
        }
    }
}

// ============================================
// Error Conversions
// ============================================

impl From<io::Error> for TransportError {
    fn from(err: io::Error) -> Self {
        Self::Io {
            context: "unspecified I/O operation".into(),
            source: err,
        }
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
        let err = TransportError::unresolvable("irc.example.net");
        assert!(err.to_string().contains("irc.example.net"));

        let err = TransportError::malformed("missing text segment");
        assert!(err.to_string().contains("missing text segment"));
    }

    #[test]
    fn test_error_classification() {
        assert!(TransportError::malformed("x").is_parse_error());
        assert!(TransportError::unresolvable("x").is_parse_error());
        assert!(!TransportError::ShuttingDown.is_parse_error());

        let send = TransportError::SendFailed {
            target: "bob".into(),
            reason: "closed pipe".into(),
        };
        assert!(send.is_retryable());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::Interrupted, "interrupted");
        let transport_err: TransportError = io_err.into();
        assert!(transport_err.is_retryable());
    }
}
