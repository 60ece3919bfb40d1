// ============================================
// File: crates/palaver-agent/src/error.rs
// ============================================
//! # Agent Error Types
//!
//! ## Main Functionality
//! - `AgentError`: every failure an orchestrator operation can report
//! - `ErrorKind`: the coarse classification surfaced to the host
//!
//! Parse failures from the transport layer are lifted into
//! `MalformedLine`/`UnresolvableSender` so callers match on one enum.
//!
//! ## Last Modified
//! v0.1.0 - Initial agent error types

use std::fmt;

use thiserror::Error;

use palaver_common::error::CommonError;
use palaver_core::error::CoreError;
use palaver_transport::error::TransportError;

/// Result type for agent operations.
pub type Result<T> = std::result::Result<T, AgentError>;

/// Agent error types.
#[derive(Error, Debug)]
pub enum AgentError {
    /// The inbound line could not be decomposed.
    #[error("Malformed line: {reason}")]
    MalformedLine {
        /// What was wrong with it
        reason: String,
    },

    /// The sender token carries no usable nickname.
    #[error("Unresolvable sender: {token:?}")]
    UnresolvableSender {
        /// The offending token
        token: String,
    },

    /// A nickname supplied by the host is not valid.
    #[error("Invalid nickname {nick:?}: {reason}")]
    InvalidNickname {
        /// The rejected nickname
        nick: String,
        /// Why it was rejected
        reason: String,
    },

    /// The primitive could not produce or accept a handshake message.
    #[error("Handshake with {nick} failed: {source}")]
    Handshake {
        /// Peer nickname
        nick: String,
        /// Primitive failure
        source: CoreError,
    },

    /// The primitive rejected an operation on an existing session.
    #[error("Session with {nick} failed: {source}")]
    Session {
        /// Peer nickname
        nick: String,
        /// Primitive failure
        source: CoreError,
    },

    /// No session exists for the nickname.
    #[error("No session with {nick}")]
    NoSuchSession {
        /// Peer nickname
        nick: String,
    },

    /// A partial message outgrew the reassembly limit and was dropped.
    #[error("Fragment from {nick} exceeds {limit} bytes")]
    FragmentOverflow {
        /// Sender nickname
        nick: String,
        /// Configured limit
        limit: usize,
    },

    /// The configuration file could not be read or parsed.
    #[error("Failed to load configuration from '{path}': {reason}")]
    ConfigLoad {
        /// Path that was read
        path: String,
        /// Underlying failure
        reason: String,
    },

    /// A configuration value is out of range.
    #[error("Invalid configuration: {field} - {reason}")]
    ConfigInvalid {
        /// Offending field
        field: String,
        /// Why it is invalid
        reason: String,
    },

    /// Transport failure other than a parse error.
    #[error(transparent)]
    Transport(TransportError),

    /// I/O failure in the host loop.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AgentError {
    /// Creates a `Handshake` error.
    pub fn handshake(nick: impl Into<String>, source: CoreError) -> Self {
        Self::Handshake {
            nick: nick.into(),
            source,
        }
    }

    /// Creates a `Session` error.
    pub fn session(nick: impl Into<String>, source: CoreError) -> Self {
        Self::Session {
            nick: nick.into(),
            source,
        }
    }

    /// Creates a `NoSuchSession` error.
    pub fn no_such_session(nick: impl Into<String>) -> Self {
        Self::NoSuchSession { nick: nick.into() }
    }

    /// Creates an `InvalidNickname` error from a validation failure.
    pub fn invalid_nickname(nick: impl Into<String>, source: &CommonError) -> Self {
        Self::InvalidNickname {
            nick: nick.into(),
            reason: source.to_string(),
        }
    }

    /// Creates a `ConfigLoad` error.
    pub fn config_load(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConfigLoad {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Creates a `ConfigInvalid` error.
    pub fn config_invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConfigInvalid {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Returns the coarse kind reported to the host.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::MalformedLine { .. } => ErrorKind::MalformedLine,
            Self::UnresolvableSender { .. } => ErrorKind::UnresolvableSender,
            Self::InvalidNickname { .. } => ErrorKind::InvalidInput,
            Self::Handshake { .. } => ErrorKind::Handshake,
            Self::Session { .. } => ErrorKind::Session,
            Self::NoSuchSession { .. } => ErrorKind::NoSuchSession,
            Self::FragmentOverflow { .. } => ErrorKind::FragmentOverflow,
            Self::ConfigLoad { .. } | Self::ConfigInvalid { .. } => ErrorKind::Config,
            Self::Transport(_) | Self::Io(_) => ErrorKind::Io,
        }
    }

    /// Returns `true` for failures decomposing the inbound line.
    #[must_use]
    pub const fn is_parse_error(&self) -> bool {
        matches!(
            self,
            Self::MalformedLine { .. } | Self::UnresolvableSender { .. }
        )
    }

    /// Returns `true` for failures raised by the cryptographic primitive.
    #[must_use]
    pub const fn is_crypto_error(&self) -> bool {
        matches!(self, Self::Handshake { .. } | Self::Session { .. })
    }

    /// Returns `true` if the failure may indicate tampering or an attack.
    #[must_use]
    pub const fn is_suspicious(&self) -> bool {
        match self {
            Self::Handshake { source, .. } | Self::Session { source, .. } => {
                source.is_suspicious()
            }
            Self::FragmentOverflow { .. } => true,
            _ => false,
        }
    }

    /// Returns `true` for configuration errors.
    #[must_use]
    pub const fn is_config_error(&self) -> bool {
        matches!(self, Self::ConfigLoad { .. } | Self::ConfigInvalid { .. })
    }
}

impl From<TransportError> for AgentError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::MalformedLine { reason } => Self::MalformedLine { reason },
            TransportError::UnresolvableSender { token } => Self::UnresolvableSender { token },
            other => Self::Transport(other),
        }
    }
}

// ============================================
// ErrorKind
// ============================================

/// Classification of an [`AgentError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Inbound line could not be parsed
    MalformedLine,
    /// Sender token carries no nickname
    UnresolvableSender,
    /// Host supplied an invalid argument
    InvalidInput,
    /// Handshake failure
    Handshake,
    /// Failure on an existing session
    Session,
    /// Unknown session
    NoSuchSession,
    /// Reassembly limit exceeded
    FragmentOverflow,
    /// Configuration problem
    Config,
    /// Transport or host I/O failure
    Io,
}

impl ErrorKind {
    /// Returns the stable name of this kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MalformedLine => "MalformedLine",
            Self::UnresolvableSender => "UnresolvableSender",
            Self::InvalidInput => "InvalidInput",
            Self::Handshake => "HandshakeError",
            Self::Session => "SessionError",
            Self::NoSuchSession => "NoSuchSession",
            Self::FragmentOverflow => "FragmentOverflow",
            Self::Config => "ConfigError",
            Self::Io => "IoError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
