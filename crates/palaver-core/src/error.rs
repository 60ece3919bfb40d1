// ============================================
// File: crates/palaver-core/src/error.rs
// ============================================
//! # Core Error Types
//!
//! ## Creation Reason
//! Everything the session primitive can reject: a handshake that does
//! not verify, a chat line that is not a palaver message, a Data packet
//! that fails authentication, or an operation issued in the wrong phase.
//!
//! ## Error Groups
//! ```text
//! Handshake ── KeyGeneration, SignatureVerification, KeyExchange,
//!              InvalidTimestamp
//! Channel ──── Encryption, Decryption, KeyDerivation, ReplayDetected,
//!              SessionMismatch
//! Wire ─────── UnknownMessageType, UnsupportedVersion, MalformedMessage,
//!              MessageTooShort, MessageTooLarge
//! Phase ────── InvalidState
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Messages reach the chat user verbatim through the agent. Never put
//!   key bytes or plaintext in them.
//!
//! ## Last Modified
//! v0.1.0 - Initial error definitions

use thiserror::Error;

use palaver_common::error::CommonError;

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

// ============================================
// CoreError
// ============================================

/// Reasons the session primitive refuses a message or an operation.
#[derive(Error, Debug)]
pub enum CoreError {
    // ========================================
    // Handshake
    // ========================================

    /// A local key could not be produced or a peer key could not be read.
    #[error("could not load key material: {context}")]
    KeyGeneration {
        /// Which key
        context: String,
    },

    /// The Offer or Ack signature does not match the claimed identity.
    #[error("peer signature did not verify")]
    SignatureVerification,

    /// X25519 agreement produced an unusable secret.
    #[error("key agreement with peer failed: {reason}")]
    KeyExchange {
        /// Why the secret was rejected
        reason: String,
    },

    /// An Offer's clock reading is outside the accepted skew.
    #[error("offer timestamp rejected: {reason}")]
    InvalidTimestamp {
        /// How far off, and in which direction
        reason: String,
    },

    // ========================================
    // Channel
    // ========================================

    /// Sealing an outbound packet failed.
    #[error("could not encrypt {context}")]
    Encryption {
        /// What was being sealed
        context: String,
    },

    /// A packet failed AEAD authentication.
    #[error("message failed authentication")]
    Decryption,

    /// HKDF could not expand the shared secret.
    #[error("could not derive session keys: {reason}")]
    KeyDerivation {
        /// Expansion failure
        reason: String,
    },

    /// The packet counter was already accepted or fell behind the window.
    #[error("replayed message: counter {received}, newest accepted {highest}")]
    ReplayDetected {
        /// Counter carried by the packet
        received: u64,
        /// Newest counter accepted on this direction
        highest: u64,
    },

    /// The packet carries another conversation's session id.
    #[error("message belongs to a different session")]
    SessionMismatch,

    // ========================================
    // Wire
    // ========================================

    /// First byte after the version is not a known message type.
    #[error("unknown palaver message type 0x{0:02x}")]
    UnknownMessageType(u8),

    /// Peer speaks a protocol version this build does not.
    #[error("peer uses protocol version {got}, this build speaks {expected}")]
    UnsupportedVersion {
        /// Version byte on the wire
        got: u8,
        /// Version this build emits
        expected: u8,
    },

    /// Armor, base64 or field layout is broken.
    #[error("malformed palaver message: {reason}")]
    MalformedMessage {
        /// What is broken
        reason: String,
    },

    /// Fewer bytes than the message type requires.
    #[error("truncated message: need {expected} bytes, have {actual}")]
    MessageTooShort {
        /// Bytes the type requires
        expected: usize,
        /// Bytes received
        actual: usize,
    },

    /// Decoded message larger than any palaver message may be.
    #[error("oversized message: limit {max} bytes, have {actual}")]
    MessageTooLarge {
        /// Upper bound
        max: usize,
        /// Bytes received
        actual: usize,
    },

    // ========================================
    // Phase
    // ========================================

    /// The call does not fit the session's handshake phase.
    #[error("cannot {operation}: session must be {required_state}")]
    InvalidState {
        /// Attempted call
        operation: String,
        /// Phase it needs
        required_state: String,
    },

    /// Shared-type failure, e.g. an invalid session id.
    #[error(transparent)]
    Common(#[from] CommonError),
}

impl CoreError {
    /// Creates a `KeyGeneration` error.
    pub fn key_generation(context: impl Into<String>) -> Self {
        Self::KeyGeneration {
            context: context.into(),
        }
    }

    /// Creates a `MalformedMessage` error.
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedMessage {
            reason: reason.into(),
        }
    }

    /// Creates a `MessageTooShort` error.
    #[must_use]
    pub const fn too_short(expected: usize, actual: usize) -> Self {
        Self::MessageTooShort { expected, actual }
    }

    /// Creates an `InvalidTimestamp` error.
    pub fn invalid_timestamp(reason: impl Into<String>) -> Self {
        Self::InvalidTimestamp {
            reason: reason.into(),
        }
    }

    /// Creates a `ReplayDetected` error.
    #[must_use]
    pub const fn replay(received: u64, highest: u64) -> Self {
        Self::ReplayDetected { received, highest }
    }

    /// Creates an `InvalidState` error.
    pub fn invalid_state(operation: impl Into<String>, required_state: impl Into<String>) -> Self {
        Self::InvalidState {
            operation: operation.into(),
            required_state: required_state.into(),
        }
    }

    /// Returns `true` if the handshake itself was refused.
    #[must_use]
    pub const fn is_handshake_failure(&self) -> bool {
        matches!(
            self,
            Self::KeyGeneration { .. }
                | Self::SignatureVerification
                | Self::KeyExchange { .. }
                | Self::InvalidTimestamp { .. }
        )
    }

    /// Returns `true` if the text was not a well-formed palaver message.
    #[must_use]
    pub const fn is_wire_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownMessageType(_)
                | Self::UnsupportedVersion { .. }
                | Self::MalformedMessage { .. }
                | Self::MessageTooShort { .. }
                | Self::MessageTooLarge { .. }
        )
    }

    /// Returns `true` when someone on the transport may be forging,
    /// replaying or tampering with messages.
    #[must_use]
    pub const fn is_suspicious(&self) -> bool {
        matches!(
            self,
            Self::SignatureVerification
                | Self::Decryption
                | Self::ReplayDetected { .. }
                | Self::InvalidTimestamp { .. }
        )
    }
}
