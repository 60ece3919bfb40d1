// ============================================
// File: crates/palaver-core/src/protocol/version.rs
// ============================================
//! # Protocol Versioning
//!
//! Offer and Ack open with a version byte. A peer running a different
//! version is refused during the handshake, before any key is derived;
//! Data and Close packets carry none since the session id already pins
//! the version both sides agreed on.
//!
//! | Version | Description |
//! |---------|-------------|
//! | 0x01    | Offer / Ack / Data / Close, `?PLV:` armor |

use crate::error::{CoreError, Result};

/// Version this build writes into handshake messages.
pub const CURRENT_PROTOCOL_VERSION: u8 = 0x01;

/// Version byte read from a handshake message.
///
/// # Example
/// ```
/// use palaver_core::protocol::ProtocolVersion;
///
/// assert!(ProtocolVersion::current().ensure_supported().is_ok());
/// assert!(ProtocolVersion::new(0x02).ensure_supported().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtocolVersion(u8);

impl ProtocolVersion {
    /// Wraps a version byte.
    #[must_use]
    pub const fn new(version: u8) -> Self {
        Self(version)
    }

    /// The version this build speaks.
    #[must_use]
    pub const fn current() -> Self {
        Self(CURRENT_PROTOCOL_VERSION)
    }

    /// Refuses anything but the current version; there is no
    /// negotiation, so both peers must run the same protocol.
    ///
    /// # Errors
    /// `UnsupportedVersion` carrying the received and current versions.
    pub const fn ensure_supported(&self) -> Result<()> {
        if self.0 == CURRENT_PROTOCOL_VERSION {
            Ok(())
        } else {
            Err(CoreError::UnsupportedVersion {
                got: self.0,
                expected: CURRENT_PROTOCOL_VERSION,
            })
        }
    }
}
