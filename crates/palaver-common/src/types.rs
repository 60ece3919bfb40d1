// ============================================
// File: crates/palaver-common/src/types.rs
// ============================================
//! # Core Type Definitions
//!
//! ## Creation Reason
//! Names the two identifiers the rest of the workspace keys state by:
//! the peer's transport nickname and the random id of an established
//! cryptographic session.
//!
//! ## Main Functionality
//! - `Nickname`: validated bare nickname, the registry key for peer state
//! - `SessionId`: 16 random bytes chosen by the responder of a handshake
//!
//! ## ⚠️ Important Note for Next Developer
//! - A `Nickname` is compared byte-for-byte. Transport case folding is
//!   deliberately not applied, the parser hands us what the server relays.
//! - `SessionId` is bound into every encrypted message as associated data;
//!   it must come from a CSPRNG.
//!
//! ## Last Modified
//! v0.1.0 - Initial type definitions

use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::CommonError;

// ============================================
// Constants
// ============================================

/// Size of SessionId in bytes
pub const SESSION_ID_SIZE: usize = 16;

/// Longest nickname accepted from the transport.
pub const MAX_NICKNAME_LEN: usize = 64;

// ============================================
// Nickname
// ============================================

/// Bare peer nickname as extracted from a transport sender token.
///
/// # Invariants
/// - Non-empty, at most [`MAX_NICKNAME_LEN`] bytes
/// - Contains no whitespace and none of `!`, `@`, `:`
///
/// # Example
/// ```
/// use palaver_common::types::Nickname;
///
/// let nick = Nickname::new("alice").unwrap();
/// assert_eq!(nick.as_str(), "alice");
/// assert!(Nickname::new("al ice").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Nickname(String);

impl Nickname {
    /// Validates and wraps a nickname.
    ///
    /// # Errors
    /// Returns `InvalidInput` if the invariants above do not hold.
    pub fn new(nick: impl Into<String>) -> Result<Self, CommonError> {
        let nick = nick.into();
        if nick.is_empty() {
            return Err(CommonError::invalid_input("nickname", "cannot be empty"));
        }
        if nick.len() > MAX_NICKNAME_LEN {
            return Err(CommonError::invalid_input(
                "nickname",
                format!("longer than {MAX_NICKNAME_LEN} bytes"),
            ));
        }
        if nick
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '!' | '@' | ':'))
        {
            return Err(CommonError::invalid_input(
                "nickname",
                "contains whitespace or a reserved character",
            ));
        }
        Ok(Self(nick))
    }

    /// Returns the nickname as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Nickname {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Nickname {
    type Err = CommonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Nickname {
    type Error = CommonError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Nickname> for String {
    fn from(nick: Nickname) -> Self {
        nick.0
    }
}

impl AsRef<str> for Nickname {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for Nickname {
    fn borrow(&self) -> &str {
        &self.0
    }
}

// ============================================
// SessionId
// ============================================

/// Identifier of an established cryptographic session.
///
/// # Wire Format
/// ```text
/// ┌────────────────────────────────────┐
/// │       Session ID (16 bytes)        │
/// │  AAD of every Data / Close message │
/// └────────────────────────────────────┘
/// ```
///
/// # Example
/// ```
/// use palaver_common::types::SessionId;
///
/// let session_id = SessionId::generate();
/// let restored = SessionId::from_bytes(session_id.as_bytes()).unwrap();
/// assert_eq!(session_id, restored);
/// ```
#[derive(Clone, PartialEq, Eq, Hash, Zeroize, ZeroizeOnDrop)]
pub struct SessionId([u8; SESSION_ID_SIZE]);

impl SessionId {
    /// Creates a `SessionId` from raw bytes, `None` unless exactly 16 bytes.
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let id: [u8; SESSION_ID_SIZE] = bytes.try_into().ok()?;
        Some(Self(id))
    }

    /// Generates a new random `SessionId` from the thread-local CSPRNG.
    #[must_use]
    pub fn generate() -> Self {
        let mut id = [0u8; SESSION_ID_SIZE];
        rand::thread_rng().fill_bytes(&mut id);
        Self(id)
    }

    /// Returns the raw bytes of the session ID.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; SESSION_ID_SIZE] {
        &self.0
    }
}

impl fmt::Debug for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Only show first 4 bytes in debug output
        write!(
            f,
            "SessionId({:02x}{:02x}{:02x}{:02x}...)",
            self.0[0], self.0[1], self.0[2], self.0[3]
        )
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", BASE64.encode(self.0))
    }
}

impl FromStr for SessionId {
    type Err = CommonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = BASE64
            .decode(s)
            .map_err(|e| CommonError::decoding("session id", e.to_string()))?;

        Self::from_bytes(&bytes).ok_or(CommonError::InvalidLength {
            expected: SESSION_ID_SIZE,
            actual: bytes.len(),
        })
    }
}

impl AsRef<[u8]> for SessionId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_nickname_validation() {
        assert!(Nickname::new("bob").is_ok());
        assert!(Nickname::new("bob|away").is_ok());
        assert!(Nickname::new("[m]alice").is_ok());

        assert!(Nickname::new("").is_err());
        assert!(Nickname::new("bob smith").is_err());
        assert!(Nickname::new("bob!user").is_err());
        assert!(Nickname::new("user@host").is_err());
        assert!(Nickname::new("x".repeat(MAX_NICKNAME_LEN + 1)).is_err());
    }

    #[test]
    fn test_nickname_borrow_lookup() {
        let mut map = HashMap::new();
        map.insert(Nickname::new("carol").unwrap(), 1);
        assert_eq!(map.get("carol"), Some(&1));
        assert_eq!(map.get("Carol"), None);
    }

    #[test]
    fn test_nickname_serde() {
        let nick = Nickname::new("dave").unwrap();
        let json = serde_json::to_string(&nick).unwrap();
        assert_eq!(json, "\"dave\"");

        let bad: Result<Nickname, _> = serde_json::from_str("\"da ve\"");
        assert!(bad.is_err());
    }

    #[test]
    fn test_session_id_generation() {
        let a = SessionId::generate();
        let b = SessionId::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn test_session_id_string_roundtrip() {
        let id = SessionId::generate();
        let parsed: SessionId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_session_id_invalid_length() {
        assert!(SessionId::from_bytes(&[0u8; 15]).is_none());
        assert!(SessionId::from_bytes(&[0u8; 17]).is_none());

        let err = "AAAA".parse::<SessionId>().unwrap_err();
        assert!(matches!(err, CommonError::InvalidLength { expected: 16, .. }));
    }
}
