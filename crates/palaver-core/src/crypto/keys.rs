// ============================================
// File: crates/palaver-core/src/crypto/keys.rs
// ============================================
//! # Key Types
//!
//! ## Creation Reason
//! A palaver agent holds exactly one identity for its whole run and a
//! fresh ephemeral per handshake. This module wraps the dalek types so
//! that secrets zeroize, compare in constant time and never reach a log.
//!
//! ## Main Functionality
//! - `IdentityKeyPair`: the agent's Ed25519 identity, created at startup
//! - `IdentityPublicKey`: what the peer sees and the user verifies
//! - `Fingerprint`: 20-byte SHA-256 prefix, read aloud to compare keys
//! - `EphemeralKeyPair`: X25519 half of one Offer or Ack
//! - `SessionKey`: ChaCha20-Poly1305 key for one direction
//!
//! ## Key Lifecycle
//! ```text
//! agent start ──► IdentityKeyPair ─── signs every Offer / Ack ──► process exit
//!                                                                 (never saved)
//! Offer / Ack ──► EphemeralKeyPair ── exchange() consumes it
//!                        │
//!                        ▼
//!                 SessionKey ×2 ────── zeroized when the peer session drops
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Debug output shows fingerprint groups, never key bytes
//! - Log `Fingerprint`s when a key must be identified
//!
//! ## Last Modified
//! v0.1.0 - Initial key type definitions

use std::fmt;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use x25519_dalek::{EphemeralSecret, PublicKey as X25519PublicKey};
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::{CHACHA20_KEY_SIZE, ED25519_PUBLIC_KEY_SIZE, ED25519_SIGNATURE_SIZE, X25519_PUBLIC_KEY_SIZE};
use crate::error::{CoreError, Result};

// ============================================
// IdentityKeyPair
// ============================================

/// The agent's signing identity, shared by all of its sessions.
///
/// # Example
/// ```
/// use palaver_core::crypto::IdentityKeyPair;
///
/// let identity = IdentityKeyPair::generate();
/// let signature = identity.sign(b"offer bytes");
/// assert!(identity.public_key().verify(b"offer bytes", &signature).is_ok());
/// ```
pub struct IdentityKeyPair {
    signing_key: SigningKey,
}

impl IdentityKeyPair {
    /// Draws a new identity from the OS RNG.
    #[must_use]
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    /// The half peers see.
    #[must_use]
    pub fn public_key(&self) -> IdentityPublicKey {
        IdentityPublicKey(self.signing_key.verifying_key())
    }

    /// Public key bytes as written into Offer / Ack.
    #[must_use]
    pub fn public_key_bytes(&self) -> [u8; ED25519_PUBLIC_KEY_SIZE] {
        self.signing_key.verifying_key().to_bytes()
    }

    /// Ed25519 signature over `message`.
    #[must_use]
    pub fn sign(&self, message: &[u8]) -> [u8; ED25519_SIGNATURE_SIZE] {
        self.signing_key.sign(message).to_bytes()
    }
}

impl fmt::Debug for IdentityKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityKeyPair")
            .field("public", &self.public_key())
            .finish_non_exhaustive()
    }
}

// ============================================
// IdentityPublicKey
// ============================================

/// A peer's (or our own) identity key, surfaced after a handshake for
/// out-of-band comparison.
///
/// Serializes as a base64 string.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct IdentityPublicKey(VerifyingKey);

impl IdentityPublicKey {
    /// Reads a key out of an Offer or Ack.
    ///
    /// # Errors
    /// `KeyGeneration` if the bytes are not an Ed25519 point.
    pub fn from_bytes(bytes: &[u8; ED25519_PUBLIC_KEY_SIZE]) -> Result<Self> {
        VerifyingKey::from_bytes(bytes)
            .map(Self)
            .map_err(|_| CoreError::key_generation("peer identity key is not an Ed25519 point"))
    }

    /// Raw key bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; ED25519_PUBLIC_KEY_SIZE] {
        self.0.as_bytes()
    }

    /// Shorthand for [`Fingerprint::of`].
    #[must_use]
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::of(self)
    }

    /// Checks a handshake signature.
    ///
    /// # Errors
    /// `SignatureVerification` on any mismatch.
    pub fn verify(&self, message: &[u8], signature: &[u8; ED25519_SIGNATURE_SIZE]) -> Result<()> {
        self.0
            .verify(message, &Signature::from_bytes(signature))
            .map_err(|_| CoreError::SignatureVerification)
    }
}

impl fmt::Debug for IdentityPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fingerprint = self.fingerprint().to_string();
        write!(f, "IdentityPublicKey({} …)", &fingerprint[..9])
    }
}

impl Serialize for IdentityPublicKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&BASE64.encode(self.as_bytes()))
    }
}

impl<'de> Deserialize<'de> for IdentityPublicKey {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        let bytes = BASE64.decode(encoded).map_err(serde::de::Error::custom)?;
        let bytes: [u8; ED25519_PUBLIC_KEY_SIZE] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| serde::de::Error::invalid_length(bytes.len(), &"32 bytes"))?;
        Self::from_bytes(&bytes).map_err(serde::de::Error::custom)
    }
}

// ============================================
// Fingerprint
// ============================================

const FINGERPRINT_BYTES: usize = 20;

/// What two users read to each other to confirm a session.
///
/// First 20 bytes of SHA-256 over the identity key, shown as upper-case
/// hex in ten groups of four: `3F2A 91C0 …`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; FINGERPRINT_BYTES]);

impl Fingerprint {
    /// Fingerprint of `key`.
    #[must_use]
    pub fn of(key: &IdentityPublicKey) -> Self {
        let digest = Sha256::digest(key.as_bytes());
        let mut out = [0u8; FINGERPRINT_BYTES];
        out.copy_from_slice(&digest[..FINGERPRINT_BYTES]);
        Self(out)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, pair) in self.0.chunks(2).enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            f.write_str(&hex::encode_upper(pair))?;
        }
        Ok(())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({self})")
    }
}

// ============================================
// EphemeralKeyPair
// ============================================

/// X25519 key carried by one Offer or Ack; [`exchange`](Self::exchange)
/// consumes it so it cannot serve two handshakes.
pub struct EphemeralKeyPair {
    secret: EphemeralSecret,
    public: X25519PublicKey,
}

impl EphemeralKeyPair {
    /// Draws a fresh ephemeral.
    #[must_use]
    pub fn generate() -> Self {
        let secret = EphemeralSecret::random_from_rng(OsRng);
        let public = X25519PublicKey::from(&secret);
        Self { secret, public }
    }

    /// Public bytes for the handshake message.
    #[must_use]
    pub fn public_key_bytes(&self) -> [u8; X25519_PUBLIC_KEY_SIZE] {
        self.public.to_bytes()
    }

    /// X25519 with the peer's ephemeral.
    ///
    /// # Errors
    /// `KeyExchange` when the peer sent a low-order point, which would
    /// make the shared secret predictable.
    pub fn exchange(self, peer_public: &[u8; X25519_PUBLIC_KEY_SIZE]) -> Result<[u8; 32]> {
        let shared = self
            .secret
            .diffie_hellman(&X25519PublicKey::from(*peer_public));
        if shared.was_contributory() {
            Ok(*shared.as_bytes())
        } else {
            Err(CoreError::KeyExchange {
                reason: "peer ephemeral key is a low-order point".into(),
            })
        }
    }
}

impl fmt::Debug for EphemeralKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EphemeralKeyPair").finish_non_exhaustive()
    }
}

// ============================================
// SessionKey
// ============================================

/// ChaCha20-Poly1305 key for one direction of one session.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SessionKey([u8; CHACHA20_KEY_SIZE]);

impl SessionKey {
    /// Wraps HKDF output.
    #[must_use]
    pub fn from_bytes(bytes: [u8; CHACHA20_KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Key bytes for the cipher; do not log or store them.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; CHACHA20_KEY_SIZE] {
        &self.0
    }
}

impl fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionKey(..)")
    }
}

impl PartialEq for SessionKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.ct_eq(&other.0).into()
    }
}

impl Eq for SessionKey {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_each_agent_gets_its_own_identity() {
        let a = IdentityKeyPair::generate();
        let b = IdentityKeyPair::generate();
        assert_ne!(a.public_key(), b.public_key());
        assert_ne!(a.public_key().fingerprint(), b.public_key().fingerprint());
    }

    #[test]
    fn test_signature_binds_message_and_signer() {
        let alice = IdentityKeyPair::generate();
        let mallory = IdentityKeyPair::generate();
        let signature = alice.sign(b"offer");

        assert!(alice.public_key().verify(b"offer", &signature).is_ok());
        assert!(matches!(
            alice.public_key().verify(b"offer!", &signature),
            Err(CoreError::SignatureVerification)
        ));
        assert!(mallory.public_key().verify(b"offer", &signature).is_err());
    }

    #[test]
    fn test_exchange_agrees() {
        let alice = EphemeralKeyPair::generate();
        let bob = EphemeralKeyPair::generate();
        let (alice_pub, bob_pub) = (alice.public_key_bytes(), bob.public_key_bytes());

        assert_eq!(alice.exchange(&bob_pub).unwrap(), bob.exchange(&alice_pub).unwrap());
    }

    #[test]
    fn test_exchange_rejects_low_order_point() {
        assert!(matches!(
            EphemeralKeyPair::generate().exchange(&[0u8; 32]),
            Err(CoreError::KeyExchange { .. })
        ));
    }

    #[test]
    fn test_fingerprint_shape() {
        let key = IdentityKeyPair::generate().public_key();
        let shown = key.fingerprint().to_string();

        let groups: Vec<&str> = shown.split(' ').collect();
        assert_eq!(groups.len(), 10);
        assert!(groups
            .iter()
            .all(|g| g.len() == 4 && g.chars().all(|c| c.is_ascii_digit() || c.is_ascii_uppercase())));
        assert_eq!(shown, Fingerprint::of(&key).to_string());
    }

    #[test]
    fn test_debug_hides_key_bytes() {
        let key = IdentityKeyPair::generate().public_key();
        let debug = format!("{key:?}");
        assert!(debug.contains(&key.fingerprint().to_string()[..9]));
        assert!(!debug.contains(&hex::encode(&key.as_bytes()[..4])));

        assert_eq!(format!("{:?}", SessionKey::from_bytes([7; 32])), "SessionKey(..)");
    }

    #[test]
    fn test_session_key_equality() {
        assert_eq!(SessionKey::from_bytes([0x42; 32]), SessionKey::from_bytes([0x42; 32]));
        assert_ne!(SessionKey::from_bytes([0x42; 32]), SessionKey::from_bytes([0x43; 32]));
    }

    #[test]
    fn test_public_key_json() {
        let key = IdentityKeyPair::generate().public_key();
        let json = serde_json::to_string(&key).unwrap();
        assert!(json.starts_with('"'));
        assert_eq!(serde_json::from_str::<IdentityPublicKey>(&json).unwrap(), key);
        assert!(serde_json::from_str::<IdentityPublicKey>("\"AAAA\"").is_err());
    }
}
