// ============================================
// File: crates/palaver-core/src/crypto/handshake.rs
// ============================================
//! # Handshake Cryptography
//!
//! ## Creation Reason
//! Signs and verifies the Offer / Ack pair and derives the directional
//! session keys on both sides.
//!
//! ## Main Functionality
//! - `HandshakeCrypto`: Trait for handshake cryptographic operations
//! - `DefaultHandshakeCrypto`: Production implementation bound to the
//!   process identity
//!
//! ## Handshake Flow
//! ```text
//! Initiator                                      Responder
//!   │                                               │
//!   │  Offer                                        │
//!   │  ├─ identity_key (Ed25519)                    │
//!   │  ├─ ephemeral_key (X25519)                    │
//!   │  ├─ timestamp                                 │
//!   │  └─ signature ──────────────────────────────► │
//!   │                                               │
//!   │                    Verify version, time, sig  │
//!   │                    Generate ephemeral + id    │
//!   │                    Derive SessionKeys         │
//!   │                                               │
//!   │                                          Ack  │
//!   │  ◄─────────────────────────────── signature   │
//!   │                  (covers the Offer's keys)    │
//!   │                                               │
//!   │  Verify sig against own Offer                 │
//!   │  Derive SessionKeys                           │
//!   │                                               │
//!   │ ═══════════ Encrypted Session ═══════════════ │
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Signature data must be constructed in exact wire order
//! - The verified identity key is RETURNED, callers record it themselves
//!
//! ## Last Modified
//! v0.1.0 - Initial handshake crypto implementation

use tracing::{debug, trace};

use palaver_common::time::Timestamp;
use palaver_common::types::SessionId;

use crate::crypto::kdf::{derive_session_keys, SessionKeys};
use crate::crypto::keys::{EphemeralKeyPair, IdentityKeyPair, IdentityPublicKey};
use crate::crypto::DEFAULT_MAX_TIMESTAMP_SKEW;
use crate::error::{CoreError, Result};
use crate::protocol::messages::{Ack, Offer};
use crate::protocol::{ProtocolVersion, CURRENT_PROTOCOL_VERSION};

use std::sync::Arc;

// ============================================
// Accepted
// ============================================

/// Result of accepting a peer's Offer.
#[derive(Debug)]
pub struct Accepted {
    /// Signed answer to send back.
    pub ack: Ack,
    /// Directional keys for the new session.
    pub keys: SessionKeys,
    /// The offerer's verified identity key.
    pub peer_key: IdentityPublicKey,
}

// ============================================
// HandshakeCrypto Trait
// ============================================

/// Trait for handshake cryptographic operations.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use palaver_common::types::SessionId;
/// use palaver_core::crypto::{DefaultHandshakeCrypto, EphemeralKeyPair, HandshakeCrypto, IdentityKeyPair};
///
/// let alice = DefaultHandshakeCrypto::new(Arc::new(IdentityKeyPair::generate()));
/// let bob = DefaultHandshakeCrypto::new(Arc::new(IdentityKeyPair::generate()));
///
/// let ephemeral = EphemeralKeyPair::generate();
/// let offer = alice.create_offer(ephemeral.public_key_bytes());
/// let accepted = bob.accept_offer(&offer, SessionId::generate()).unwrap();
///
/// let bob_key = alice.verify_ack(&accepted.ack, &offer).unwrap();
/// assert_eq!(bob_key, bob.public_key());
///
/// let keys = alice.finish(ephemeral, &accepted.ack).unwrap();
/// assert_eq!(keys, accepted.keys);
/// ```
pub trait HandshakeCrypto: Send + Sync {
    /// Returns the local identity public key.
    fn public_key(&self) -> IdentityPublicKey;

    /// Builds and signs an Offer around the given ephemeral key.
    fn create_offer(&self, ephemeral_public: [u8; 32]) -> Offer;

    /// Verifies an Offer, returning the offerer's identity key.
    ///
    /// # Errors
    /// - `UnsupportedVersion`: unknown protocol version
    /// - `InvalidTimestamp`: offer outside the accepted clock skew
    /// - `SignatureVerification`: bad signature
    fn verify_offer(&self, offer: &Offer) -> Result<IdentityPublicKey>;

    /// Verifies an Offer and answers it with a signed Ack plus the keys.
    ///
    /// # Errors
    /// Everything `verify_offer` returns, plus key exchange failures.
    fn accept_offer(&self, offer: &Offer, session_id: SessionId) -> Result<Accepted>;

    /// Verifies an Ack against the Offer it answers, returning the
    /// responder's identity key.
    ///
    /// # Errors
    /// `UnsupportedVersion` or `SignatureVerification`.
    fn verify_ack(&self, ack: &Ack, offer: &Offer) -> Result<IdentityPublicKey>;

    /// Derives the initiator's keys once the Ack has been verified.
    ///
    /// # Errors
    /// Key exchange or derivation failures.
    fn finish(&self, ephemeral: EphemeralKeyPair, ack: &Ack) -> Result<SessionKeys>;
}

// ============================================
// DefaultHandshakeCrypto
// ============================================

/// Default production implementation of handshake cryptography.
pub struct DefaultHandshakeCrypto {
    /// Process identity, shared by every session
    identity: Arc<IdentityKeyPair>,
    /// Maximum allowed timestamp skew in seconds
    max_timestamp_skew: u64,
}

impl DefaultHandshakeCrypto {
    /// Creates a new handshake crypto instance.
    #[must_use]
    pub fn new(identity: Arc<IdentityKeyPair>) -> Self {
        Self {
            identity,
            max_timestamp_skew: DEFAULT_MAX_TIMESTAMP_SKEW,
        }
    }

    /// Sets the maximum allowed timestamp skew.
    #[must_use]
    pub fn with_timestamp_skew(mut self, seconds: u64) -> Self {
        self.max_timestamp_skew = seconds;
        self
    }

    /// Constructs the data signed by an Offer.
    ///
    /// ```text
    /// message_type || version || identity_key || ephemeral_key || timestamp
    /// ```
    fn offer_sign_data(msg: &Offer) -> Vec<u8> {
        let mut data = Vec::with_capacity(74);
        data.push(msg.message_type);
        data.push(msg.version);
        data.extend_from_slice(&msg.identity_key);
        data.extend_from_slice(&msg.ephemeral_key);
        data.extend_from_slice(&msg.timestamp.to_le_bytes());
        data
    }

    /// Constructs the data signed by an Ack.
    ///
    /// ```text
    /// message_type || version || identity_key || ephemeral_key ||
    /// session_id || offer.identity_key || offer.ephemeral_key
    /// ```
    fn ack_sign_data(msg: &Ack, offer: &Offer) -> Vec<u8> {
        let mut data = Vec::with_capacity(146);
        data.push(msg.message_type);
        data.push(msg.version);
        data.extend_from_slice(&msg.identity_key);
        data.extend_from_slice(&msg.ephemeral_key);
        data.extend_from_slice(&msg.session_id);
        data.extend_from_slice(&offer.identity_key);
        data.extend_from_slice(&offer.ephemeral_key);
        data
    }
}

impl std::fmt::Debug for DefaultHandshakeCrypto {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DefaultHandshakeCrypto")
            .field("identity", &self.identity.public_key())
            .field("max_timestamp_skew", &self.max_timestamp_skew)
            .finish()
    }
}

impl HandshakeCrypto for DefaultHandshakeCrypto {
    fn public_key(&self) -> IdentityPublicKey {
        self.identity.public_key()
    }

    fn create_offer(&self, ephemeral_public: [u8; 32]) -> Offer {
        let mut offer = Offer::new(
            CURRENT_PROTOCOL_VERSION,
            self.identity.public_key_bytes(),
            ephemeral_public,
            Timestamp::now().as_secs(),
        );
        offer.signature = self.identity.sign(&Self::offer_sign_data(&offer));
        trace!(timestamp = offer.timestamp, "Offer signed");
        offer
    }

    fn verify_offer(&self, offer: &Offer) -> Result<IdentityPublicKey> {
        ProtocolVersion::new(offer.version).ensure_supported()?;

        let timestamp = Timestamp::from_secs(offer.timestamp);
        if !timestamp.is_recent(self.max_timestamp_skew) {
            return Err(CoreError::invalid_timestamp(format!(
                "offer is {}s away from local time (max skew: {}s)",
                timestamp.offset_from_now(),
                self.max_timestamp_skew
            )));
        }

        let peer = IdentityPublicKey::from_bytes(&offer.identity_key)?;
        peer.verify(&Self::offer_sign_data(offer), &offer.signature)?;

        debug!(peer = %peer.fingerprint(), "Offer verified");
        Ok(peer)
    }

    fn accept_offer(&self, offer: &Offer, session_id: SessionId) -> Result<Accepted> {
        let peer_key = self.verify_offer(offer)?;

        let ephemeral = EphemeralKeyPair::generate();
        let ephemeral_public = ephemeral.public_key_bytes();
        let shared_secret = ephemeral.exchange(&offer.ephemeral_key)?;

        let keys = derive_session_keys(
            &shared_secret,
            &offer.identity_key,
            &self.identity.public_key_bytes(),
        )?;

        let mut ack = Ack::new(
            offer.version,
            self.identity.public_key_bytes(),
            ephemeral_public,
            *session_id.as_bytes(),
        );
        ack.signature = self.identity.sign(&Self::ack_sign_data(&ack, offer));

        Ok(Accepted { ack, keys, peer_key })
    }

    fn verify_ack(&self, ack: &Ack, offer: &Offer) -> Result<IdentityPublicKey> {
        ProtocolVersion::new(ack.version).ensure_supported()?;

        let peer = IdentityPublicKey::from_bytes(&ack.identity_key)?;
        peer.verify(&Self::ack_sign_data(ack, offer), &ack.signature)?;

        debug!(peer = %peer.fingerprint(), "Ack verified");
        Ok(peer)
    }

    fn finish(&self, ephemeral: EphemeralKeyPair, ack: &Ack) -> Result<SessionKeys> {
        let shared_secret = ephemeral.exchange(&ack.ephemeral_key)?;
        derive_session_keys(
            &shared_secret,
            &self.identity.public_key_bytes(),
            &ack.identity_key,
        )
    }
}

// ============================================
// Tests
// ============================================
