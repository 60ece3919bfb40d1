// ============================================
// File: crates/palaver-core/src/crypto/kdf.rs
// ============================================
//! # Key Derivation Functions
//!
//! ## Creation Reason
//! Turns the X25519 shared secret of a handshake into two directional
//! ChaCha20-Poly1305 keys.
//!
//! ## Main Functionality
//! - `derive_session_keys`: HKDF-SHA256 over the shared secret, bound to
//!   both identity keys
//! - `hkdf_expand`: raw HKDF helper
//!
//! ## Key Layout
//! ```text
//! HKDF-SHA256(salt = HKDF_SALT,
//!             ikm  = shared_secret,
//!             info = HKDF_INFO_PREFIX || initiator_id || responder_id)
//!   ─► 64 bytes
//!      ├─ [0..32]  initiator → responder
//!      └─ [32..64] responder → initiator
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Both sides MUST pass the identities in the same order (initiator
//!   first), regardless of which side is deriving.
//!
//! ## Last Modified
//! v0.1.0 - Directional key derivation

use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::Zeroize;

use super::{CHACHA20_KEY_SIZE, ED25519_PUBLIC_KEY_SIZE, HKDF_INFO_PREFIX, HKDF_SALT};
use crate::crypto::SessionKey;
use crate::error::{CoreError, Result};

// ============================================
// SessionKeys
// ============================================

/// The pair of directional keys for one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionKeys {
    /// Key protecting traffic sent by the initiator.
    pub initiator_to_responder: SessionKey,
    /// Key protecting traffic sent by the responder.
    pub responder_to_initiator: SessionKey,
}

impl SessionKeys {
    /// Splits the pair into `(send, receive)` for the given role.
    #[must_use]
    pub fn for_role(self, is_initiator: bool) -> (SessionKey, SessionKey) {
        if is_initiator {
            (self.initiator_to_responder, self.responder_to_initiator)
        } else {
            (self.responder_to_initiator, self.initiator_to_responder)
        }
    }
}

// ============================================
// Key Derivation
// ============================================

/// Derives both directional session keys from the X25519 shared secret.
///
/// # Arguments
/// * `shared_secret` - 32-byte X25519 Diffie-Hellman output
/// * `initiator_public` - Ed25519 identity of the side that sent the Offer
/// * `responder_public` - Ed25519 identity of the side that sent the Ack
///
/// # Errors
/// Returns `KeyDerivation` if HKDF expansion fails.
pub fn derive_session_keys(
    shared_secret: &[u8; 32],
    initiator_public: &[u8; ED25519_PUBLIC_KEY_SIZE],
    responder_public: &[u8; ED25519_PUBLIC_KEY_SIZE],
) -> Result<SessionKeys> {
    let mut info = Vec::with_capacity(HKDF_INFO_PREFIX.len() + ED25519_PUBLIC_KEY_SIZE * 2);
    info.extend_from_slice(HKDF_INFO_PREFIX);
    info.extend_from_slice(initiator_public);
    info.extend_from_slice(responder_public);

    let mut okm = hkdf_expand(shared_secret, HKDF_SALT, &info, CHACHA20_KEY_SIZE * 2)?;
    info.zeroize();

    let mut i2r = [0u8; CHACHA20_KEY_SIZE];
    let mut r2i = [0u8; CHACHA20_KEY_SIZE];
    i2r.copy_from_slice(&okm[..CHACHA20_KEY_SIZE]);
    r2i.copy_from_slice(&okm[CHACHA20_KEY_SIZE..]);
    okm.zeroize();

    Ok(SessionKeys {
        initiator_to_responder: SessionKey::from_bytes(i2r),
        responder_to_initiator: SessionKey::from_bytes(r2i),
    })
}

/// Expands input keying material to `output_len` bytes with HKDF-SHA256.
///
/// # Errors
/// Returns `KeyDerivation` if `output_len` exceeds 255 * 32 bytes.
pub fn hkdf_expand(
    input_key_material: &[u8],
    salt: &[u8],
    info: &[u8],
    output_len: usize,
) -> Result<Vec<u8>> {
    let hk = Hkdf::<Sha256>::new(Some(salt), input_key_material);

    let mut output = vec![0u8; output_len];
    hk.expand(info, &mut output)
        .map_err(|_| CoreError::KeyDerivation {
            reason: format!("HKDF expansion failed for {output_len} bytes"),
        })?;

    Ok(output)
}

// ============================================
// Tests
// ============================================
