// ============================================
// File: crates/palaver-core/src/crypto/mod.rs
// ============================================
//! # Cryptography
//!
//! Building blocks of a palaver session, all from the dalek and
//! RustCrypto crates:
//!
//! - [`keys`]: Ed25519 process identity, X25519 ephemerals, fingerprints
//! - [`handshake`]: signs and checks Offer / Ack
//! - [`kdf`]: one HKDF-SHA256 expansion into two directional keys
//! - [`transport`]: ChaCha20-Poly1305 over Data / Close payloads
//! - [`replay`]: which inbound counters were already accepted
//!
//! ```text
//!  alice (initiator)                                bob (responder)
//!    │ Offer{id_a, eph_a, time} signed id_a ─────────────►│
//!    │◄──────── Ack{id_b, eph_b, session} signed id_b     │
//!    │          over (Ack fields ‖ id_a ‖ eph_a)          │
//!    │                                                    │
//!    └── X25519(eph_a, eph_b) ─► HKDF ─► a→b key, b→a key ┘
//!
//!  Data/Close: key[direction] + counter ─► ChaCha20-Poly1305
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Secret material lives only in zeroizing types
//! - Counters restart at 1 in each direction; the keys differ, the
//!   nonces may repeat across directions

pub mod handshake;
pub mod kdf;
pub mod keys;
pub mod replay;
pub mod transport;

pub use handshake::{Accepted, DefaultHandshakeCrypto, HandshakeCrypto};
pub use kdf::SessionKeys;
pub use keys::{EphemeralKeyPair, Fingerprint, IdentityKeyPair, IdentityPublicKey, SessionKey};
pub use replay::ReplayWindow;
pub use transport::{DefaultTransportCrypto, TransportCrypto};

// ============================================
// Constants
// ============================================

/// Size of Ed25519 public key in bytes.
pub const ED25519_PUBLIC_KEY_SIZE: usize = 32;

/// Size of Ed25519 signature in bytes.
pub const ED25519_SIGNATURE_SIZE: usize = 64;

/// Size of X25519 public key in bytes.
pub const X25519_PUBLIC_KEY_SIZE: usize = 32;

/// Size of ChaCha20-Poly1305 key in bytes.
pub const CHACHA20_KEY_SIZE: usize = 32;

/// Size of ChaCha20-Poly1305 nonce in bytes.
pub const CHACHA20_NONCE_SIZE: usize = 12;

/// Size of Poly1305 authentication tag in bytes.
pub const POLY1305_TAG_SIZE: usize = 16;

/// HKDF salt for session key derivation.
pub const HKDF_SALT: &[u8] = b"palaver-v1";

/// HKDF info prefix for key derivation.
pub const HKDF_INFO_PREFIX: &[u8] = b"palaver-session-keys";

/// Default tolerated clock difference for offers, in seconds.
pub const DEFAULT_MAX_TIMESTAMP_SKEW: u64 = 600;
