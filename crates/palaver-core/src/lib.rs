// ============================================
// File: crates/palaver-core/src/lib.rs
// ============================================
//! # Palaver Core - Session Protocol & Cryptography
//!
//! ## Creation Reason
//! Provides the cryptographic session primitive a palaver agent drives for
//! every peer: signed handshake, authenticated encryption, and the text
//! armor that lets binary messages ride a chat line.
//!
//! ## Main Functionality
//!
//! ### Session ([`session`])
//! - `CryptoSession` trait (offer / acknowledge / receive / send / close)
//! - `SessionFactory` + default implementation bound to the process identity
//!
//! ### Protocol Module ([`protocol`])
//! - Offer / Ack / Data / Close message definitions and binary codec
//! - Frame codec: `?PLV:<base64>.`
//! - Protocol version management
//!
//! ### Crypto Module ([`crypto`])
//! - Key types (`IdentityKeyPair`, `EphemeralKeyPair`, `SessionKey`)
//! - Handshake cryptography (signatures, key exchange)
//! - Transport encryption (ChaCha20-Poly1305)
//! - Key derivation (HKDF-SHA256) and replay tracking
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │               palaver-agent                         │
//! │                    │                                │
//! │         ┌──────────┴──────────┐                     │
//! │         ▼                     ▼                     │
//! │   palaver-core  ◄──    palaver-transport            │
//! │   You are here                │                     │
//! │         │                     │                     │
//! │         └──────────┬──────────┘                     │
//! │                    ▼                                │
//! │             palaver-common                          │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## Security Guarantees
//! - **Confidentiality**: ChaCha20-Poly1305 authenticated encryption
//! - **Authenticity**: Ed25519 signatures on Offer and Ack
//! - **Forward Secrecy**: X25519 ephemeral key exchange per session
//! - **Replay Protection**: per-direction counters with a sliding window
//!
//! ## ⚠️ Important Note for Next Developer
//! - NEVER implement custom crypto primitives
//! - ALL secret keys MUST implement Zeroize
//!
//! ## Last Modified
//! v0.1.0 - Initial implementation

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod crypto;
pub mod error;
pub mod protocol;
pub mod session;

// Re-export commonly used items
pub use crypto::{Fingerprint, IdentityKeyPair, IdentityPublicKey};
pub use error::{CoreError, Result};
pub use protocol::{is_complete, is_tagged, END_MARKER, START_MARKER};
pub use session::{
    Acknowledged, CryptoSession, DefaultCryptoSession, DefaultSessionFactory, Received,
    SessionFactory,
};
