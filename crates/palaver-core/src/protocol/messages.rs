// ============================================
// File: crates/palaver-core/src/protocol/messages.rs
// ============================================
//! # Protocol Message Definitions
//!
//! ## Creation Reason
//! Defines the binary messages two palaver peers exchange inside armored
//! chat lines.
//!
//! ## Main Functionality
//! - `MessageType`: Enum for message type identification
//! - `Offer`: Initiator's handshake message
//! - `Ack`: Responder's handshake answer
//! - `Packet`: Encrypted Data / Close message
//!
//! ## Message Sizes
//! | Message | Size (bytes) |
//! |---------|--------------|
//! | Offer | 138 |
//! | Ack | 146 |
//! | Packet header | 25 |
//!
//! ## Wire Format (Little Endian)
//! All multi-byte integers are encoded in little-endian byte order.
//!
//! ## ⚠️ Important Note for Next Developer
//! - Field order is covered by signatures and AAD, DO NOT reorder
//!   without a version bump
//! - Add new message types at the end of the enum
//!
//! ## Last Modified
//! v0.1.0 - Initial message definitions

use serde::{Deserialize, Serialize};

use palaver_common::types::SESSION_ID_SIZE;

use crate::crypto::{ED25519_PUBLIC_KEY_SIZE, ED25519_SIGNATURE_SIZE, X25519_PUBLIC_KEY_SIZE};

// ============================================
// Message Size Constants
// ============================================

/// Size of an Offer message in bytes.
pub const OFFER_SIZE: usize = 138;

/// Size of an Ack message in bytes.
pub const ACK_SIZE: usize = 146;

/// Size of a Packet header in bytes (type + session id + counter).
pub const PACKET_HEADER_SIZE: usize = 25;

// ============================================
// MessageType
// ============================================

/// Protocol message type identifier.
///
/// # Values
/// | Value | Type |
/// |-------|------|
/// | 0x01 | Offer |
/// | 0x02 | Ack |
/// | 0x03 | Data |
/// | 0x04 | Close |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum MessageType {
    /// Initiator's handshake message.
    Offer = 0x01,
    /// Responder's handshake answer.
    Ack = 0x02,
    /// Encrypted application payload.
    Data = 0x03,
    /// Authenticated session teardown.
    Close = 0x04,
}

impl MessageType {
    /// Converts a byte to a `MessageType`, `None` if unknown.
    #[must_use]
    pub const fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x01 => Some(Self::Offer),
            0x02 => Some(Self::Ack),
            0x03 => Some(Self::Data),
            0x04 => Some(Self::Close),
            _ => None,
        }
    }

    /// Converts the `MessageType` to its byte representation.
    #[must_use]
    pub const fn as_byte(&self) -> u8 {
        *self as u8
    }

    /// Checks if this is a handshake message.
    #[must_use]
    pub const fn is_handshake(&self) -> bool {
        matches!(self, Self::Offer | Self::Ack)
    }

    /// Checks if this message travels inside an established session.
    #[must_use]
    pub const fn is_packet(&self) -> bool {
        matches!(self, Self::Data | Self::Close)
    }
}

impl TryFrom<u8> for MessageType {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_byte(value).ok_or(value)
    }
}

impl From<MessageType> for u8 {
    fn from(msg_type: MessageType) -> Self {
        msg_type.as_byte()
    }
}

// ============================================
// Offer
// ============================================

/// Initiator's handshake message.
///
/// # Wire Format (138 bytes)
/// ```text
/// ┌────────────────────────────────────────────┐
/// │ message_type (1 byte)         │ 0x01       │
/// ├────────────────────────────────────────────┤
/// │ version (1 byte)              │ Protocol   │
/// ├────────────────────────────────────────────┤
/// │ identity_key (32 bytes)       │ Ed25519    │
/// ├────────────────────────────────────────────┤
/// │ ephemeral_key (32 bytes)      │ X25519     │
/// ├────────────────────────────────────────────┤
/// │ timestamp (8 bytes)           │ Unix secs  │
/// ├────────────────────────────────────────────┤
/// │ signature (64 bytes)          │ Ed25519    │
/// └────────────────────────────────────────────┘
/// ```
///
/// # Signature Covers
/// All fields except the signature itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Offer {
    /// Message type (always 0x01).
    pub message_type: u8,
    /// Protocol version.
    pub version: u8,
    /// Initiator's Ed25519 identity key.
    pub identity_key: [u8; ED25519_PUBLIC_KEY_SIZE],
    /// Initiator's X25519 ephemeral key.
    pub ephemeral_key: [u8; X25519_PUBLIC_KEY_SIZE],
    /// Unix timestamp in seconds.
    pub timestamp: i64,
    /// Ed25519 signature over the above fields.
    pub signature: [u8; ED25519_SIGNATURE_SIZE],
}

impl Offer {
    /// Creates an unsigned Offer; the handshake module fills in the signature.
    #[must_use]
    pub fn new(
        version: u8,
        identity_key: [u8; ED25519_PUBLIC_KEY_SIZE],
        ephemeral_key: [u8; X25519_PUBLIC_KEY_SIZE],
        timestamp: i64,
    ) -> Self {
        Self {
            message_type: MessageType::Offer.as_byte(),
            version,
            identity_key,
            ephemeral_key,
            timestamp,
            signature: [0u8; ED25519_SIGNATURE_SIZE],
        }
    }

    /// Returns the serialized size of an Offer.
    #[must_use]
    pub const fn wire_size() -> usize {
        OFFER_SIZE
    }
}

// ============================================
// Ack
// ============================================

/// Responder's handshake answer.
///
/// # Wire Format (146 bytes)
/// ```text
/// ┌────────────────────────────────────────────┐
/// │ message_type (1 byte)         │ 0x02       │
/// ├────────────────────────────────────────────┤
/// │ version (1 byte)              │ Protocol   │
/// ├────────────────────────────────────────────┤
/// │ identity_key (32 bytes)       │ Ed25519    │
/// ├────────────────────────────────────────────┤
/// │ ephemeral_key (32 bytes)      │ X25519     │
/// ├────────────────────────────────────────────┤
/// │ session_id (16 bytes)         │ Random     │
/// ├────────────────────────────────────────────┤
/// │ signature (64 bytes)          │ Ed25519    │
/// └────────────────────────────────────────────┘
/// ```
///
/// # Signature Covers
/// All fields except the signature, followed by the offer's identity and
/// ephemeral keys, so an Ack only verifies against the Offer it answers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ack {
    /// Message type (always 0x02).
    pub message_type: u8,
    /// Protocol version.
    pub version: u8,
    /// Responder's Ed25519 identity key.
    pub identity_key: [u8; ED25519_PUBLIC_KEY_SIZE],
    /// Responder's X25519 ephemeral key.
    pub ephemeral_key: [u8; X25519_PUBLIC_KEY_SIZE],
    /// Session identifier chosen by the responder.
    pub session_id: [u8; SESSION_ID_SIZE],
    /// Ed25519 signature.
    pub signature: [u8; ED25519_SIGNATURE_SIZE],
}

impl Ack {
    /// Creates an unsigned Ack; the handshake module fills in the signature.
    #[must_use]
    pub fn new(
        version: u8,
        identity_key: [u8; ED25519_PUBLIC_KEY_SIZE],
        ephemeral_key: [u8; X25519_PUBLIC_KEY_SIZE],
        session_id: [u8; SESSION_ID_SIZE],
    ) -> Self {
        Self {
            message_type: MessageType::Ack.as_byte(),
            version,
            identity_key,
            ephemeral_key,
            session_id,
            signature: [0u8; ED25519_SIGNATURE_SIZE],
        }
    }

    /// Returns the serialized size of an Ack.
    #[must_use]
    pub const fn wire_size() -> usize {
        ACK_SIZE
    }
}

// ============================================
// Packet
// ============================================

/// Encrypted message inside an established session.
///
/// # Wire Format (25 bytes header + ciphertext)
/// ```text
/// ┌────────────────────────────────────────────┐
/// │ message_type (1 byte)         │ 0x03/0x04  │
/// ├────────────────────────────────────────────┤
/// │ session_id (16 bytes)         │ AAD        │
/// ├────────────────────────────────────────────┤
/// │ counter (8 bytes)             │ Nonce      │
/// ├────────────────────────────────────────────┤
/// │ ciphertext (variable)         │ AEAD       │
/// │ └─ includes 16-byte auth tag  │            │
/// └────────────────────────────────────────────┘
/// ```
///
/// A Close packet carries an empty plaintext, so its ciphertext is just
/// the tag. Type byte and session id together form the AAD.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// `Data` or `Close`.
    pub message_type: MessageType,
    /// Session identifier.
    pub session_id: [u8; SESSION_ID_SIZE],
    /// Per-direction counter, starts at 1.
    pub counter: u64,
    /// Ciphertext including the Poly1305 tag.
    pub ciphertext: Vec<u8>,
}

impl Packet {
    /// Creates a new packet.
    #[must_use]
    pub fn new(
        message_type: MessageType,
        session_id: [u8; SESSION_ID_SIZE],
        counter: u64,
        ciphertext: Vec<u8>,
    ) -> Self {
        Self {
            message_type,
            session_id,
            counter,
            ciphertext,
        }
    }

    /// Builds the associated data for a packet of the given type.
    #[must_use]
    pub fn associated_data(
        message_type: MessageType,
        session_id: &[u8; SESSION_ID_SIZE],
    ) -> [u8; 1 + SESSION_ID_SIZE] {
        let mut aad = [0u8; 1 + SESSION_ID_SIZE];
        aad[0] = message_type.as_byte();
        aad[1..].copy_from_slice(session_id);
        aad
    }

    /// Returns the header size (excluding ciphertext).
    #[must_use]
    pub const fn header_size() -> usize {
        PACKET_HEADER_SIZE
    }

    /// Returns the total wire size of this packet.
    #[must_use]
    pub fn wire_size(&self) -> usize {
        PACKET_HEADER_SIZE + self.ciphertext.len()
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_type_roundtrip() {
        for msg_type in [
            MessageType::Offer,
            MessageType::Ack,
            MessageType::Data,
            MessageType::Close,
        ] {
            let restored = MessageType::from_byte(msg_type.as_byte()).unwrap();
            assert_eq!(msg_type, restored);
        }
    }

    #[test]
    fn test_message_type_unknown() {
        assert!(MessageType::from_byte(0x00).is_none());
        assert_eq!(MessageType::try_from(0xFF), Err(0xFF));
    }

    #[test]
    fn test_message_type_classification() {
        assert!(MessageType::Offer.is_handshake());
        assert!(MessageType::Ack.is_handshake());
        assert!(!MessageType::Data.is_handshake());

        assert!(MessageType::Data.is_packet());
        assert!(MessageType::Close.is_packet());
        assert!(!MessageType::Offer.is_packet());
    }

    #[test]
    fn test_sizes_match_layout() {
        // 1 + 1 + 32 + 32 + 8 + 64
        assert_eq!(Offer::wire_size(), 138);
        // 1 + 1 + 32 + 32 + 16 + 64
        assert_eq!(Ack::wire_size(), 146);
        // 1 + 16 + 8
        assert_eq!(Packet::header_size(), 25);

        let packet = Packet::new(MessageType::Data, [0u8; 16], 1, vec![0u8; 40]);
        assert_eq!(packet.wire_size(), 65);
    }

    #[test]
    fn test_associated_data_binds_type() {
        let sid = [7u8; 16];
        let data = Packet::associated_data(MessageType::Data, &sid);
        let close = Packet::associated_data(MessageType::Close, &sid);
        assert_ne!(data, close);
        assert_eq!(&data[1..], &sid);
    }
}
