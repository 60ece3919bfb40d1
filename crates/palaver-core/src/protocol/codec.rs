// ============================================
// File: crates/palaver-core/src/protocol/codec.rs
// ============================================
//! # Protocol Codec
//!
//! ## Creation Reason
//! Binary serialization and deserialization for the palaver messages,
//! before they are armored into chat text.
//!
//! ## Main Functionality
//! - `Codec` trait: Generic encode/decode interface
//! - `ProtocolCodec`: Implementation for all message types
//! - `encode_*` / `decode_*` convenience functions
//!
//! ## Parsing Strategy
//! 1. Check minimum message length
//! 2. Read message type byte
//! 3. Dispatch to type-specific parser
//! 4. Reject trailing bytes on fixed-size messages
//!
//! ## ⚠️ Important Note for Next Developer
//! - Always validate buffer lengths before reading, `Buf::get_*` panics
//!   on short input
//!
//! ## Last Modified
//! v0.1.0 - Initial codec implementation

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::crypto::POLY1305_TAG_SIZE;
use crate::error::{CoreError, Result};
use crate::protocol::messages::{
    Ack, MessageType, Offer, Packet, ACK_SIZE, OFFER_SIZE, PACKET_HEADER_SIZE,
};

/// Largest packet accepted by the decoder, header included.
pub const MAX_PACKET_SIZE: usize = 64 * 1024;

// ============================================
// Codec Trait
// ============================================

/// Trait for encoding and decoding protocol messages.
///
/// # Type Parameters
/// * `T` - The message type to encode/decode
pub trait Codec<T> {
    /// Encodes a message into a byte buffer.
    fn encode(&self, msg: &T, buf: &mut BytesMut);

    /// Decodes a message from bytes.
    ///
    /// # Errors
    /// Returns a protocol error if the bytes are not a valid `T`.
    fn decode(&self, buf: &mut Bytes) -> Result<T>;
}

// ============================================
// ProtocolCodec
// ============================================

/// Codec implementation for all protocol messages.
#[derive(Debug, Default, Clone)]
pub struct ProtocolCodec;

impl ProtocolCodec {
    /// Creates a new protocol codec.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Identifies the message type from a buffer without consuming it.
    ///
    /// # Errors
    /// `MessageTooShort` on an empty buffer, `UnknownMessageType` otherwise.
    pub fn peek_message_type(buf: &[u8]) -> Result<MessageType> {
        let first = *buf.first().ok_or(CoreError::too_short(1, 0))?;
        MessageType::from_byte(first).ok_or(CoreError::UnknownMessageType(first))
    }

    fn expect_exact(buf: &Bytes, size: usize) -> Result<()> {
        if buf.len() < size {
            return Err(CoreError::too_short(size, buf.len()));
        }
        if buf.len() > size {
            return Err(CoreError::malformed(format!(
                "{} trailing bytes after {size}-byte message",
                buf.len() - size
            )));
        }
        Ok(())
    }
}

// ============================================
// Offer Codec
// ============================================

impl Codec<Offer> for ProtocolCodec {
    fn encode(&self, msg: &Offer, buf: &mut BytesMut) {
        buf.reserve(OFFER_SIZE);
        buf.put_u8(msg.message_type);
        buf.put_u8(msg.version);
        buf.put_slice(&msg.identity_key);
        buf.put_slice(&msg.ephemeral_key);
        buf.put_i64_le(msg.timestamp);
        buf.put_slice(&msg.signature);
    }

    fn decode(&self, buf: &mut Bytes) -> Result<Offer> {
        Self::expect_exact(buf, OFFER_SIZE)?;

        let message_type = buf.get_u8();
        if message_type != MessageType::Offer.as_byte() {
            return Err(CoreError::malformed(format!(
                "Expected Offer (0x01), got 0x{message_type:02x}"
            )));
        }

        let version = buf.get_u8();

        let mut identity_key = [0u8; 32];
        buf.copy_to_slice(&mut identity_key);

        let mut ephemeral_key = [0u8; 32];
        buf.copy_to_slice(&mut ephemeral_key);

        let timestamp = buf.get_i64_le();

        let mut signature = [0u8; 64];
        buf.copy_to_slice(&mut signature);

        Ok(Offer {
            message_type,
            version,
            identity_key,
            ephemeral_key,
            timestamp,
            signature,
        })
    }
}

// ============================================
// Ack Codec
// ============================================

impl Codec<Ack> for ProtocolCodec {
    fn encode(&self, msg: &Ack, buf: &mut BytesMut) {
        buf.reserve(ACK_SIZE);
        buf.put_u8(msg.message_type);
        buf.put_u8(msg.version);
        buf.put_slice(&msg.identity_key);
        buf.put_slice(&msg.ephemeral_key);
        buf.put_slice(&msg.session_id);
        buf.put_slice(&msg.signature);
    }

    fn decode(&self, buf: &mut Bytes) -> Result<Ack> {
        Self::expect_exact(buf, ACK_SIZE)?;

        let message_type = buf.get_u8();
        if message_type != MessageType::Ack.as_byte() {
            return Err(CoreError::malformed(format!(
                "Expected Ack (0x02), got 0x{message_type:02x}"
            )));
        }

        let version = buf.get_u8();

        let mut identity_key = [0u8; 32];
        buf.copy_to_slice(&mut identity_key);

        let mut ephemeral_key = [0u8; 32];
        buf.copy_to_slice(&mut ephemeral_key);

        let mut session_id = [0u8; 16];
        buf.copy_to_slice(&mut session_id);

        let mut signature = [0u8; 64];
        buf.copy_to_slice(&mut signature);

        Ok(Ack {
            message_type,
            version,
            identity_key,
            ephemeral_key,
            session_id,
            signature,
        })
    }
}

// ============================================
// Packet Codec
// ============================================

impl Codec<Packet> for ProtocolCodec {
    fn encode(&self, msg: &Packet, buf: &mut BytesMut) {
        buf.reserve(PACKET_HEADER_SIZE + msg.ciphertext.len());
        buf.put_u8(msg.message_type.as_byte());
        buf.put_slice(&msg.session_id);
        buf.put_u64_le(msg.counter);
        buf.put_slice(&msg.ciphertext);
    }

    fn decode(&self, buf: &mut Bytes) -> Result<Packet> {
        let min = PACKET_HEADER_SIZE + POLY1305_TAG_SIZE;
        if buf.len() < min {
            return Err(CoreError::too_short(min, buf.len()));
        }
        if buf.len() > MAX_PACKET_SIZE {
            return Err(CoreError::MessageTooLarge {
                max: MAX_PACKET_SIZE,
                actual: buf.len(),
            });
        }

        let type_byte = buf.get_u8();
        let message_type = match MessageType::from_byte(type_byte) {
            Some(t) if t.is_packet() => t,
            Some(_) => {
                return Err(CoreError::malformed(format!(
                    "Expected Data or Close, got 0x{type_byte:02x}"
                )))
            }
            None => return Err(CoreError::UnknownMessageType(type_byte)),
        };

        let mut session_id = [0u8; 16];
        buf.copy_to_slice(&mut session_id);

        let counter = buf.get_u64_le();

        // Remaining bytes are the ciphertext
        let ciphertext = buf.to_vec();

        Ok(Packet {
            message_type,
            session_id,
            counter,
            ciphertext,
        })
    }
}

// ============================================
// Convenience Functions
// ============================================

/// Encodes an Offer to bytes.
#[must_use]
pub fn encode_offer(msg: &Offer) -> BytesMut {
    let mut buf = BytesMut::with_capacity(OFFER_SIZE);
    ProtocolCodec.encode(msg, &mut buf);
    buf
}

/// Decodes an Offer from bytes.
///
/// # Errors
/// See [`Codec::decode`].
pub fn decode_offer(buf: &[u8]) -> Result<Offer> {
    let mut bytes = Bytes::copy_from_slice(buf);
    ProtocolCodec.decode(&mut bytes)
}

/// Encodes an Ack to bytes.
#[must_use]
pub fn encode_ack(msg: &Ack) -> BytesMut {
    let mut buf = BytesMut::with_capacity(ACK_SIZE);
    ProtocolCodec.encode(msg, &mut buf);
    buf
}

/// Decodes an Ack from bytes.
///
/// # Errors
/// See [`Codec::decode`].
pub fn decode_ack(buf: &[u8]) -> Result<Ack> {
    let mut bytes = Bytes::copy_from_slice(buf);
    ProtocolCodec.decode(&mut bytes)
}

/// Encodes a Packet to bytes.
#[must_use]
pub fn encode_packet(msg: &Packet) -> BytesMut {
    let mut buf = BytesMut::with_capacity(msg.wire_size());
    ProtocolCodec.encode(msg, &mut buf);
    buf
}

/// Decodes a Packet from bytes.
///
/// # Errors
/// See [`Codec::decode`].
pub fn decode_packet(buf: &[u8]) -> Result<Packet> {
    let mut bytes = Bytes::copy_from_slice(buf);
    ProtocolCodec.decode(&mut bytes)
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_offer() -> Offer {
        Offer {
            message_type: MessageType::Offer.as_byte(),
            version: 1,
            identity_key: [0x01u8; 32],
            ephemeral_key: [0x02u8; 32],
            timestamp: 1_700_000_000,
            signature: [0x03u8; 64],
        }
    }

    #[test]
    fn test_offer_roundtrip() {
        let original = sample_offer();
        let encoded = encode_offer(&original);
        assert_eq!(encoded.len(), OFFER_SIZE);
        assert_eq!(decode_offer(&encoded).unwrap(), original);
    }

    #[test]
    fn test_ack_roundtrip() {
        let original = Ack {
            message_type: MessageType::Ack.as_byte(),
            version: 1,
            identity_key: [0x01u8; 32],
            ephemeral_key: [0x02u8; 32],
            session_id: [0x04u8; 16],
            signature: [0x05u8; 64],
        };

        let encoded = encode_ack(&original);
        assert_eq!(encoded.len(), ACK_SIZE);
        assert_eq!(decode_ack(&encoded).unwrap(), original);
    }

    #[test]
    fn test_packet_roundtrip() {
        let original = Packet::new(MessageType::Close, [0x01u8; 16], 42, vec![0x02u8; 16]);
        let encoded = encode_packet(&original);
        assert_eq!(encoded[0], 0x04);
        assert_eq!(decode_packet(&encoded).unwrap(), original);
    }

    #[test]
    fn test_peek_message_type() {
        assert_eq!(
            ProtocolCodec::peek_message_type(&[0x02u8; 146]).unwrap(),
            MessageType::Ack
        );
        assert!(matches!(
            ProtocolCodec::peek_message_type(&[0xFFu8; 10]),
            Err(CoreError::UnknownMessageType(0xFF))
        ));
        assert!(ProtocolCodec::peek_message_type(&[]).is_err());
    }

    #[test]
    fn test_decode_wrong_message_type() {
        let ack_bytes = [0x02u8; OFFER_SIZE];
        assert!(decode_offer(&ack_bytes).is_err());

        let offer_as_packet = encode_offer(&sample_offer());
        assert!(decode_packet(&offer_as_packet).is_err());
    }

    #[test]
    fn test_decode_length_checks() {
        assert!(matches!(
            decode_offer(&[0x01u8; 50]),
            Err(CoreError::MessageTooShort { .. })
        ));

        let mut long = encode_offer(&sample_offer()).to_vec();
        long.push(0);
        assert!(matches!(
            decode_offer(&long),
            Err(CoreError::MalformedMessage { .. })
        ));

        // Header without a tag
        assert!(decode_packet(&[0x03u8; PACKET_HEADER_SIZE]).is_err());
    }

    #[test]
    fn test_timestamp_encoding() {
        let mut offer = sample_offer();
        offer.timestamp = 0x0102_0304_0506_0708;
        let encoded = encode_offer(&offer);

        // Timestamp is at offset 1 + 1 + 32 + 32 = 66
        assert_eq!(&encoded[66..74], &[0x08, 0x07, 0x06, 0x05, 0x04, 0x03, 0x02, 0x01]);
    }
}
