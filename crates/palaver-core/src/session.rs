// ============================================
// File: crates/palaver-core/src/session.rs
// ============================================
//! # Cryptographic Session Primitive
//!
//! ## Creation Reason
//! The orchestration layer drives an opaque handshake-then-encrypt
//! session through five calls. This module defines that capability as a
//! trait and ships the default implementation built from the crypto and
//! protocol modules.
//!
//! ## Main Functionality
//! - `CryptoSession`: offer / acknowledge / receive / send / close
//! - `SessionFactory`: creates sessions bound to the process identity
//! - `DefaultCryptoSession`: Ed25519 + X25519 + ChaCha20-Poly1305
//!
//! ## Session Phases
//! ```text
//!            offer()                  receive(Ack)
//!  ┌───────┐ ───────► ┌─────────┐ ─────────────────► ┌─────────────┐
//!  │ Fresh │          │ Offered │                    │ Established │
//!  └───────┘ ─────────────────────────────────────►  └──────┬──────┘
//!            acknowledge(Offer)                             │
//!                                       close() / receive(Close)
//!                                                           ▼
//!                                                     ┌────────┐
//!                                                     │ Closed │
//!                                                     └────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Every input and output is an armored `?PLV:...` string
//! - Verified peer keys are returned from `acknowledge` and from the
//!   `Established` outcome, there is no callback
//! - A failed call leaves the phase unchanged except where noted
//!
//! ## Last Modified
//! v0.1.0 - Initial session primitive

use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use palaver_common::types::SessionId;

use crate::crypto::handshake::{DefaultHandshakeCrypto, HandshakeCrypto};
use crate::crypto::keys::{EphemeralKeyPair, IdentityKeyPair, IdentityPublicKey, SessionKey};
use crate::crypto::replay::ReplayWindow;
use crate::crypto::transport::{DefaultTransportCrypto, TransportCrypto};
use crate::error::{CoreError, Result};
use crate::protocol::codec::{decode_ack, decode_offer, decode_packet, encode_ack, encode_offer, encode_packet};
use crate::protocol::frame::{armor, dearmor};
use crate::protocol::messages::{MessageType, Offer, Packet};
use crate::protocol::ProtocolCodec;

// ============================================
// Outcomes
// ============================================

/// Successful answer to a peer's Offer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Acknowledged {
    /// Armored Ack to send back to the offerer.
    pub reply: String,
    /// The offerer's verified identity key.
    pub peer_key: IdentityPublicKey,
}

/// Outcome of [`CryptoSession::receive`]; exactly one per call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Received {
    /// The handshake completed on this side.
    Established {
        /// The peer's verified identity key.
        peer_key: IdentityPublicKey,
    },
    /// The peer tore the session down.
    Closed,
    /// Decrypted application payload.
    Data(Vec<u8>),
    /// A protocol step with nothing to surface.
    Pending,
}

// ============================================
// CryptoSession Trait
// ============================================

/// One end of an encrypted conversation with a single peer.
pub trait CryptoSession: Send {
    /// Starts a handshake, returning the armored Offer.
    ///
    /// # Errors
    /// `InvalidState` unless the session is fresh.
    fn offer(&mut self) -> Result<String>;

    /// Answers a peer's armored Offer.
    ///
    /// # Errors
    /// Framing, version, timestamp or signature failures.
    fn acknowledge(&mut self, message: &str) -> Result<Acknowledged>;

    /// Advances the session with an armored inbound message.
    ///
    /// # Errors
    /// Framing, authentication, replay or state failures.
    fn receive(&mut self, message: &str) -> Result<Received>;

    /// Encrypts application data, returning the armored Data message.
    ///
    /// # Errors
    /// `InvalidState` before keys exist.
    fn send(&mut self, plaintext: &[u8]) -> Result<String>;

    /// Produces the armored Close notification and ends the session.
    ///
    /// # Errors
    /// `InvalidState` unless established.
    fn close(&mut self) -> Result<String>;
}

/// Creates sessions bound to the process identity.
pub trait SessionFactory: Send + Sync {
    /// Creates a fresh session.
    fn create(&self) -> Box<dyn CryptoSession>;

    /// Returns the process identity key surfaced for verification.
    fn local_key(&self) -> IdentityPublicKey;
}

// ============================================
// DefaultSessionFactory
// ============================================

/// Factory for [`DefaultCryptoSession`].
#[derive(Clone)]
pub struct DefaultSessionFactory {
    handshake: Arc<DefaultHandshakeCrypto>,
}

impl DefaultSessionFactory {
    /// Creates a factory around the process identity.
    #[must_use]
    pub fn new(identity: Arc<IdentityKeyPair>) -> Self {
        Self {
            handshake: Arc::new(DefaultHandshakeCrypto::new(identity)),
        }
    }

    /// Creates a factory with a custom offer timestamp tolerance.
    #[must_use]
    pub fn with_timestamp_skew(identity: Arc<IdentityKeyPair>, seconds: u64) -> Self {
        Self {
            handshake: Arc::new(DefaultHandshakeCrypto::new(identity).with_timestamp_skew(seconds)),
        }
    }
}

impl fmt::Debug for DefaultSessionFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultSessionFactory")
            .field("handshake", &self.handshake)
            .finish()
    }
}

impl SessionFactory for DefaultSessionFactory {
    fn create(&self) -> Box<dyn CryptoSession> {
        Box::new(DefaultCryptoSession::new(Arc::clone(&self.handshake)))
    }

    fn local_key(&self) -> IdentityPublicKey {
        self.handshake.public_key()
    }
}

// ============================================
// DefaultCryptoSession
// ============================================

/// Keys and counters of an established session.
struct Channel {
    session_id: SessionId,
    tx_key: SessionKey,
    rx_key: SessionKey,
    tx_counter: u64,
    replay: ReplayWindow,
    peer: IdentityPublicKey,
}

enum Phase {
    Fresh,
    Offered {
        ephemeral: EphemeralKeyPair,
        offer: Offer,
    },
    Established(Box<Channel>),
    Closed,
}

impl Phase {
    const fn name(&self) -> &'static str {
        match self {
            Self::Fresh => "fresh",
            Self::Offered { .. } => "offered",
            Self::Established(_) => "established",
            Self::Closed => "closed",
        }
    }
}

/// Default session: signed X25519 handshake, ChaCha20-Poly1305 transport.
pub struct DefaultCryptoSession {
    handshake: Arc<DefaultHandshakeCrypto>,
    transport: DefaultTransportCrypto,
    phase: Phase,
}

impl DefaultCryptoSession {
    /// Creates a fresh session.
    #[must_use]
    pub fn new(handshake: Arc<DefaultHandshakeCrypto>) -> Self {
        Self {
            handshake,
            transport: DefaultTransportCrypto::new(),
            phase: Phase::Fresh,
        }
    }

    /// Returns `true` once keys are available.
    #[must_use]
    pub const fn is_established(&self) -> bool {
        matches!(self.phase, Phase::Established(_))
    }

    /// Returns the verified peer key, if the handshake completed.
    #[must_use]
    pub fn peer_key(&self) -> Option<IdentityPublicKey> {
        match &self.phase {
            Phase::Established(channel) => Some(channel.peer),
            _ => None,
        }
    }

    fn channel_mut(&mut self, operation: &str) -> Result<&mut Channel> {
        match &mut self.phase {
            Phase::Established(channel) => Ok(channel),
            other => {
                debug!(phase = other.name(), operation, "Session not established");
                Err(CoreError::invalid_state(operation, "established session"))
            }
        }
    }

    fn seal(&mut self, message_type: MessageType, plaintext: &[u8]) -> Result<String> {
        let transport = self.transport;
        let channel = self.channel_mut("send")?;

        let counter = channel
            .tx_counter
            .checked_add(1)
            .ok_or_else(|| CoreError::Encryption {
                context: "message counter exhausted".into(),
            })?;

        let session_id = *channel.session_id.as_bytes();
        let aad = Packet::associated_data(message_type, &session_id);
        let ciphertext = transport.encrypt(&channel.tx_key, counter, &aad, plaintext)?;
        channel.tx_counter = counter;

        let packet = Packet::new(message_type, session_id, counter, ciphertext);
        Ok(armor(&encode_packet(&packet)))
    }

    fn open(&mut self, bytes: &[u8]) -> Result<Received> {
        let packet = decode_packet(bytes)?;
        let transport = self.transport;
        let channel = self.channel_mut("receive packet")?;

        if packet.session_id != *channel.session_id.as_bytes() {
            return Err(CoreError::SessionMismatch);
        }

        let aad = Packet::associated_data(packet.message_type, &packet.session_id);
        let plaintext = transport.decrypt(&channel.rx_key, packet.counter, &aad, &packet.ciphertext)?;
        channel.replay.check_and_record(packet.counter)?;

        match packet.message_type {
            MessageType::Close => {
                self.phase = Phase::Closed;
                Ok(Received::Closed)
            }
            _ => Ok(Received::Data(plaintext)),
        }
    }

    fn complete(&mut self, bytes: &[u8]) -> Result<Received> {
        let ack = decode_ack(bytes)?;

        let peer = match &self.phase {
            Phase::Offered { offer, .. } => self.handshake.verify_ack(&ack, offer)?,
            other => {
                return Err(CoreError::invalid_state(
                    format!("receive ack while {}", other.name()),
                    "offered session",
                ))
            }
        };

        // The ephemeral is single-use; a failure past this point ends the session.
        let Phase::Offered { ephemeral, .. } = std::mem::replace(&mut self.phase, Phase::Closed) else {
            return Err(CoreError::invalid_state("receive ack", "offered session"));
        };

        let keys = self.handshake.finish(ephemeral, &ack)?;
        let (tx_key, rx_key) = keys.for_role(true);
        let session_id = SessionId::from_bytes(&ack.session_id)
            .ok_or_else(|| CoreError::malformed("session id"))?;

        self.phase = Phase::Established(Box::new(Channel {
            session_id,
            tx_key,
            rx_key,
            tx_counter: 0,
            replay: ReplayWindow::new(),
            peer,
        }));

        Ok(Received::Established { peer_key: peer })
    }
}

impl fmt::Debug for DefaultCryptoSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultCryptoSession")
            .field("phase", &self.phase.name())
            .field("peer", &self.peer_key())
            .finish_non_exhaustive()
    }
}

impl CryptoSession for DefaultCryptoSession {
    fn offer(&mut self) -> Result<String> {
        if !matches!(self.phase, Phase::Fresh) {
            return Err(CoreError::invalid_state("offer", "fresh session"));
        }

        let ephemeral = EphemeralKeyPair::generate();
        let offer = self.handshake.create_offer(ephemeral.public_key_bytes());
        let armored = armor(&encode_offer(&offer));

        self.phase = Phase::Offered { ephemeral, offer };
        Ok(armored)
    }

    fn acknowledge(&mut self, message: &str) -> Result<Acknowledged> {
        if !matches!(self.phase, Phase::Fresh) {
            return Err(CoreError::invalid_state("acknowledge", "fresh session"));
        }

        let bytes = dearmor(message)?;
        let message_type = ProtocolCodec::peek_message_type(&bytes)?;
        if message_type != MessageType::Offer {
            return Err(CoreError::malformed(format!(
                "expected an offer to open a session, got {message_type:?}"
            )));
        }

        let offer = decode_offer(&bytes)?;
        let session_id = SessionId::generate();
        let accepted = self.handshake.accept_offer(&offer, session_id.clone())?;
        let (tx_key, rx_key) = accepted.keys.for_role(false);

        self.phase = Phase::Established(Box::new(Channel {
            session_id,
            tx_key,
            rx_key,
            tx_counter: 0,
            replay: ReplayWindow::new(),
            peer: accepted.peer_key,
        }));

        Ok(Acknowledged {
            reply: armor(&encode_ack(&accepted.ack)),
            peer_key: accepted.peer_key,
        })
    }

    fn receive(&mut self, message: &str) -> Result<Received> {
        let bytes = dearmor(message)?;

        match ProtocolCodec::peek_message_type(&bytes)? {
            MessageType::Offer => Err(CoreError::invalid_state(
                "receive offer on an existing session",
                "fresh session",
            )),
            MessageType::Ack => self.complete(&bytes),
            MessageType::Data | MessageType::Close => {
                let result = self.open(&bytes);
                if let Err(ref e) = result {
                    if e.is_suspicious() {
                        warn!(error = %e, "Rejected inbound packet");
                    }
                }
                result
            }
        }
    }

    fn send(&mut self, plaintext: &[u8]) -> Result<String> {
        self.seal(MessageType::Data, plaintext)
    }

    fn close(&mut self) -> Result<String> {
        let armored = self.seal(MessageType::Close, &[])?;
        self.phase = Phase::Closed;
        Ok(armored)
    }
}

// ============================================
// Tests
// ============================================
