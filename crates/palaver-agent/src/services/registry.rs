// ============================================
// File: crates/palaver-agent/src/services/registry.rs
// ============================================
//! # Session Registry
//!
//! ## Creation Reason
//! Holds one cryptographic session per peer nickname together with the
//! state the orchestrator tracks for it.
//!
//! ## Main Functionality
//! - `PeerSession`: Session data structure
//! - `SessionRegistry`: nickname → session map
//! - `SessionState`: Session state machine
//!
//! ## Session Lifecycle
//! ```text
//!          Start                         peer's Ack
//! (none) ─────────► Offered ─────────────────────────┐
//!   │                                                ▼
//!   │   peer's Offer                  first Data  ┌─────────────┐
//!   └──────────────► AwaitingEstablish ──────────►│ Established │
//!                                                 └──────┬──────┘
//!                                                        │ Stop / peer Close
//!                                                        ▼
//!                                                     (none)
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - The registry has no lock of its own; the orchestrator guards it
//! - Removing an entry drops the crypto session and its key material
//!
//! ## Last Modified
//! v0.1.0 - Initial registry

use std::collections::HashMap;
use std::fmt;

use tracing::{info, warn};

use palaver_common::Nickname;
use palaver_core::{CryptoSession, IdentityPublicKey};

// ============================================
// SessionState
// ============================================

/// Per-peer session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// We sent an Offer and wait for the Ack.
    Offered,
    /// We answered the peer's Offer; nothing authenticated has arrived yet.
    AwaitingEstablish,
    /// Both sides hold keys and traffic has been authenticated.
    Established,
}

impl SessionState {
    /// Returns the state name used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Offered => "offered",
            Self::AwaitingEstablish => "awaiting-establish",
            Self::Established => "established",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================
// PeerSession
// ============================================

/// One peer's encrypted conversation.
pub struct PeerSession {
    nickname: Nickname,
    crypto: Box<dyn CryptoSession>,
    state: SessionState,
    verified_peer_key: Option<IdentityPublicKey>,
}

impl PeerSession {
    /// Wraps a crypto session for `nickname`.
    #[must_use]
    pub fn new(nickname: Nickname, crypto: Box<dyn CryptoSession>, state: SessionState) -> Self {
        Self {
            nickname,
            crypto,
            state,
            verified_peer_key: None,
        }
    }

    /// Returns the peer's nickname.
    #[must_use]
    pub fn nickname(&self) -> &Nickname {
        &self.nickname
    }

    /// Returns the handshake phase.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Moves the entry to `state`, logging real transitions.
    pub fn set_state(&mut self, state: SessionState) {
        if self.state != state {
            info!(nick = %self.nickname, from = %self.state, to = %state, "Session state changed");
            self.state = state;
        }
    }

    /// Returns the peer key verified during the handshake, if any.
    #[must_use]
    pub fn verified_peer_key(&self) -> Option<IdentityPublicKey> {
        self.verified_peer_key
    }

    /// Records the peer's verified key.
    ///
    /// The key is recorded once; a later, different key is ignored and
    /// logged.
    pub fn record_peer_key(&mut self, key: IdentityPublicKey) {
        match self.verified_peer_key {
            None => self.verified_peer_key = Some(key),
            Some(existing) if existing != key => warn!(
                nick = %self.nickname,
                recorded = %existing.fingerprint(),
                offered = %key.fingerprint(),
                "Peer key changed mid-session, keeping the first"
            ),
            Some(_) => {}
        }
    }

    /// Returns the crypto session for driving.
    pub fn crypto_mut(&mut self) -> &mut dyn CryptoSession {
        self.crypto.as_mut()
    }

    /// Consumes the entry, returning its crypto session.
    #[must_use]
    pub fn into_crypto(self) -> Box<dyn CryptoSession> {
        self.crypto
    }
}

impl fmt::Debug for PeerSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PeerSession")
            .field("nickname", &self.nickname)
            .field("state", &self.state)
            .field(
                "verified_peer_key",
                &self.verified_peer_key.map(|k| k.fingerprint().to_string()),
            )
            .finish_non_exhaustive()
    }
}

// ============================================
// SessionRegistry
// ============================================

/// Maps peer nicknames to their sessions.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: HashMap<Nickname, PeerSession>,
}

impl SessionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a session, returning the entry it replaced.
    pub fn insert(&mut self, session: PeerSession) -> Option<PeerSession> {
        info!(nick = %session.nickname, state = %session.state, "Session registered");
        self.sessions.insert(session.nickname.clone(), session)
    }

    /// Returns the session for `nick`.
    #[must_use]
    pub fn get(&self, nick: &str) -> Option<&PeerSession> {
        self.sessions.get(nick)
    }

    /// Returns the session for `nick` for driving.
    pub fn get_mut(&mut self, nick: &str) -> Option<&mut PeerSession> {
        self.sessions.get_mut(nick)
    }

    /// Removes and returns the session for `nick`.
    pub fn remove(&mut self, nick: &str) -> Option<PeerSession> {
        let removed = self.sessions.remove(nick);
        if let Some(ref session) = removed {
            info!(nick = %nick, state = %session.state, "Session removed");
        }
        removed
    }

    /// Returns `true` if `nick` has a session.
    #[must_use]
    pub fn contains(&self, nick: &str) -> bool {
        self.sessions.contains_key(nick)
    }

    /// Returns the phase of the session with `nick`.
    #[must_use]
    pub fn state_of(&self, nick: &str) -> Option<SessionState> {
        self.sessions.get(nick).map(PeerSession::state)
    }

    /// Returns the number of sessions.
    #[must_use]
    pub fn count(&self) -> usize {
        self.sessions.len()
    }

    /// Returns `true` if no session exists.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Returns the nicknames with a session, sorted.
    #[must_use]
    pub fn nicknames(&self) -> Vec<Nickname> {
        let mut nicks: Vec<_> = self.sessions.keys().cloned().collect();
        nicks.sort();
        nicks
    }
}

impl fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("sessions", &self.count())
            .finish()
    }
}

// ============================================
// Tests
// ============================================
