// ============================================
// File: crates/palaver-agent/src/orchestrator.rs
// ============================================
//! # Session Orchestrator
//!
//! ## Creation Reason
//! Routes every chat line through the right peer session: parses it,
//! reassembles split protocol messages, drives the cryptographic session
//! and decides what goes back onto the transport.
//!
//! ## Main Functionality
//! - `Orchestrator`: the four host operations plus `send_line`
//! - `Outcome`: what an operation produced
//! - `Verification`: key material surfaced for fingerprint comparison
//!
//! ## Receive Pipeline
//! ```text
//! raw line
//!    │ LineParser::parse ─────────────► MalformedLine / UnresolvableSender
//!    ▼
//! FragmentReassembler ────────────────► Buffered (no output)
//!    │
//!    ├── untagged ────────────────────► PassThrough (display original)
//!    ▼
//! session for sender?
//!    ├── no  → acknowledge ───────────► Acknowledged (+ Ack, + keys)
//!    └── yes → receive
//!                ├── Established ─────► Established (+ keys)
//!                ├── Closed ──────────► Closed (entry removed)
//!                ├── Data ────────────► Decrypted (display plaintext line)
//!                └── Pending ─────────► Pending
//! ```
//!
//! Send over a session returns the ciphertext line plus a local echo of
//! the plaintext in `display`, since the host never shows what went out.
//!
//! ## ⚠️ Important Note for Next Developer
//! - One mutex guards registry and reassembler; every operation holds it
//!   from start to finish, so operations never interleave
//! - Failures happen before any registry mutation, except Stop, whose
//!   teardown is unconditional
//! - Crypto calls are synchronous; nothing here awaits while locked
//!
//! ## Last Modified
//! v0.1.0 - Initial orchestrator

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use palaver_common::Nickname;
use palaver_core::{
    is_tagged, DefaultSessionFactory, Fingerprint, IdentityKeyPair, IdentityPublicKey, Received,
    SessionFactory,
};
use palaver_transport::{InboundLine, LineParser, OutboundLine};

use crate::config::AgentConfig;
use crate::error::{AgentError, Result};
use crate::services::{
    FragmentLimits, FragmentReassembler, PeerSession, SessionRegistry, SessionState,
};

// ============================================
// Outcome
// ============================================

/// What an operation did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Disposition {
    /// Start sent an Offer.
    Offered,
    /// A peer's Offer was answered.
    Acknowledged,
    /// The handshake completed locally.
    Established,
    /// The session was torn down.
    Closed,
    /// An inbound message was decrypted.
    Decrypted,
    /// Outbound text was encrypted.
    Encrypted,
    /// A partial protocol message was buffered.
    Buffered,
    /// Not protocol traffic, or no session to protect it.
    PassThrough,
    /// A protocol step with nothing to surface.
    Pending,
}

/// Key material to compare out-of-band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verification {
    /// The process identity.
    pub local: IdentityPublicKey,
    /// The peer identity verified during the handshake.
    pub peer: IdentityPublicKey,
}

impl Verification {
    /// Fingerprint of the local identity.
    #[must_use]
    pub fn local_fingerprint(&self) -> Fingerprint {
        self.local.fingerprint()
    }

    /// Fingerprint of the peer identity.
    #[must_use]
    pub fn peer_fingerprint(&self) -> Fingerprint {
        self.peer.fingerprint()
    }
}

/// Result of one orchestrator operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    /// What happened.
    pub disposition: Disposition,
    /// Nickname (or channel) the operation concerned.
    pub peer: String,
    /// Line to hand to the transport.
    pub outbound: Option<OutboundLine>,
    /// Line to show the user as if it had arrived in the clear.
    pub display: Option<String>,
    /// Keys to surface for fingerprint comparison.
    pub verification: Option<Verification>,
}

impl Outcome {
    fn new(disposition: Disposition, peer: impl Into<String>) -> Self {
        Self {
            disposition,
            peer: peer.into(),
            outbound: None,
            display: None,
            verification: None,
        }
    }

    fn with_outbound(mut self, line: OutboundLine) -> Self {
        self.outbound = Some(line);
        self
    }

    fn with_display(mut self, line: impl Into<String>) -> Self {
        self.display = Some(line.into());
        self
    }

    fn with_verification(mut self, verification: Verification) -> Self {
        self.verification = Some(verification);
        self
    }
}

// ============================================
// Orchestrator
// ============================================

#[derive(Debug)]
struct AgentState {
    sessions: SessionRegistry,
    fragments: FragmentReassembler,
}

/// Drives per-peer sessions from chat lines.
pub struct Orchestrator {
    factory: Arc<dyn SessionFactory>,
    parser: LineParser,
    state: Mutex<AgentState>,
}

impl Orchestrator {
    /// Creates an orchestrator over `factory`.
    pub fn new(factory: Arc<dyn SessionFactory>, parser: LineParser, limits: FragmentLimits) -> Self {
        Self {
            factory,
            parser,
            state: Mutex::new(AgentState {
                sessions: SessionRegistry::new(),
                fragments: FragmentReassembler::new(limits),
            }),
        }
    }

    /// Creates an orchestrator using the default session primitive.
    #[must_use]
    pub fn from_config(config: &AgentConfig, identity: Arc<IdentityKeyPair>) -> Self {
        let factory = DefaultSessionFactory::with_timestamp_skew(
            identity,
            config.handshake.max_timestamp_skew_secs,
        );
        Self::new(
            Arc::new(factory),
            LineParser::new(config.transport.command.clone()),
            config.fragments.limits(),
        )
    }

    // ========================================
    // Operations
    // ========================================

    /// Starts a handshake with `nick`, discarding any existing session.
    ///
    /// # Errors
    /// - `InvalidNickname` if `nick` is not a valid nickname
    /// - `Handshake` if no Offer could be produced; no entry remains
    pub fn start(&self, nick: &str) -> Result<Outcome> {
        let nickname = Nickname::new(nick).map_err(|e| AgentError::invalid_nickname(nick, &e))?;
        let mut state = self.state.lock();

        if let Some(previous) = state.sessions.remove(nick) {
            warn!(nick = %nickname, state = %previous.state(), "Restarting session, previous state discarded");
        }

        let mut crypto = self.factory.create();
        let offer = crypto
            .offer()
            .map_err(|e| AgentError::handshake(nick, e))?;

        state
            .sessions
            .insert(PeerSession::new(nickname, crypto, SessionState::Offered));
        info!(nick = %nick, "Offer sent");

        Ok(Outcome::new(Disposition::Offered, nick).with_outbound(self.parser.outbound(nick, offer)))
    }

    /// Handles one raw inbound transport line.
    ///
    /// # Errors
    /// - `MalformedLine` / `UnresolvableSender` on parse failure, no mutation
    /// - `FragmentOverflow` if a partial grows past its limit
    /// - `Handshake` if an unsolicited message is not an acceptable Offer
    /// - `Session` if the existing session rejects the message; the session
    ///   is left in place
    pub fn receive(&self, raw: &str) -> Result<Outcome> {
        let inbound = self.parser.parse(raw)?;
        let nick = inbound.sender.clone();
        let mut state = self.state.lock();

        let Some(message) = state.fragments.accumulate(&nick, &inbound.text)? else {
            return Ok(Outcome::new(Disposition::Buffered, nick.as_str()));
        };

        if !is_tagged(&message) {
            debug!(nick = %nick, "Passing through plain line");
            let original = raw.trim_end_matches(['\r', '\n']);
            return Ok(Outcome::new(Disposition::PassThrough, nick.as_str()).with_display(original));
        }

        if let Some(session) = state.sessions.get_mut(nick.as_str()) {
            let outcome = self.advance(session, &inbound, &message)?;
            if outcome.disposition == Disposition::Closed {
                state.sessions.remove(nick.as_str());
                state.fragments.discard(nick.as_str());
            }
            return Ok(outcome);
        }

        let (session, outcome) = self.accept(nick, &message)?;
        state.sessions.insert(session);
        Ok(outcome)
    }

    /// Answers an unsolicited message from `nick` as a handshake Offer.
    fn accept(&self, nick: Nickname, message: &str) -> Result<(PeerSession, Outcome)> {
        let mut crypto = self.factory.create();
        let acknowledged = crypto.acknowledge(message).map_err(|e| {
            if e.is_suspicious() {
                warn!(nick = %nick, error = %e, "Rejected offer");
            }
            AgentError::handshake(nick.as_str(), e)
        })?;

        let peer = acknowledged.peer_key;
        info!(nick = %nick, peer = %peer.fingerprint(), "Offer acknowledged");

        let outcome = Outcome::new(Disposition::Acknowledged, nick.as_str())
            .with_outbound(self.parser.outbound(nick.as_str(), acknowledged.reply))
            .with_verification(self.verification(peer));
        let mut session = PeerSession::new(nick, crypto, SessionState::AwaitingEstablish);
        session.record_peer_key(peer);
        Ok((session, outcome))
    }

    /// Feeds a complete message to an existing session.
    fn advance(
        &self,
        session: &mut PeerSession,
        inbound: &InboundLine,
        message: &str,
    ) -> Result<Outcome> {
        let nick = inbound.sender.as_str();
        let current = session.state();
        let received = session.crypto_mut().receive(message).map_err(|e| {
            if e.is_suspicious() {
                warn!(nick = %nick, state = %current, error = %e, "Rejected message");
            }
            AgentError::session(nick, e)
        })?;

        match received {
            Received::Established { peer_key } => {
                session.record_peer_key(peer_key);
                session.set_state(SessionState::Established);
                let peer = session.verified_peer_key().unwrap_or(peer_key);
                info!(nick = %nick, peer = %peer.fingerprint(), "Session established");
                Ok(Outcome::new(Disposition::Established, nick).with_verification(self.verification(peer)))
            }
            Received::Closed => {
                info!(nick = %nick, "Peer closed session");
                Ok(Outcome::new(Disposition::Closed, nick))
            }
            Received::Data(plaintext) => {
                session.set_state(SessionState::Established);
                let text = String::from_utf8_lossy(&plaintext);
                debug!(nick = %nick, len = plaintext.len(), "Decrypted message");
                Ok(Outcome::new(Disposition::Decrypted, nick)
                    .with_display(inbound.with_text(text).to_wire()))
            }
            Received::Pending => Ok(Outcome::new(Disposition::Pending, nick)),
        }
    }

    /// Prepares outbound application text for `target`.
    ///
    /// Text that is already tagged, or addressed to a peer without a
    /// session, is passed through unmodified.
    ///
    /// # Errors
    /// `Session` if the session cannot encrypt (e.g. still `Offered`).
    pub fn send(&self, target: &str, text: &str) -> Result<Outcome> {
        if is_tagged(text) {
            return Ok(Outcome::new(Disposition::PassThrough, target)
                .with_outbound(self.parser.outbound(target, text)));
        }

        let mut state = self.state.lock();
        let Some(session) = state.sessions.get_mut(target) else {
            debug!(target_nick = %target, "No session, sending in the clear");
            return Ok(Outcome::new(Disposition::PassThrough, target)
                .with_outbound(self.parser.outbound(target, text)));
        };

        let sealed = session
            .crypto_mut()
            .send(text.as_bytes())
            .map_err(|e| AgentError::session(target, e))?;
        debug!(target_nick = %target, len = text.len(), "Encrypted message");

        // Echo what the user typed, not the ciphertext
        Ok(Outcome::new(Disposition::Encrypted, target)
            .with_outbound(self.parser.outbound(target, sealed))
            .with_display(self.parser.outbound(target, text).to_wire()))
    }

    /// Routes a full outbound `<COMMAND> <target> :<text>` line through
    /// [`send`](Self::send).
    ///
    /// # Errors
    /// `MalformedLine` if the line cannot be parsed, otherwise as `send`.
    pub fn send_line(&self, raw: &str) -> Result<Outcome> {
        let line = self.parser.parse_outbound(raw)?;
        self.send(&line.target, &line.text)
    }

    /// Ends the session with `nick`.
    ///
    /// The local entry is removed whether or not a Close notification
    /// could be produced.
    ///
    /// # Errors
    /// - `NoSuchSession` if there is no session, no mutation
    /// - `Session` if the Close could not be produced; teardown still happened
    pub fn stop(&self, nick: &str) -> Result<Outcome> {
        let mut state = self.state.lock();
        let session = state
            .sessions
            .remove(nick)
            .ok_or_else(|| AgentError::no_such_session(nick))?;
        state.fragments.discard(nick);

        let mut crypto = session.into_crypto();
        let close = crypto.close().map_err(|e| {
            warn!(nick = %nick, error = %e, "Session torn down without notifying peer");
            AgentError::session(nick, e)
        })?;
        info!(nick = %nick, "Session stopped");

        Ok(Outcome::new(Disposition::Closed, nick).with_outbound(self.parser.outbound(nick, close)))
    }

    // ========================================
    // Inspection
    // ========================================

    /// Returns the state of the session with `nick`.
    #[must_use]
    pub fn session_state(&self, nick: &str) -> Option<SessionState> {
        self.state.lock().sessions.state_of(nick)
    }

    /// Returns the verified key of the peer `nick`.
    #[must_use]
    pub fn verified_peer_key(&self, nick: &str) -> Option<IdentityPublicKey> {
        self.state
            .lock()
            .sessions
            .get(nick)
            .and_then(PeerSession::verified_peer_key)
    }

    /// Returns `true` if a partial message from `nick` is buffered.
    #[must_use]
    pub fn has_pending_fragment(&self, nick: &str) -> bool {
        self.state.lock().fragments.contains(nick)
    }

    /// Returns the number of sessions.
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.state.lock().sessions.count()
    }

    /// Returns every peer with a session and its state.
    #[must_use]
    pub fn sessions(&self) -> Vec<(Nickname, SessionState)> {
        let state = self.state.lock();
        state
            .sessions
            .nicknames()
            .into_iter()
            .filter_map(|n| state.sessions.state_of(n.as_str()).map(|s| (n, s)))
            .collect()
    }

    /// Drops expired partial messages, returning how many were removed.
    pub fn prune_expired_fragments(&self) -> usize {
        self.state.lock().fragments.prune_expired()
    }

    /// Returns the process identity key.
    #[must_use]
    pub fn local_key(&self) -> IdentityPublicKey {
        self.factory.local_key()
    }

    /// Returns the line parser in use.
    #[must_use]
    pub fn parser(&self) -> &LineParser {
        &self.parser
    }

    fn verification(&self, peer: IdentityPublicKey) -> Verification {
        Verification {
            local: self.factory.local_key(),
            peer,
        }
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Orchestrator")
            .field("local", &self.factory.local_key().fingerprint().to_string())
            .field("command", &self.parser.command())
            .field("sessions", &state.sessions.count())
            .field("pending_fragments", &state.fragments.len())
            .finish()
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    fn orchestrator() -> Orchestrator {
        Orchestrator::from_config(&AgentConfig::default(), Arc::new(IdentityKeyPair::generate()))
    }

    /// Renders an outbound line as the peer would receive it from `from`.
    fn deliver(line: &OutboundLine, from: &str) -> String {
        format!(":{from}!{from}@host {} {} :{}", line.command, line.target, line.text)
    }

    #[test]
    fn test_start_emits_offer() {
        let alice = orchestrator();
        let outcome = alice.start("bob").unwrap();

        assert_eq!(outcome.disposition, Disposition::Offered);
        let line = outcome.outbound.unwrap();
        assert_eq!(line.target, "bob");
        assert!(palaver_core::is_complete(&line.text));
        assert_eq!(alice.session_state("bob"), Some(SessionState::Offered));
    }

    #[test]
    fn test_start_rejects_invalid_nickname() {
        let alice = orchestrator();
        let err = alice.start("not a nick").unwrap_err();
        assert!(matches!(err, AgentError::InvalidNickname { .. }));
        assert_eq!(alice.session_count(), 0);
    }

    #[test]
    fn test_start_twice_resets() {
        let alice = orchestrator();
        let first = alice.start("bob").unwrap().outbound.unwrap();
        let second = alice.start("bob").unwrap().outbound.unwrap();
        assert_ne!(first.text, second.text);
        assert_eq!(alice.session_count(), 1);
    }

    #[test]
    fn test_send_without_session_passes_through() {
        let alice = orchestrator();
        let outcome = alice.send("bob", "hello").unwrap();
        assert_eq!(outcome.disposition, Disposition::PassThrough);
        assert_eq!(outcome.outbound.unwrap().text, "hello");
    }

    #[test]
    fn test_send_tagged_text_never_wrapped() {
        let alice = orchestrator();
        alice.start("bob").unwrap();
        let outcome = alice.send("bob", "?PLV:AAAA.").unwrap();
        assert_eq!(outcome.disposition, Disposition::PassThrough);
        assert_eq!(outcome.outbound.unwrap().text, "?PLV:AAAA.");
    }

    #[test]
    fn test_send_while_offered_fails_without_mutation() {
        let alice = orchestrator();
        alice.start("bob").unwrap();
        let err = alice.send("bob", "too early").unwrap_err();
        assert!(matches!(err, AgentError::Session { .. }));
        assert_eq!(alice.session_state("bob"), Some(SessionState::Offered));
    }

    #[test]
    fn test_handshake_and_message() {
        let alice = orchestrator();
        let bob = orchestrator();

        let offer = alice.start("bob").unwrap().outbound.unwrap();
        let acked = bob.receive(&deliver(&offer, "alice")).unwrap();
        assert_eq!(acked.disposition, Disposition::Acknowledged);
        assert_eq!(bob.session_state("alice"), Some(SessionState::AwaitingEstablish));

        let ack = acked.outbound.unwrap();
        let established = alice.receive(&deliver(&ack, "bob")).unwrap();
        assert_eq!(established.disposition, Disposition::Established);
        assert!(established.outbound.is_none());

        let sealed = alice.send("bob", "hello").unwrap().outbound.unwrap();
        let opened = bob.receive(&deliver(&sealed, "alice")).unwrap();
        assert_eq!(opened.disposition, Disposition::Decrypted);
        assert_eq!(
            opened.display.as_deref(),
            Some(":alice!alice@host PRIVMSG bob :hello")
        );
        assert_eq!(bob.session_state("alice"), Some(SessionState::Established));
    }

    #[test]
    fn test_receive_plain_line_passes_through() {
        let bob = orchestrator();
        let raw = ":alice!a@host PRIVMSG bob :just chatting.\r\n";
        let outcome = bob.receive(raw).unwrap();
        assert_eq!(outcome.disposition, Disposition::PassThrough);
        assert_eq!(
            outcome.display.as_deref(),
            Some(":alice!a@host PRIVMSG bob :just chatting.")
        );
        assert_eq!(bob.session_count(), 0);
    }

    #[test]
    fn test_receive_garbage_offer_is_handshake_error() {
        let bob = orchestrator();
        let err = bob.receive(":alice!a@host PRIVMSG bob :?PLV:AAAA.").unwrap_err();
        assert!(matches!(err, AgentError::Handshake { .. }));
        assert_eq!(bob.session_count(), 0);
    }

    #[test]
    fn test_parse_errors_mutate_nothing() {
        let bob = orchestrator();
        assert!(bob.receive("PING :server").unwrap_err().is_parse_error());
        assert!(matches!(
            bob.receive(":irc.example.net PRIVMSG bob :?PLV:AAAA").unwrap_err(),
            AgentError::UnresolvableSender { .. }
        ));
        assert_eq!(bob.session_count(), 0);
        assert!(!bob.has_pending_fragment("irc.example.net"));
    }

    #[test]
    fn test_stop_without_session() {
        let alice = orchestrator();
        let err = alice.stop("ghost").unwrap_err();
        assert!(matches!(err, AgentError::NoSuchSession { .. }));
    }

    #[test]
    fn test_stop_offered_session_still_tears_down() {
        let alice = orchestrator();
        alice.start("bob").unwrap();
        let err = alice.stop("bob").unwrap_err();
        assert!(matches!(err, AgentError::Session { .. }));
        assert_eq!(alice.session_state("bob"), None);
    }

    #[test]
    fn test_send_line_routes_through_send() {
        let alice = orchestrator();
        let outcome = alice.send_line("PRIVMSG #rust :hi all").unwrap();
        let line = outcome.outbound.unwrap();
        assert_eq!(line.target, "#rust");
        assert_eq!(line.text, "hi all");
        assert!(alice.send_line("JOIN #rust").unwrap_err().is_parse_error());
    }
}
