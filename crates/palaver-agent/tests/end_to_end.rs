// ============================================
// File: crates/palaver-agent/tests/end_to_end.rs
// ============================================
//! Two orchestrators talking through rendered transport lines.

use std::sync::Arc;

use palaver_agent::services::FragmentLimits;
use palaver_agent::{
    Agent, AgentConfig, AgentError, Disposition, HostEvent, Orchestrator, SessionState,
};
use palaver_core::{
    Acknowledged, CoreError, CryptoSession, IdentityKeyPair, IdentityPublicKey, Received,
    SessionFactory,
};
use palaver_transport::{LineParser, LineTransport, MockLineTransport, OutboundLine};

// ============================================
// Helpers
// ============================================

fn orchestrator() -> Orchestrator {
    Orchestrator::from_config(&AgentConfig::default(), Arc::new(IdentityKeyPair::generate()))
}

/// Renders an outbound line as its recipient sees it arrive from `from`.
fn deliver(line: &OutboundLine, from: &str) -> String {
    format!(":{from}!{from}@example.net {}", line.to_wire())
}

/// Completes a handshake; `alice` initiated.
fn established() -> (Orchestrator, Orchestrator) {
    let alice = orchestrator();
    let bob = orchestrator();

    let offer = alice.start("bob").unwrap().outbound.unwrap();
    let ack = bob.receive(&deliver(&offer, "alice")).unwrap().outbound.unwrap();
    alice.receive(&deliver(&ack, "bob")).unwrap();
    (alice, bob)
}

// ============================================
// Scenario
// ============================================

#[test]
fn test_two_party_scenario() {
    let alice = orchestrator();
    let bob = orchestrator();

    // A starts: one Offer addressed to B
    let started = alice.start("bob").unwrap();
    assert_eq!(started.disposition, Disposition::Offered);
    let offer = started.outbound.unwrap();
    assert_eq!(offer.target, "bob");

    // B answers in one step and surfaces both keys
    let acked = bob.receive(&deliver(&offer, "alice")).unwrap();
    assert_eq!(acked.disposition, Disposition::Acknowledged);
    assert_eq!(acked.peer, "alice");
    let ack = acked.outbound.clone().unwrap();
    assert_eq!(ack.target, "alice");
    let seen_by_bob = acked.verification.unwrap();
    assert_eq!(seen_by_bob.local, bob.local_key());
    assert_eq!(seen_by_bob.peer, alice.local_key());

    // A completes and surfaces the same pair
    let done = alice.receive(&deliver(&ack, "bob")).unwrap();
    assert_eq!(done.disposition, Disposition::Established);
    assert!(done.outbound.is_none());
    let seen_by_alice = done.verification.unwrap();
    assert_eq!(seen_by_alice.local, alice.local_key());
    assert_eq!(seen_by_alice.peer, bob.local_key());
    assert_eq!(alice.session_state("bob"), Some(SessionState::Established));
    assert_eq!(alice.verified_peer_key("bob"), Some(bob.local_key()));
    assert_eq!(bob.verified_peer_key("alice"), Some(alice.local_key()));

    // Encrypted message arrives as a normal line
    let sealed = alice.send("bob", "hello").unwrap();
    assert_eq!(sealed.disposition, Disposition::Encrypted);
    assert_eq!(sealed.display.as_deref(), Some("PRIVMSG bob :hello"));
    let sealed = sealed.outbound.unwrap();
    assert!(palaver_core::is_complete(&sealed.text));
    assert_ne!(sealed.text, "hello");

    let opened = bob.receive(&deliver(&sealed, "alice")).unwrap();
    assert_eq!(opened.disposition, Disposition::Decrypted);
    assert_eq!(
        opened.display.as_deref(),
        Some(":alice!alice@example.net PRIVMSG bob :hello")
    );
    assert!(opened.outbound.is_none());
    assert!(opened.verification.is_none());
}

#[test]
fn test_reply_in_both_directions() {
    let (alice, bob) = established();

    let reply = bob.send("alice", "hi back").unwrap().outbound.unwrap();
    let opened = alice.receive(&deliver(&reply, "bob")).unwrap();
    assert_eq!(
        opened.display.as_deref(),
        Some(":bob!bob@example.net PRIVMSG alice :hi back")
    );
    assert_eq!(bob.session_state("alice"), Some(SessionState::AwaitingEstablish));

    let again = alice.send("bob", "great").unwrap().outbound.unwrap();
    bob.receive(&deliver(&again, "alice")).unwrap();
    assert_eq!(bob.session_state("alice"), Some(SessionState::Established));
}

#[test]
fn test_channel_message_keeps_envelope() {
    let (alice, bob) = established();
    let sealed = alice.send("bob", "psst").unwrap().outbound.unwrap();

    // Same ciphertext relayed with a channel target
    let raw = format!(":alice!alice@example.net PRIVMSG #room :{}", sealed.text);
    let opened = bob.receive(&raw).unwrap();
    assert_eq!(
        opened.display.as_deref(),
        Some(":alice!alice@example.net PRIVMSG #room :psst")
    );
}

#[test]
fn test_stop_notifies_peer() {
    let (alice, bob) = established();

    let stopped = alice.stop("bob").unwrap();
    assert_eq!(stopped.disposition, Disposition::Closed);
    assert_eq!(alice.session_state("bob"), None);

    let closed = bob.receive(&deliver(&stopped.outbound.unwrap(), "alice")).unwrap();
    assert_eq!(closed.disposition, Disposition::Closed);
    assert!(closed.outbound.is_none());
    assert_eq!(bob.session_state("alice"), None);
    assert_eq!(bob.verified_peer_key("alice"), None);

    // Without a session, text goes out in the clear again
    assert_eq!(bob.send("alice", "hello?").unwrap().disposition, Disposition::PassThrough);
}

#[test]
fn test_rejected_message_leaves_session() {
    let (alice, bob) = established();
    let sealed = alice.send("bob", "hello").unwrap().outbound.unwrap();

    // Flip a character inside the authentication tag
    let mut tampered = sealed.text.clone();
    let at = tampered.len() - 4;
    let flipped = if &tampered[at..=at] == "A" { "B" } else { "A" };
    tampered.replace_range(at..=at, flipped);
    let err = bob
        .receive(&format!(":alice!alice@example.net PRIVMSG bob :{tampered}"))
        .unwrap_err();
    assert!(matches!(err, AgentError::Session { .. }));
    assert_eq!(bob.session_state("alice"), Some(SessionState::AwaitingEstablish));

    // The genuine message still opens, a replay does not
    let raw = deliver(&sealed, "alice");
    assert_eq!(bob.receive(&raw).unwrap().disposition, Disposition::Decrypted);
    let err = bob.receive(&raw).unwrap_err();
    assert!(err.is_suspicious());
    assert_eq!(bob.session_state("alice"), Some(SessionState::Established));
}

// ============================================
// Fragmentation
// ============================================

#[test]
fn test_split_offer_at_every_boundary() {
    let alice = orchestrator();
    let offer = alice.start("bob").unwrap().outbound.unwrap();
    let text = offer.text.as_str();
    let envelope = ":alice!alice@example.net PRIVMSG bob :";

    let whole = orchestrator()
        .receive(&format!("{envelope}{text}"))
        .unwrap()
        .disposition;
    assert_eq!(whole, Disposition::Acknowledged);

    for cut in 1..text.len() {
        let bob = orchestrator();
        let first = bob.receive(&format!("{envelope}{}", &text[..cut])).unwrap();
        assert!(first.outbound.is_none());
        if cut < palaver_core::START_MARKER.len() {
            // A head of the marker is shown, never swallowed
            assert_eq!(first.disposition, Disposition::PassThrough, "cut {cut}");
            assert!(!bob.has_pending_fragment("alice"));
        } else {
            assert_eq!(first.disposition, Disposition::Buffered, "cut {cut}");
            assert!(bob.has_pending_fragment("alice"));
        }

        let second = bob.receive(&format!("{envelope}{}", &text[cut..])).unwrap();
        assert_eq!(second.disposition, whole, "cut {cut}");
        assert!(!bob.has_pending_fragment("alice"));
        assert_eq!(bob.session_state("alice"), Some(SessionState::AwaitingEstablish));
    }
}

#[tokio::test]
async fn test_short_lines_over_mock_transport() {
    let alice = orchestrator();
    let bob = orchestrator();
    let wire = MockLineTransport::new(128);

    let offer = alice.start("bob").unwrap().outbound.unwrap();
    wire.send_line(&offer).await.unwrap();
    let pieces = wire.take_sent_lines();
    assert!(pieces.len() > 1);
    assert!(pieces.iter().all(|l| l.len() + 2 <= 128));

    let mut outcomes = Vec::new();
    for piece in &pieces {
        outcomes.push(bob.receive(&format!(":alice!alice@example.net {piece}")).unwrap());
    }
    let last = outcomes.pop().unwrap();
    assert!(outcomes.iter().all(|o| o.disposition == Disposition::Buffered));
    assert_eq!(last.disposition, Disposition::Acknowledged);

    wire.send_line(&last.outbound.unwrap()).await.unwrap();
    let mut done = None;
    for piece in wire.take_sent_lines() {
        done = Some(alice.receive(&format!(":bob!bob@example.net {piece}")).unwrap());
    }
    assert_eq!(done.unwrap().disposition, Disposition::Established);
}

#[test]
fn test_plain_lines_touch_nothing() {
    let (_alice, bob) = established();
    let envelope = ":alice!alice@example.net PRIVMSG bob :";

    // Leave a partial in flight
    let offer = orchestrator().start("carol").unwrap().outbound.unwrap();
    bob.receive(&format!("{envelope}{}", &offer.text[..20])).unwrap();

    let before = (bob.session_state("alice"), bob.has_pending_fragment("alice"), bob.session_count());
    for text in ["hello there", "ok", "thanks", "lol.", "?PLV", "see you."] {
        let outcome = bob.receive(&format!("{envelope}{text}")).unwrap();
        assert_eq!(outcome.disposition, Disposition::PassThrough, "{text}");
        assert_eq!(outcome.display.as_deref(), Some(format!("{envelope}{text}").as_str()));
    }
    let after = (bob.session_state("alice"), bob.has_pending_fragment("alice"), bob.session_count());
    assert_eq!(before, after);
}

#[test]
fn test_fragment_overflow_reported() {
    let bob = Orchestrator::new(
        Arc::new(ScriptedFactory::default()),
        LineParser::default(),
        FragmentLimits {
            max_fragment_bytes: 32,
            ..FragmentLimits::default()
        },
    );
    let envelope = ":mallory!m@example.net PRIVMSG bob :";
    bob.receive(&format!("{envelope}?PLV:AAAAAAAAAAAAAAAA")).unwrap();
    let err = bob
        .receive(&format!("{envelope}BBBBBBBBBBBBBBBBBBBBBBBB"))
        .unwrap_err();

    assert!(matches!(err, AgentError::FragmentOverflow { limit: 32, .. }));
    assert!(!bob.has_pending_fragment("mallory"));
    assert_eq!(bob.session_count(), 0);
}

// ============================================
// Teardown
// ============================================

#[test]
fn test_ghost_stop() {
    let alice = orchestrator();
    alice.start("bob").unwrap();

    let err = alice.stop("ghost").unwrap_err();
    assert!(matches!(err, AgentError::NoSuchSession { ref nick } if nick == "ghost"));
    assert_eq!(alice.session_state("bob"), Some(SessionState::Offered));
    assert_eq!(alice.session_count(), 1);
}

#[test]
fn test_stop_tears_down_when_close_fails() {
    let alice = Orchestrator::new(
        Arc::new(ScriptedFactory {
            fail_close: true,
            ..ScriptedFactory::default()
        }),
        LineParser::default(),
        FragmentLimits::default(),
    );
    alice.start("bob").unwrap();
    let err = alice.stop("bob").unwrap_err();

    assert!(matches!(err, AgentError::Session { .. }));
    assert_eq!(alice.session_state("bob"), None);
    assert!(matches!(
        alice.stop("bob").unwrap_err(),
        AgentError::NoSuchSession { .. }
    ));
}

#[test]
fn test_stop_after_start_with_working_close() {
    let alice = Orchestrator::new(
        Arc::new(ScriptedFactory::default()),
        LineParser::default(),
        FragmentLimits::default(),
    );
    alice.start("bob").unwrap();
    let stopped = alice.stop("bob").unwrap();
    assert_eq!(stopped.outbound.unwrap().text, SCRIPTED_CLOSE);
    assert_eq!(alice.session_state("bob"), None);
}

#[test]
fn test_failed_offer_leaves_no_session() {
    let alice = Orchestrator::new(
        Arc::new(ScriptedFactory {
            fail_offer: true,
            ..ScriptedFactory::default()
        }),
        LineParser::default(),
        FragmentLimits::default(),
    );
    let err = alice.start("bob").unwrap_err();
    assert!(matches!(err, AgentError::Handshake { .. }));
    assert_eq!(alice.session_count(), 0);
}

// ============================================
// Agent loop
// ============================================

#[tokio::test]
async fn test_agents_over_mock_transports() {
    let alice_wire = Arc::new(MockLineTransport::new(200));
    let bob_wire = Arc::new(MockLineTransport::new(200));
    let (alice, mut alice_events) = Agent::new(Arc::new(orchestrator()), Arc::clone(&alice_wire));
    let (bob, mut bob_events) = Agent::new(Arc::new(orchestrator()), Arc::clone(&bob_wire));

    alice.handle_line("/start bob").await.unwrap();
    for line in alice_wire.take_sent_lines() {
        bob.handle_line(&format!(":alice!a@example.net {line}")).await.unwrap();
    }
    for line in bob_wire.take_sent_lines() {
        alice.handle_line(&format!(":bob!b@example.net {line}")).await.unwrap();
    }

    let Some(HostEvent::Verify { nick, verification }) = bob_events.recv().await else {
        panic!("bob should be asked to verify");
    };
    assert_eq!(nick, "alice");
    let Some(HostEvent::Verify { verification: mirrored, .. }) = alice_events.recv().await else {
        panic!("alice should be asked to verify");
    };
    assert_eq!(verification.local, mirrored.peer);
    assert_eq!(verification.peer, mirrored.local);

    alice.handle_line("/msg bob over the wire").await.unwrap();
    assert_eq!(
        alice_events.recv().await,
        Some(HostEvent::Display("PRIVMSG bob :over the wire".into()))
    );
    for line in alice_wire.take_sent_lines() {
        bob.handle_line(&format!(":alice!a@example.net {line}")).await.unwrap();
    }
    assert_eq!(
        bob_events.recv().await,
        Some(HostEvent::Display(
            ":alice!a@example.net PRIVMSG bob :over the wire".into()
        ))
    );

    alice.handle_line("/stop bob").await.unwrap();
    assert_eq!(
        alice_events.recv().await,
        Some(HostEvent::Closed { nick: "bob".into() })
    );
}

// ============================================
// Scripted primitive
// ============================================

const SCRIPTED_OFFER: &str = "?PLV:T0ZGRVI=.";
const SCRIPTED_CLOSE: &str = "?PLV:Q0xPU0U=.";

struct ScriptedFactory {
    identity: IdentityKeyPair,
    fail_offer: bool,
    fail_close: bool,
}

impl Default for ScriptedFactory {
    fn default() -> Self {
        Self {
            identity: IdentityKeyPair::generate(),
            fail_offer: false,
            fail_close: false,
        }
    }
}

impl SessionFactory for ScriptedFactory {
    fn create(&self) -> Box<dyn CryptoSession> {
        Box::new(ScriptedSession {
            fail_offer: self.fail_offer,
            fail_close: self.fail_close,
        })
    }

    fn local_key(&self) -> IdentityPublicKey {
        self.identity.public_key()
    }
}

struct ScriptedSession {
    fail_offer: bool,
    fail_close: bool,
}

impl CryptoSession for ScriptedSession {
    fn offer(&mut self) -> palaver_core::Result<String> {
        if self.fail_offer {
            return Err(CoreError::key_generation("scripted failure"));
        }
        Ok(SCRIPTED_OFFER.to_string())
    }

    fn acknowledge(&mut self, _message: &str) -> palaver_core::Result<Acknowledged> {
        Err(CoreError::malformed("scripted sessions never acknowledge"))
    }

    fn receive(&mut self, _message: &str) -> palaver_core::Result<Received> {
        Ok(Received::Pending)
    }

    fn send(&mut self, _plaintext: &[u8]) -> palaver_core::Result<String> {
        Err(CoreError::malformed("scripted sessions never send"))
    }

    fn close(&mut self) -> palaver_core::Result<String> {
        if self.fail_close {
            return Err(CoreError::malformed("scripted close failure"));
        }
        Ok(SCRIPTED_CLOSE.to_string())
    }
}
