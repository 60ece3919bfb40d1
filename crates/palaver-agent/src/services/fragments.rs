// ============================================
// File: crates/palaver-agent/src/services/fragments.rs
// ============================================
//! # Fragment Reassembler
//!
//! ## Creation Reason
//! Chat servers cap line length well below the size of an armored
//! handshake message, so one protocol message may arrive as several
//! consecutive lines from the same sender. This module glues them back
//! together before the orchestrator sees them.
//!
//! ## Main Functionality
//! - `FragmentReassembler`: per-sender pending partial messages
//! - `FragmentLimits`: bounds on count, size and age of partials
//!
//! ## Reassembly Rules
//! ```text
//!   line from nick                 pending?   result
//!   ─────────────────────────────  ────────   ──────────────────────────────────
//!   ?PLV:....... .  (complete)     any        complete (stale partial dropped)
//!   ?PLV:.......    (incomplete)   any        buffered (stale partial dropped)
//!   ?PL             (marker head)  any        passed through, kept as lead-in
//!   AbC+/=...       (full piece)   yes        appended
//!   AbC+/=....      (tail)         yes        complete if the joined text dearmors
//!   anything else                  any        passed through untouched
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Delivery from one sender is assumed in-order and contiguous
//! - Senders split at their line limit, so every piece but the last is as
//!   long as the first one. A shorter unterminated line is chat, never a
//!   continuation, and a tail only joins if the result is valid armor
//! - A lead-in only ever joins the very next line from the same sender
//! - Expiry is lazy; call `prune_expired` periodically to reclaim memory
//!
//! ## Last Modified
//! v0.1.0 - Initial bounded reassembler
//! v0.1.1 - Marker lead-ins; continuations checked against piece length

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use palaver_common::Nickname;
use palaver_core::protocol::dearmor;
use palaver_core::{is_tagged, END_MARKER, START_MARKER};

use crate::error::{AgentError, Result};

// ============================================
// FragmentLimits
// ============================================

/// Bounds applied by the reassembler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FragmentLimits {
    /// Maximum number of senders with a partial in flight.
    pub max_pending: usize,
    /// Maximum accumulated size of one partial.
    pub max_fragment_bytes: usize,
    /// Partials untouched for longer than this are discarded.
    pub ttl: Duration,
}

impl Default for FragmentLimits {
    fn default() -> Self {
        Self {
            max_pending: 64,
            max_fragment_bytes: 64 * 1024,
            ttl: Duration::from_secs(300),
        }
    }
}

// ============================================
// PendingFragment
// ============================================

#[derive(Debug)]
struct PendingFragment {
    partial: String,
    /// Length of the first piece, i.e. the sender's split size.
    piece_len: usize,
    updated_at: Instant,
}

impl PendingFragment {
    fn new(partial: String, now: Instant) -> Self {
        Self {
            piece_len: partial.len(),
            partial,
            updated_at: now,
        }
    }

    fn is_expired(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.updated_at) > ttl
    }
}

/// Returns `true` if `text` can only be the middle or tail of an armored message.
fn is_armor_body(text: &str) -> bool {
    let body = text.strip_suffix(END_MARKER).unwrap_or(text);
    !text.is_empty()
        && body
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'+' | b'/' | b'='))
}

/// Returns `true` if `text` is a proper, non-empty head of the start marker.
fn is_marker_head(text: &str) -> bool {
    !text.is_empty() && text.len() < START_MARKER.len() && START_MARKER.starts_with(text)
}

/// Inserts into a per-sender map, evicting the stalest entry when full.
fn insert_bounded(
    map: &mut HashMap<Nickname, PendingFragment>,
    max: usize,
    nick: &Nickname,
    fragment: PendingFragment,
) {
    if !map.contains_key(nick) && map.len() >= max {
        let stalest = map
            .iter()
            .min_by_key(|(_, p)| p.updated_at)
            .map(|(n, _)| n.clone());
        if let Some(evicted) = stalest {
            map.remove(&evicted);
            warn!(nick = %evicted, "Evicted stalest pending fragment");
        }
    }
    map.insert(nick.clone(), fragment);
}

// ============================================
// FragmentReassembler
// ============================================

/// Buffers partial tagged messages per sender.
#[derive(Debug, Default)]
pub struct FragmentReassembler {
    pending: HashMap<Nickname, PendingFragment>,
    lead_ins: HashMap<Nickname, PendingFragment>,
    limits: FragmentLimits,
}

impl FragmentReassembler {
    /// Creates an empty reassembler with the given bounds.
    #[must_use]
    pub fn new(limits: FragmentLimits) -> Self {
        Self {
            pending: HashMap::new(),
            lead_ins: HashMap::new(),
            limits,
        }
    }

    /// Feeds one line of text from `nick`.
    ///
    /// Returns `Some(text)` when a complete message (or an ordinary
    /// untagged line) is ready, `None` when the text was buffered.
    ///
    /// # Errors
    /// `FragmentOverflow` if the partial would exceed the size limit; the
    /// partial is dropped.
    pub fn accumulate(&mut self, nick: &Nickname, text: &str) -> Result<Option<String>> {
        self.accumulate_at(nick, text, Instant::now())
    }

    /// [`accumulate`](Self::accumulate) with an explicit clock reading.
    ///
    /// # Errors
    /// See [`accumulate`](Self::accumulate).
    pub fn accumulate_at(
        &mut self,
        nick: &Nickname,
        text: &str,
        now: Instant,
    ) -> Result<Option<String>> {
        let ttl = self.limits.ttl;
        if self.pending.get(nick).is_some_and(|p| p.is_expired(now, ttl)) {
            self.pending.remove(nick);
            debug!(nick = %nick, "Discarded expired fragment");
        }

        let lead_in = self
            .lead_ins
            .remove(nick)
            .filter(|l| !l.is_expired(now, ttl))
            .map(|l| l.partial + text);
        if let Some(joined) = lead_in.filter(|j| is_tagged(j)) {
            debug!(nick = %nick, "Start marker arrived split across lines");
            return self.begin(nick, joined, now);
        }

        if is_tagged(text) {
            return self.begin(nick, text.to_string(), now);
        }

        if is_marker_head(text) {
            insert_bounded(
                &mut self.lead_ins,
                self.limits.max_pending,
                nick,
                PendingFragment::new(text.to_string(), now),
            );
            return Ok(Some(text.to_string()));
        }

        if !is_armor_body(text) {
            return Ok(Some(text.to_string()));
        }
        let Some(fragment) = self.pending.get(nick) else {
            return Ok(Some(text.to_string()));
        };

        if text.ends_with(END_MARKER) {
            let candidate = [fragment.partial.as_str(), text].concat();
            if dearmor(&candidate).is_err() {
                debug!(nick = %nick, "Line does not complete the pending message, passing through");
                return Ok(Some(text.to_string()));
            }
            self.pending.remove(nick);
            self.check_size(nick, candidate.len())?;
            debug!(nick = %nick, len = candidate.len(), "Reassembled message");
            return Ok(Some(candidate));
        }

        if text.len() < fragment.piece_len {
            debug!(nick = %nick, len = text.len(), "Short line while a message is pending, passing through");
            return Ok(Some(text.to_string()));
        }

        let total = fragment.partial.len() + text.len();
        if let Err(e) = self.check_size(nick, total) {
            self.pending.remove(nick);
            return Err(e);
        }
        if let Some(fragment) = self.pending.get_mut(nick) {
            fragment.partial.push_str(text);
            fragment.updated_at = now;
        }
        Ok(None)
    }

    /// Handles a line that opens a new tagged message.
    fn begin(&mut self, nick: &Nickname, text: String, now: Instant) -> Result<Option<String>> {
        if self.pending.remove(nick).is_some() {
            warn!(nick = %nick, "New message started before previous one completed");
        }
        if text.ends_with(END_MARKER) {
            return Ok(Some(text));
        }
        self.check_size(nick, text.len())?;
        debug!(nick = %nick, len = text.len(), "Buffered fragment");
        insert_bounded(
            &mut self.pending,
            self.limits.max_pending,
            nick,
            PendingFragment::new(text, now),
        );
        Ok(None)
    }

    fn check_size(&self, nick: &Nickname, len: usize) -> Result<()> {
        if len > self.limits.max_fragment_bytes {
            warn!(nick = %nick, len, limit = self.limits.max_fragment_bytes, "Fragment overflow");
            return Err(AgentError::FragmentOverflow {
                nick: nick.to_string(),
                limit: self.limits.max_fragment_bytes,
            });
        }
        Ok(())
    }

    /// Drops any partial held for `nick`, returning whether one existed.
    pub fn discard(&mut self, nick: &str) -> bool {
        self.lead_ins.remove(nick);
        self.pending.remove(nick).is_some()
    }

    /// Drops every expired partial, returning how many were removed.
    pub fn prune_expired(&mut self) -> usize {
        self.prune_expired_at(Instant::now())
    }

    /// [`prune_expired`](Self::prune_expired) with an explicit clock reading.
    pub fn prune_expired_at(&mut self, now: Instant) -> usize {
        let ttl = self.limits.ttl;
        self.lead_ins.retain(|_, l| !l.is_expired(now, ttl));
        let before = self.pending.len();
        self.pending.retain(|_, p| !p.is_expired(now, ttl));
        let removed = before - self.pending.len();
        if removed > 0 {
            debug!(removed, "Pruned expired fragments");
        }
        removed
    }

    /// Returns `true` if a partial is held for `nick`.
    #[must_use]
    pub fn contains(&self, nick: &str) -> bool {
        self.pending.contains_key(nick)
    }

    /// Returns the number of senders with a partial in flight.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Returns `true` if nothing is buffered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Returns the configured bounds.
    #[must_use]
    pub const fn limits(&self) -> FragmentLimits {
        self.limits
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    fn nick(name: &str) -> Nickname {
        Nickname::new(name).unwrap()
    }

    const MESSAGE: &str = "?PLV:AQIDBAUGBwgJCgsMDQ4PEA==.";

    #[test]
    fn test_complete_message_passes_straight_through() {
        let mut r = FragmentReassembler::default();
        assert_eq!(
            r.accumulate(&nick("alice"), MESSAGE).unwrap().as_deref(),
            Some(MESSAGE)
        );
        assert!(r.is_empty());
    }

    #[test]
    fn test_split_at_every_boundary_reassembles() {
        for cut in 1..MESSAGE.len() {
            let mut r = FragmentReassembler::default();
            let alice = nick("alice");
            let head = &MESSAGE[..cut];
            let first = r.accumulate(&alice, head).unwrap();
            if cut < START_MARKER.len() {
                assert_eq!(first.as_deref(), Some(head), "cut {cut}");
                assert!(!r.contains("alice"));
            } else {
                assert_eq!(first, None, "cut {cut}");
                assert!(r.contains("alice"));
            }
            assert_eq!(
                r.accumulate(&alice, &MESSAGE[cut..]).unwrap().as_deref(),
                Some(MESSAGE),
                "cut {cut}"
            );
            assert!(r.is_empty());
        }
    }

    #[test]
    fn test_three_pieces() {
        let mut r = FragmentReassembler::default();
        let alice = nick("alice");
        assert_eq!(r.accumulate(&alice, "?PLV:AQIDB").unwrap(), None);
        assert_eq!(r.accumulate(&alice, "AUGBwgJCgs").unwrap(), None);
        assert_eq!(
            r.accumulate(&alice, "MDQ4PEA==.").unwrap().as_deref(),
            Some(MESSAGE)
        );
    }

    #[test]
    fn test_short_words_while_pending_pass_through() {
        let mut r = FragmentReassembler::default();
        let alice = nick("alice");
        r.accumulate(&alice, "?PLV:AQID").unwrap();

        for word in ["ok", "lol", "thanks", "lol."] {
            assert_eq!(r.accumulate(&alice, word).unwrap().as_deref(), Some(word));
        }

        // The partial is untouched and still completes
        assert_eq!(
            r.accumulate(&alice, "BAUGBwgJCgsMDQ4PEA==.").unwrap().as_deref(),
            Some(MESSAGE)
        );
    }

    #[test]
    fn test_marker_head_is_never_held_back() {
        let mut r = FragmentReassembler::default();
        let alice = nick("alice");
        assert_eq!(r.accumulate(&alice, "?").unwrap().as_deref(), Some("?"));
        assert!(r.is_empty());

        // Only the very next line may complete the marker
        assert_eq!(r.accumulate(&alice, "what").unwrap().as_deref(), Some("what"));
        assert_eq!(r.accumulate(&alice, "PLV:AQID").unwrap().as_deref(), Some("PLV:AQID"));
        assert!(r.is_empty());

        assert_eq!(r.accumulate(&alice, "?PL").unwrap().as_deref(), Some("?PL"));
        assert_eq!(r.accumulate(&alice, "V:AQID").unwrap(), None);
        assert!(r.contains("alice"));
    }

    #[test]
    fn test_plain_text_untouched() {
        let mut r = FragmentReassembler::default();
        let alice = nick("alice");
        assert_eq!(
            r.accumulate(&alice, "see you later.").unwrap().as_deref(),
            Some("see you later.")
        );
        assert!(r.is_empty());

        r.accumulate(&alice, "?PLV:AQID").unwrap();
        assert_eq!(
            r.accumulate(&alice, "brb, phone!").unwrap().as_deref(),
            Some("brb, phone!")
        );
        assert!(r.contains("alice"));
    }

    #[test]
    fn test_senders_are_independent() {
        let mut r = FragmentReassembler::default();
        r.accumulate(&nick("alice"), "?PLV:AQID").unwrap();
        r.accumulate(&nick("bob"), "?PLV:AAAA").unwrap();
        assert_eq!(r.len(), 2);
        assert_eq!(
            r.accumulate(&nick("bob"), "BBBB.").unwrap().as_deref(),
            Some("?PLV:AAAABBBB.")
        );
        assert!(r.contains("alice"));
        assert!(!r.contains("bob"));
    }

    #[test]
    fn test_new_start_marker_replaces_partial() {
        let mut r = FragmentReassembler::default();
        let alice = nick("alice");
        r.accumulate(&alice, "?PLV:AQID").unwrap();
        assert_eq!(r.accumulate(&alice, "?PLV:BAUG").unwrap(), None);
        assert_eq!(
            r.accumulate(&alice, "CgsM.").unwrap().as_deref(),
            Some("?PLV:BAUGCgsM.")
        );
    }

    #[test]
    fn test_overflow_drops_partial() {
        let mut r = FragmentReassembler::new(FragmentLimits {
            max_fragment_bytes: 16,
            ..FragmentLimits::default()
        });
        let alice = nick("alice");
        r.accumulate(&alice, "?PLV:AAAA").unwrap();
        let err = r.accumulate(&alice, "BBBBBBBBBB").unwrap_err();
        assert!(matches!(err, AgentError::FragmentOverflow { limit: 16, .. }));
        assert!(!r.contains("alice"));
    }

    #[test]
    fn test_eviction_of_stalest() {
        let mut r = FragmentReassembler::new(FragmentLimits {
            max_pending: 2,
            ..FragmentLimits::default()
        });
        let t0 = Instant::now();
        r.accumulate_at(&nick("a"), "?PLV:A", t0).unwrap();
        r.accumulate_at(&nick("b"), "?PLV:B", t0 + Duration::from_secs(1)).unwrap();
        r.accumulate_at(&nick("c"), "?PLV:C", t0 + Duration::from_secs(2)).unwrap();

        assert_eq!(r.len(), 2);
        assert!(!r.contains("a"));
        assert!(r.contains("b"));
        assert!(r.contains("c"));
    }

    #[test]
    fn test_expired_partial_not_joined() {
        let mut r = FragmentReassembler::new(FragmentLimits {
            ttl: Duration::from_secs(10),
            ..FragmentLimits::default()
        });
        let alice = nick("alice");
        let t0 = Instant::now();
        r.accumulate_at(&alice, "?PLV:AQID", t0).unwrap();

        let later = t0 + Duration::from_secs(11);
        assert_eq!(
            r.accumulate_at(&alice, "BAUG.", later).unwrap().as_deref(),
            Some("BAUG.")
        );
        assert!(r.is_empty());
    }

    #[test]
    fn test_prune_expired() {
        let mut r = FragmentReassembler::new(FragmentLimits {
            ttl: Duration::from_secs(10),
            ..FragmentLimits::default()
        });
        let t0 = Instant::now();
        r.accumulate_at(&nick("old"), "?PLV:A", t0).unwrap();
        r.accumulate_at(&nick("new"), "?PLV:B", t0 + Duration::from_secs(8)).unwrap();

        assert_eq!(r.prune_expired_at(t0 + Duration::from_secs(12)), 1);
        assert!(r.contains("new"));
        assert!(!r.contains("old"));
    }

    #[test]
    fn test_discard() {
        let mut r = FragmentReassembler::default();
        r.accumulate(&nick("alice"), "?PLV:A").unwrap();
        assert!(r.discard("alice"));
        assert!(!r.discard("alice"));
    }
}
