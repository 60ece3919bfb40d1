// ============================================
// File: crates/palaver-transport/src/line.rs
// ============================================
//! # Chat Line Parsing
//!
//! ## Creation Reason
//! The orchestrator only understands (sender, target, text). This module
//! turns raw transport lines into that triple and builds outbound lines,
//! splitting long text so each line fits the transport's limit.
//!
//! ## Main Functionality
//! - `LineParser`: inbound `:nick!user@host PRIVMSG target :text`
//! - `parse_nick`: bare nickname from a sender token
//! - `InboundLine` / `OutboundLine`: structured lines and their wire form
//!
//! ## Line Shape
//! ```text
//! [@tags] :alice!~a@host.example PRIVMSG bob :?PLV:AQEB...
//!         └──── sender token ──┘ └command┘└tgt┘└── text ──┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Splitting counts bytes but cuts on char boundaries only
//! - The peer's reassembler concatenates pieces verbatim, so no piece may
//!   be trimmed or padded
//!
//! ## Last Modified
//! v0.1.0 - Initial line parser

use std::fmt;

use palaver_common::types::Nickname;

use crate::error::{Result, TransportError};

/// Message-delivery command used when none is configured.
pub const DEFAULT_COMMAND: &str = "PRIVMSG";

/// Bytes appended by the binding after every line.
const LINE_TERMINATOR_LEN: usize = 2;

/// Smallest text budget per line; fits any UTF-8 char and a whole
/// protocol start marker, so the first piece never cuts the marker.
const MIN_TEXT_BUDGET: usize = 8;

// ============================================
// InboundLine
// ============================================

/// A parsed message-delivery line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundLine {
    /// Sender token as received, e.g. `:alice!~a@host`.
    pub sender_token: String,
    /// Bare nickname extracted from the token.
    pub sender: Nickname,
    /// Message-delivery command.
    pub command: String,
    /// Target nickname or channel.
    pub target: String,
    /// Message text without the leading colon.
    pub text: String,
}

impl InboundLine {
    /// Returns the same envelope carrying different text.
    #[must_use]
    pub fn with_text(&self, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..self.clone()
        }
    }

    /// Renders the line in wire form (without terminator).
    #[must_use]
    pub fn to_wire(&self) -> String {
        format!(
            "{} {} {} :{}",
            self.sender_token, self.command, self.target, self.text
        )
    }
}

impl fmt::Display for InboundLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_wire())
    }
}

// ============================================
// OutboundLine
// ============================================

/// A line to hand to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundLine {
    /// Message-delivery command.
    pub command: String,
    /// Destination nickname or channel.
    pub target: String,
    /// Text to deliver.
    pub text: String,
}

impl OutboundLine {
    /// Creates an outbound line.
    pub fn new(
        command: impl Into<String>,
        target: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            command: command.into(),
            target: target.into(),
            text: text.into(),
        }
    }

    /// Renders the line in wire form (without terminator).
    #[must_use]
    pub fn to_wire(&self) -> String {
        format!("{} {} :{}", self.command, self.target, self.text)
    }

    /// Splits the line so every piece, terminator included, fits in
    /// `max_len` bytes.
    ///
    /// # Errors
    /// `InvalidConfig` if `max_len` leaves no room for text.
    pub fn wire_lines(&self, max_len: usize) -> Result<Vec<String>> {
        let prefix = format!("{} {} :", self.command, self.target);
        let budget = max_len.saturating_sub(prefix.len() + LINE_TERMINATOR_LEN);
        if budget < MIN_TEXT_BUDGET {
            return Err(TransportError::invalid_config(
                "max_line_len",
                format!("{max_len} bytes leave no room for text to {}", self.target),
            ));
        }

        Ok(split_text(&self.text, budget)
            .into_iter()
            .map(|chunk| format!("{prefix}{chunk}"))
            .collect())
    }
}

impl fmt::Display for OutboundLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_wire())
    }
}

/// Cuts `text` into pieces of at most `budget` bytes on char boundaries.
fn split_text(text: &str, budget: usize) -> Vec<&str> {
    if text.len() <= budget {
        return vec![text];
    }

    let mut pieces = Vec::with_capacity(text.len() / budget + 1);
    let mut rest = text;
    while !rest.is_empty() {
        let mut cut = budget.min(rest.len());
        while !rest.is_char_boundary(cut) {
            cut -= 1;
        }
        let (head, tail) = rest.split_at(cut);
        pieces.push(head);
        rest = tail;
    }
    pieces
}

// ============================================
// LineParser
// ============================================

/// Parser for one message-delivery command.
#[derive(Debug, Clone)]
pub struct LineParser {
    command: String,
}

impl Default for LineParser {
    fn default() -> Self {
        Self::new(DEFAULT_COMMAND)
    }
}

impl LineParser {
    /// Creates a parser accepting `command` (compared case-insensitively).
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    /// Returns the configured command.
    #[must_use]
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Builds an outbound line using the configured command.
    pub fn outbound(&self, target: impl Into<String>, text: impl Into<String>) -> OutboundLine {
        OutboundLine::new(self.command.clone(), target, text)
    }

    /// Parses `<sender> <COMMAND> <target> :<text>`.
    ///
    /// # Errors
    /// - `MalformedLine`: too few segments or a different command
    /// - `UnresolvableSender`: sender token is not `:nick!user@host`
    pub fn parse(&self, raw: &str) -> Result<InboundLine> {
        let mut rest = raw.trim_end_matches(['\r', '\n']);

        // IRCv3 message tags carry nothing we route on
        if rest.starts_with('@') {
            rest = next_segment(rest)
                .map(|(_, tail)| tail)
                .ok_or_else(|| TransportError::malformed("line holds only message tags"))?;
        }

        let (sender_token, rest) =
            next_segment(rest).ok_or_else(|| TransportError::malformed("missing command"))?;
        let (command, rest) =
            next_segment(rest).ok_or_else(|| TransportError::malformed("missing target"))?;
        let (target, text) =
            next_segment(rest).ok_or_else(|| TransportError::malformed("missing text"))?;

        if !command.eq_ignore_ascii_case(&self.command) {
            return Err(TransportError::malformed(format!(
                "expected {}, got {command}",
                self.command
            )));
        }

        let sender = parse_nick(sender_token)?;
        let text = text.strip_prefix(':').unwrap_or(text);

        Ok(InboundLine {
            sender_token: sender_token.to_string(),
            sender,
            command: command.to_string(),
            target: target.to_string(),
            text: text.to_string(),
        })
    }

    /// Parses an outbound `<COMMAND> <target> :<text>` line, as seen by
    /// a client's send hook.
    ///
    /// # Errors
    /// `MalformedLine` on a different command or missing segments.
    pub fn parse_outbound(&self, raw: &str) -> Result<OutboundLine> {
        let raw = raw.trim_end_matches(['\r', '\n']);
        let (command, rest) =
            next_segment(raw).ok_or_else(|| TransportError::malformed("missing target"))?;
        let (target, text) =
            next_segment(rest).ok_or_else(|| TransportError::malformed("missing text"))?;

        if !command.eq_ignore_ascii_case(&self.command) {
            return Err(TransportError::malformed(format!(
                "expected {}, got {command}",
                self.command
            )));
        }

        Ok(OutboundLine::new(
            command,
            target,
            text.strip_prefix(':').unwrap_or(text),
        ))
    }
}

/// Splits off the next space-delimited segment; `None` if nothing follows it.
fn next_segment(input: &str) -> Option<(&str, &str)> {
    let input = input.trim_start_matches(' ');
    let (head, tail) = input.split_once(' ')?;
    if head.is_empty() {
        return None;
    }
    Some((head, tail.trim_start_matches(' ')))
}

/// Extracts the bare nickname from a `:nick!user@host` sender token.
///
/// # Errors
/// `UnresolvableSender` if the token does not follow the pattern.
///
/// # Example
/// ```
/// use palaver_transport::line::parse_nick;
///
/// assert_eq!(parse_nick(":alice!~a@example.net").unwrap().as_str(), "alice");
/// assert!(parse_nick(":irc.example.net").is_err());
/// ```
pub fn parse_nick(token: &str) -> Result<Nickname> {
    let unresolvable = || TransportError::unresolvable(token);

    let body = token.strip_prefix(':').ok_or_else(unresolvable)?;
    let (nick, user_host) = body.split_once('!').ok_or_else(unresolvable)?;
    let (user, host) = user_host.split_once('@').ok_or_else(unresolvable)?;
    if user.is_empty() || host.is_empty() {
        return Err(unresolvable());
    }

    Nickname::new(nick).map_err(|_| unresolvable())
}

// ============================================
// Tests
// ============================================
