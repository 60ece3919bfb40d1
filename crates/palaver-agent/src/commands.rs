// ============================================
// File: crates/palaver-agent/src/commands.rs
// ============================================
//! # Host Commands
//!
//! Lines read by the agent are either slash commands from the user or raw
//! inbound transport lines.
//!
//! ```text
//! /start <nick>        begin a handshake
//! /stop <nick>         end a session
//! /msg <nick> <text>   send text, encrypted when a session exists
//! /fingerprint         show the process identity fingerprint
//! /sessions            list peers and their session state
//! anything else        inbound transport line
//! ```
//!
//! ## Last Modified
//! v0.1.0 - Initial command set

use crate::error::{AgentError, Result};

/// One line of host input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCommand {
    /// Begin a handshake with the nickname.
    Start(String),
    /// End the session with the nickname.
    Stop(String),
    /// Send text to a nickname or channel.
    Message {
        /// Recipient
        target: String,
        /// Text to send
        text: String,
    },
    /// Show the process identity fingerprint.
    Fingerprint,
    /// List sessions.
    Sessions,
    /// A raw inbound transport line.
    Inbound(String),
}

impl HostCommand {
    /// Classifies one line of host input.
    ///
    /// # Errors
    /// `MalformedLine` if a known command is missing its arguments.
    pub fn parse(line: &str) -> Result<Self> {
        let line = line.trim_end_matches(['\r', '\n']);
        let Some(body) = line.strip_prefix('/') else {
            return Ok(Self::Inbound(line.to_string()));
        };

        let (name, args) = body.split_once(' ').unwrap_or((body, ""));
        let args = args.trim();
        match name {
            "start" => single_arg(args, "/start <nick>").map(Self::Start),
            "stop" => single_arg(args, "/stop <nick>").map(Self::Stop),
            "msg" => match args.split_once(' ') {
                Some((target, text)) if !text.is_empty() => Ok(Self::Message {
                    target: target.to_string(),
                    text: text.to_string(),
                }),
                _ => Err(usage("/msg <nick> <text>")),
            },
            "fingerprint" => Ok(Self::Fingerprint),
            "sessions" => Ok(Self::Sessions),
            _ => Ok(Self::Inbound(line.to_string())),
        }
    }
}

fn single_arg(args: &str, usage_text: &str) -> Result<String> {
    if args.is_empty() || args.contains(' ') {
        return Err(usage(usage_text));
    }
    Ok(args.to_string())
}

fn usage(text: &str) -> AgentError {
    AgentError::MalformedLine {
        reason: format!("usage: {text}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            HostCommand::parse("/start bob").unwrap(),
            HostCommand::Start("bob".into())
        );
        assert_eq!(
            HostCommand::parse("/stop bob\n").unwrap(),
            HostCommand::Stop("bob".into())
        );
        assert_eq!(
            HostCommand::parse("/msg bob hello there").unwrap(),
            HostCommand::Message {
                target: "bob".into(),
                text: "hello there".into()
            }
        );
        assert_eq!(
            HostCommand::parse("/fingerprint").unwrap(),
            HostCommand::Fingerprint
        );
        assert_eq!(HostCommand::parse("/sessions").unwrap(), HostCommand::Sessions);
    }

    #[test]
    fn test_other_lines_are_inbound() {
        let raw = ":alice!a@host PRIVMSG bob :hi";
        assert_eq!(
            HostCommand::parse(raw).unwrap(),
            HostCommand::Inbound(raw.into())
        );
        assert_eq!(
            HostCommand::parse("/whois bob").unwrap(),
            HostCommand::Inbound("/whois bob".into())
        );
    }

    #[test]
    fn test_missing_arguments() {
        assert!(HostCommand::parse("/start").unwrap_err().is_parse_error());
        assert!(HostCommand::parse("/stop a b").is_err());
        assert!(HostCommand::parse("/msg bob").is_err());
    }
}
