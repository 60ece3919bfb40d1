// ============================================
// File: crates/palaver-core/src/protocol/frame.rs
// ============================================
//! # Frame Codec
//!
//! ## Creation Reason
//! Chat transports carry text, the session protocol produces bytes. This
//! module armors binary messages into a single tagged text token and
//! classifies incoming text as protocol traffic or ordinary chat.
//!
//! ## Main Functionality
//! - `armor` / `dearmor`: bytes <-> `?PLV:<base64>.`
//! - `is_tagged` / `is_complete`: stateless classification
//!
//! ## Frame Layout
//! ```text
//! ?PLV:AQEBAQEB...AAAA.
//! └─┬─┘└─────┬──────┘└┬┘
//!  start   base64    end
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Neither marker may contain a base64 character, otherwise completeness
//!   checks on partial text become ambiguous.
//!
//! ## Last Modified
//! v0.1.0 - Initial frame codec

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};

use crate::error::{CoreError, Result};

/// Prefix of every protocol-tagged message.
pub const START_MARKER: &str = "?PLV:";

/// Suffix of every complete protocol-tagged message.
pub const END_MARKER: &str = ".";

/// Returns `true` if the text begins with the start marker.
#[must_use]
pub fn is_tagged(text: &str) -> bool {
    text.starts_with(START_MARKER)
}

/// Returns `true` if the text is tagged and also carries the end marker.
#[must_use]
pub fn is_complete(text: &str) -> bool {
    is_tagged(text) && text.len() >= START_MARKER.len() + END_MARKER.len() && text.ends_with(END_MARKER)
}

/// Wraps binary message bytes in the text frame.
#[must_use]
pub fn armor(bytes: &[u8]) -> String {
    let body = BASE64.encode(bytes);
    let mut out = String::with_capacity(START_MARKER.len() + body.len() + END_MARKER.len());
    out.push_str(START_MARKER);
    out.push_str(&body);
    out.push_str(END_MARKER);
    out
}

/// Strips the frame and decodes the binary message.
///
/// # Errors
/// `MalformedMessage` if a marker is missing or the body is not base64.
pub fn dearmor(text: &str) -> Result<Vec<u8>> {
    let body = text
        .strip_prefix(START_MARKER)
        .ok_or_else(|| CoreError::malformed("missing start marker"))?
        .strip_suffix(END_MARKER)
        .ok_or_else(|| CoreError::malformed("missing end marker"))?;

    if body.is_empty() {
        return Err(CoreError::malformed("empty frame"));
    }

    BASE64
        .decode(body)
        .map_err(|e| CoreError::malformed(format!("frame body is not base64: {e}")))
}
