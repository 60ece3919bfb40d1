// ============================================
// File: crates/palaver-common/src/time.rs
// ============================================
//! # Time Utilities
//!
//! ## Creation Reason
//! Handshake offers carry the sender's wall-clock time so a recorded
//! offer cannot be replayed hours later. This module owns that timestamp
//! type and its freshness check.
//!
//! ## ⚠️ Important Note for Next Developer
//! - Chat peers are end-user machines, clocks drift more than on servers.
//!   Keep the configured skew generous.
//!
//! ## Last Modified
//! v0.1.0 - Initial time utilities

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Offers stamped before 2024-01-01 come from a broken clock.
const EARLIEST_PLAUSIBLE: i64 = 1_704_067_200;

/// Seconds since the Unix epoch, as written into an Offer.
///
/// # Example
/// ```
/// use palaver_common::time::Timestamp;
///
/// assert!(Timestamp::now().is_recent(30));
/// assert!(!Timestamp::from_secs(0).is_recent(u64::MAX));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Wraps a value read off the wire.
    #[must_use]
    pub const fn from_secs(secs: i64) -> Self {
        Self(secs)
    }

    /// Reads the system clock; a clock before the epoch reads as zero.
    #[must_use]
    pub fn now() -> Self {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
            .unwrap_or(0);
        Self(secs)
    }

    /// Unix seconds.
    #[must_use]
    pub const fn as_secs(&self) -> i64 {
        self.0
    }

    /// Seconds ahead of the local clock; negative when in the past.
    #[must_use]
    pub fn offset_from_now(&self) -> i64 {
        self.0.saturating_sub(Self::now().0)
    }

    /// `true` if plausible and within `max_skew_secs` of now in either
    /// direction.
    #[must_use]
    pub fn is_recent(&self, max_skew_secs: u64) -> bool {
        self.0 >= EARLIEST_PLAUSIBLE && self.offset_from_now().unsigned_abs() <= max_skew_secs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_is_recent() {
        assert!(Timestamp::now().is_recent(1));
    }

    #[test]
    fn test_skew_both_directions() {
        let now = Timestamp::now().as_secs();

        assert!(Timestamp::from_secs(now - 60).is_recent(120));
        assert!(!Timestamp::from_secs(now - 600).is_recent(120));
        assert!(Timestamp::from_secs(now + 60).is_recent(120));
        assert!(!Timestamp::from_secs(now + 600).is_recent(120));
    }

    #[test]
    fn test_broken_clock_never_recent() {
        assert!(!Timestamp::from_secs(0).is_recent(u64::MAX));
        assert!(!Timestamp::from_secs(EARLIEST_PLAUSIBLE - 1).is_recent(u64::MAX));
    }

    #[test]
    fn test_offset_sign() {
        let now = Timestamp::now().as_secs();
        assert!(Timestamp::from_secs(now + 100).offset_from_now() > 0);
        assert!(Timestamp::from_secs(now - 100).offset_from_now() < 0);
    }
}
