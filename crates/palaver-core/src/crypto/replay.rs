// ============================================
// File: crates/palaver-core/src/crypto/replay.rs
// ============================================
//! # Replay Window
//!
//! ## Creation Reason
//! A captured Data line re-posted to the channel would otherwise decrypt
//! a second time. Each inbound direction tracks the counters it has
//! accepted.
//!
//! ## Algorithm
//! ```text
//!   bit 63 ............................ bit 0
//!   ┌──────────────────────────────────────┐
//!   │ seen(highest-63)  ...   seen(highest)│
//!   └──────────────────────────────────────┘
//!
//! counter > highest          → accept, shift window forward
//! highest-63 <= counter      → accept once (bit clear), else replay
//! counter < highest-63 or 0  → reject (too old)
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Record a counter only AFTER its packet authenticated, otherwise a
//!   forged packet can burn legitimate counters.
//!
//! ## Last Modified
//! v0.1.0 - Initial replay tracking

use crate::error::{CoreError, Result};

/// Number of counters tracked behind the highest one seen.
pub const REPLAY_WINDOW_SIZE: u64 = 64;

/// Sliding window anti-replay state for one inbound direction.
#[derive(Debug, Clone, Default)]
pub struct ReplayWindow {
    /// Highest counter accepted so far, 0 before the first packet.
    highest: u64,
    /// Bit `n` set means `highest - n` was accepted.
    seen: u64,
}

impl ReplayWindow {
    /// Creates an empty window.
    #[must_use]
    pub const fn new() -> Self {
        Self { highest: 0, seen: 0 }
    }

    /// Accepts and records `counter`, or explains why it is rejected.
    ///
    /// # Errors
    /// `ReplayDetected` for counter 0, duplicates and counters that fell
    /// out of the window.
    pub fn check_and_record(&mut self, counter: u64) -> Result<()> {
        if counter == 0 {
            return Err(CoreError::replay(counter, self.highest));
        }

        if counter > self.highest {
            let advance = counter - self.highest;
            self.seen = if advance >= REPLAY_WINDOW_SIZE {
                0
            } else {
                self.seen << advance
            };
            self.seen |= 1;
            self.highest = counter;
            return Ok(());
        }

        let offset = self.highest - counter;
        if offset >= REPLAY_WINDOW_SIZE {
            return Err(CoreError::replay(counter, self.highest));
        }

        let bit = 1u64 << offset;
        if self.seen & bit != 0 {
            return Err(CoreError::replay(counter, self.highest));
        }
        self.seen |= bit;
        Ok(())
    }

    /// Returns the highest accepted counter.
    #[must_use]
    pub const fn highest_seen(&self) -> u64 {
        self.highest
    }
}
