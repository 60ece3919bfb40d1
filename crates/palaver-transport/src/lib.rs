// ============================================
// File: crates/palaver-transport/src/lib.rs
// ============================================
//! # Palaver Transport - Chat Line Layer
//!
//! ## Creation Reason
//! Provides everything between the raw text of a chat connection and the
//! structured (sender, target, text) view the orchestrator works with.
//!
//! ## Main Functionality
//!
//! ### Modules
//! - [`line`]: inbound parsing, outbound lines, length splitting
//! - [`traits`]: `LineTransport` abstraction
//! - [`mock`]: in-memory transport for tests
//! - [`stdio`]: stdin/stdout binding used by the agent binary
//! - [`error`]: Transport-specific error types
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │               palaver-agent                         │
//! │                    │                                │
//! │         ┌──────────┴──────────┐                     │
//! │         ▼                     ▼                     │
//! │   palaver-core         palaver-transport            │
//! │                        You are here ◄──             │
//! │         │                     │                     │
//! │         └──────────┬──────────┘                     │
//! │                    ▼                                │
//! │             palaver-common                          │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Always use traits for testability
//! - The parser is transport-specific, keep its output transport-agnostic
//!
//! ## Last Modified
//! v0.1.0 - Initial transport layer implementation

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod line;
pub mod mock;
pub mod stdio;
pub mod traits;

// Re-export primary types
pub use error::{Result, TransportError};
pub use line::{parse_nick, InboundLine, LineParser, OutboundLine, DEFAULT_COMMAND};
pub use mock::MockLineTransport;
pub use stdio::StdioTransport;
pub use traits::LineTransport;
