// ============================================
// File: crates/palaver-common/src/lib.rs
// ============================================
//! # Palaver Common - Shared Utilities Library
//!
//! ## Creation Reason
//! Provides the small set of types every palaver crate agrees on:
//! peer nicknames, session identifiers, wire timestamps and the base
//! error type.
//!
//! ## Main Functionality
//! - [`types`]: `Nickname` registry keys and `SessionId`
//! - [`time`]: Unix timestamps used in handshake messages
//! - [`error`]: Common error types and result aliases
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │               palaver-agent                         │
//! │                    │                                │
//! │         ┌──────────┴──────────┐                     │
//! │         ▼                     ▼                     │
//! │   palaver-core         palaver-transport            │
//! │         │                     │                     │
//! │         └──────────┬──────────┘                     │
//! │                    ▼                                │
//! │             palaver-common  ◄── You are here        │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - This crate is the foundation, changes ripple into every other crate
//! - Keep dependencies minimal
//! - Security-sensitive types must implement Zeroize
//!
//! ## Last Modified
//! v0.1.0 - Initial implementation

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod time;
pub mod types;

// Re-export commonly used items at crate root
pub use error::{CommonError, Result};
pub use types::{Nickname, SessionId};
