// ============================================
// File: crates/palaver-agent/src/lib.rs
// ============================================
//! # Palaver Agent Library
//!
//! ## Creation Reason
//! Carries end-to-end encrypted conversations over a plain-text chat
//! transport, one cryptographic session per peer nickname, inside one
//! long-lived process.
//!
//! ## Main Functionality
//!
//! ### Modules
//! - [`orchestrator`]: Start / Receive / Send / Stop
//! - [`services`]: Business logic services
//!   - [`services::registry`]: per-peer sessions
//!   - [`services::fragments`]: reassembly of split protocol messages
//! - [`agent`]: async run loop over a line transport
//! - [`commands`]: host command parsing
//! - [`config`]: Agent configuration management
//! - [`error`]: Agent-specific error types
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         Palaver Agent                           │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │  ┌─────────────┐     ┌──────────────┐     ┌─────────────────┐   │
//! │  │   Config    │────►│    Agent     │────►│  Orchestrator   │   │
//! │  │             │     │  (run loop)  │     │                 │   │
//! │  └─────────────┘     └──────┬───────┘     └────────┬────────┘   │
//! │                             │                      │            │
//! │                             │            ┌─────────┴─────────┐  │
//! │                             │            ▼                   ▼  │
//! │                             │     ┌─────────────┐   ┌──────────┐│
//! │                             │     │  Session    │   │ Fragment ││
//! │                             │     │  Registry   │   │Reassembler│
//! │                             │     └─────────────┘   └──────────┘│
//! ├─────────────────────────────┼───────────────────────────────────┤
//! │                      Transport Layer                            │
//! │                 ┌───────────┴──────────┐                        │
//! │                 │  LineTransport       │                        │
//! │                 │  (stdio / mock)      │                        │
//! │                 └──────────────────────┘                        │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - The identity key is generated per process and never persisted
//! - Registry and reassembler share one lock inside the orchestrator
//!
//! ## Last Modified
//! v0.1.0 - Initial agent library

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod agent;
pub mod commands;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod services;

// Re-export primary types
pub use agent::{Agent, HostEvent};
pub use commands::HostCommand;
pub use config::AgentConfig;
pub use error::{AgentError, ErrorKind, Result};
pub use orchestrator::{Disposition, Orchestrator, Outcome, Verification};
pub use services::SessionState;
