// ============================================
// File: crates/palaver-agent/src/services/mod.rs
// ============================================
//! # Agent Services
//!
//! ## Creation Reason
//! Holds the state the orchestrator mutates, separated from the control
//! logic that drives it.
//!
//! ### Submodules
//! - [`registry`]: per-peer sessions and their lifecycle state
//! - [`fragments`]: reassembly of split protocol messages
//!
//! ## ⚠️ Important Note for Next Developer
//! - Neither service locks internally; both live behind the orchestrator's
//!   single mutex
//!
//! ## Last Modified
//! v0.1.0 - Initial services structure

pub mod fragments;
pub mod registry;

// Re-export primary types
pub use fragments::{FragmentLimits, FragmentReassembler};
pub use registry::{PeerSession, SessionRegistry, SessionState};
