// ============================================
// File: crates/palaver-core/src/protocol/mod.rs
// ============================================
//! # Protocol Module
//!
//! ## Creation Reason
//! Defines the wire protocol two palaver peers speak through the chat
//! transport: binary messages, their codec, and the text armor that
//! carries them.
//!
//! ### Submodules
//! - [`messages`]: Protocol message structures
//! - [`codec`]: Binary serialization/deserialization
//! - [`version`]: Protocol versioning
//! - [`frame`]: Start/end marker armoring
//!
//! ## Protocol Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Handshake Phase                          │
//! │                                                             │
//! │  Initiator ───────── Offer (138 bytes) ──────────► Responder│
//! │  Initiator ◄──────── Ack   (146 bytes) ─────────── Responder│
//! │                                                             │
//! ├─────────────────────────────────────────────────────────────┤
//! │                    Transport Phase                          │
//! │                                                             │
//! │  Initiator ═══════ Data / Close (encrypted) ═════ Responder │
//! │                                                             │
//! └─────────────────────────────────────────────────────────────┘
//!          every message travels as  ?PLV:<base64>.
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - ANY wire change requires a version bump
//!
//! ## Last Modified
//! v0.1.0 - Initial protocol definitions

pub mod codec;
pub mod frame;
pub mod messages;
pub mod version;

// Re-export primary types
pub use codec::{Codec, ProtocolCodec};
pub use frame::{armor, dearmor, is_complete, is_tagged, END_MARKER, START_MARKER};
pub use messages::{Ack, MessageType, Offer, Packet};
pub use version::{ProtocolVersion, CURRENT_PROTOCOL_VERSION};
