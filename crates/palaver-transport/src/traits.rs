// ============================================
// File: crates/palaver-transport/src/traits.rs
// ============================================
//! # Transport Traits
//!
//! ## Creation Reason
//! The agent loop reads raw lines and writes outbound lines without caring
//! whether they come from stdio, a socket or a test double.
//!
//! ## Main Functionality
//! - `LineTransport`: async line-oriented transport interface
//!
//! ## ⚠️ Important Note for Next Developer
//! - Implementations must be Send + Sync for use in async contexts
//! - `send_line` is responsible for splitting to the transport limit
//!
//! ## Last Modified
//! v0.1.0 - Initial trait definitions

use async_trait::async_trait;

use crate::error::Result;
use crate::line::OutboundLine;

/// Abstract interface for a line-oriented chat transport.
///
/// # Example
/// ```ignore
/// async fn pump<T: LineTransport>(transport: &T) -> Result<()> {
///     while let Some(raw) = transport.recv_line().await? {
///         let reply = handle(&raw);
///         transport.send_line(&reply).await?;
///     }
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait LineTransport: Send + Sync {
    /// Receives the next raw line, `None` once the transport is exhausted.
    ///
    /// # Errors
    /// Returns error if receive fails
    async fn recv_line(&self) -> Result<Option<String>>;

    /// Sends an outbound line, split as needed.
    ///
    /// # Errors
    /// Returns error if send fails
    async fn send_line(&self, line: &OutboundLine) -> Result<()>;

    /// Gracefully shuts down the transport.
    ///
    /// # Errors
    /// Returns error if shutdown fails
    async fn shutdown(&self) -> Result<()>;

    /// Returns `true` if the transport is still active.
    fn is_active(&self) -> bool;
}
