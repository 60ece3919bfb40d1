// ============================================
// File: crates/palaver-transport/src/mock.rs
// ============================================
//! # Mock Line Transport
//!
//! ## Creation Reason
//! Lets agent tests wire two orchestrators together without a chat
//! server: injected lines are read back in order and every sent line is
//! captured in wire form.
//!
//! ## Usage in Tests
//! ```
//! use palaver_transport::{LineTransport, MockLineTransport, OutboundLine};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let transport = MockLineTransport::new(512);
//! transport.inject_line(":a!u@h PRIVMSG b :hi");
//! assert_eq!(transport.recv_line().await?.as_deref(), Some(":a!u@h PRIVMSG b :hi"));
//!
//! transport.send_line(&OutboundLine::new("PRIVMSG", "a", "yo")).await?;
//! assert_eq!(transport.take_sent_lines(), vec!["PRIVMSG a :yo"]);
//! # Ok(())
//! # }
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - This is for testing only
//! - Queues are bounded; overflow is reported, not silently dropped
//!
//! ## Last Modified
//! v0.1.0 - Initial mock implementation

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::error::{Result, TransportError};
use crate::line::OutboundLine;
use crate::traits::LineTransport;

/// Maximum number of lines to queue in either direction.
const MAX_QUEUE_SIZE: usize = 1000;

/// In-memory line transport for testing.
pub struct MockLineTransport {
    /// Line length limit applied when splitting outbound lines
    max_line_len: usize,
    /// Lines waiting to be read
    inbound: Mutex<VecDeque<String>>,
    /// Lines that have been sent, in wire form
    sent: Mutex<Vec<String>>,
    /// Whether the transport accepts operations
    active: AtomicBool,
    /// No more lines will be injected
    input_closed: AtomicBool,
    /// Wakes a pending `recv_line`
    notify: Notify,
}

impl MockLineTransport {
    /// Creates a mock splitting outbound text at `max_line_len` bytes.
    #[must_use]
    pub fn new(max_line_len: usize) -> Self {
        Self {
            max_line_len,
            inbound: Mutex::new(VecDeque::new()),
            sent: Mutex::new(Vec::new()),
            active: AtomicBool::new(true),
            input_closed: AtomicBool::new(false),
            notify: Notify::new(),
        }
    }

    /// Queues a raw line for the next `recv_line()`.
    ///
    /// Returns `false` if the queue is full.
    pub fn inject_line(&self, line: impl Into<String>) -> bool {
        let mut queue = self.inbound.lock();
        if queue.len() >= MAX_QUEUE_SIZE {
            return false;
        }
        queue.push_back(line.into());
        drop(queue);
        self.notify.notify_one();
        true
    }

    /// Marks the input exhausted; `recv_line` returns `None` once drained.
    pub fn close_input(&self) {
        self.input_closed.store(true, Ordering::Release);
        self.notify.notify_one();
    }

    /// Takes every line sent so far.
    #[must_use]
    pub fn take_sent_lines(&self) -> Vec<String> {
        std::mem::take(&mut *self.sent.lock())
    }

    /// Returns the number of lines waiting to be read.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.inbound.lock().len()
    }
}

impl Default for MockLineTransport {
    fn default() -> Self {
        Self::new(512)
    }
}

#[async_trait]
impl LineTransport for MockLineTransport {
    async fn recv_line(&self) -> Result<Option<String>> {
        loop {
            if !self.is_active() {
                return Err(TransportError::ShuttingDown);
            }
            let next = self.inbound.lock().pop_front();
            if let Some(line) = next {
                return Ok(Some(line));
            }
            if self.input_closed.load(Ordering::Acquire) {
                return Ok(None);
            }
            self.notify.notified().await;
        }
    }

    async fn send_line(&self, line: &OutboundLine) -> Result<()> {
        if !self.is_active() {
            return Err(TransportError::ShuttingDown);
        }

        let pieces = line.wire_lines(self.max_line_len)?;
        let mut sent = self.sent.lock();
        if sent.len() + pieces.len() > MAX_QUEUE_SIZE {
            return Err(TransportError::SendFailed {
                target: line.target.clone(),
                reason: "send queue full".into(),
            });
        }
        sent.extend(pieces);
        Ok(())
    }

    async fn shutdown(&self) -> Result<()> {
        self.active.store(false, Ordering::Release);
        self.notify.notify_one();
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for MockLineTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockLineTransport")
            .field("max_line_len", &self.max_line_len)
            .field("pending", &self.pending_count())
            .field("sent", &self.sent.lock().len())
            .field("active", &self.is_active())
            .finish()
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_inject_and_receive_in_order() {
        let transport = MockLineTransport::default();
        transport.inject_line("one");
        transport.inject_line("two");
        transport.close_input();

        assert_eq!(transport.recv_line().await.unwrap().as_deref(), Some("one"));
        assert_eq!(transport.recv_line().await.unwrap().as_deref(), Some("two"));
        assert_eq!(transport.recv_line().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_send_splits_long_text() {
        let transport = MockLineTransport::new(64);
        let line = OutboundLine::new("PRIVMSG", "bob", "y".repeat(200));
        transport.send_line(&line).await.unwrap();

        let sent = transport.take_sent_lines();
        assert!(sent.len() > 1);
        assert!(sent.iter().all(|l| l.len() + 2 <= 64));
        assert!(transport.take_sent_lines().is_empty());
    }

    #[tokio::test]
    async fn test_recv_wakes_on_injection() {
        let transport = std::sync::Arc::new(MockLineTransport::default());
        let reader = {
            let transport = std::sync::Arc::clone(&transport);
            tokio::spawn(async move { transport.recv_line().await })
        };

        tokio::task::yield_now().await;
        transport.inject_line("late");

        let got = reader.await.unwrap().unwrap();
        assert_eq!(got.as_deref(), Some("late"));
    }

    #[tokio::test]
    async fn test_shutdown_rejects_operations() {
        let transport = MockLineTransport::default();
        transport.shutdown().await.unwrap();
        assert!(!transport.is_active());
        assert!(matches!(
            transport.recv_line().await,
            Err(TransportError::ShuttingDown)
        ));
        assert!(transport
            .send_line(&OutboundLine::new("PRIVMSG", "x", "y"))
            .await
            .is_err());
    }
}
