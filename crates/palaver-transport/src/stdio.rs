// ============================================
// File: crates/palaver-transport/src/stdio.rs
// ============================================
//! # Stdio Line Transport
//!
//! ## Creation Reason
//! The agent binary is driven by a host process over pipes: raw lines
//! arrive on stdin, outbound lines leave on stdout.
//!
//! ## ⚠️ Important Note for Next Developer
//! - Nothing but outbound lines may be written to stdout; diagnostics go
//!   to stderr through tracing
//!
//! ## Last Modified
//! v0.1.0 - Initial stdio binding

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin, Stdout};
use tokio::sync::Mutex;
use tracing::trace;

use crate::error::{Result, TransportError};
use crate::line::OutboundLine;
use crate::traits::LineTransport;

/// Line transport over the process's stdin and stdout.
pub struct StdioTransport {
    reader: Mutex<Lines<BufReader<Stdin>>>,
    writer: Mutex<Stdout>,
    max_line_len: usize,
    active: AtomicBool,
}

impl StdioTransport {
    /// Creates the transport, splitting outbound text at `max_line_len`.
    #[must_use]
    pub fn new(max_line_len: usize) -> Self {
        Self {
            reader: Mutex::new(BufReader::new(tokio::io::stdin()).lines()),
            writer: Mutex::new(tokio::io::stdout()),
            max_line_len,
            active: AtomicBool::new(true),
        }
    }
}

#[async_trait]
impl LineTransport for StdioTransport {
    async fn recv_line(&self) -> Result<Option<String>> {
        if !self.is_active() {
            return Err(TransportError::ShuttingDown);
        }
        let mut reader = self.reader.lock().await;
        reader
            .next_line()
            .await
            .map_err(|e| TransportError::io("reading stdin", e))
    }

    async fn send_line(&self, line: &OutboundLine) -> Result<()> {
        if !self.is_active() {
            return Err(TransportError::ShuttingDown);
        }

        let mut writer = self.writer.lock().await;
        for piece in line.wire_lines(self.max_line_len)? {
            trace!(target_nick = %line.target, len = piece.len(), "Writing line");
            writer
                .write_all(piece.as_bytes())
                .await
                .map_err(|e| TransportError::io("writing stdout", e))?;
            writer
                .write_all(b"\r\n")
                .await
                .map_err(|e| TransportError::io("writing stdout", e))?;
        }
        writer
            .flush()
            .await
            .map_err(|e| TransportError::io("flushing stdout", e))
    }

    async fn shutdown(&self) -> Result<()> {
        self.active.store(false, Ordering::Release);
        let mut writer = self.writer.lock().await;
        writer
            .flush()
            .await
            .map_err(|e| TransportError::io("flushing stdout", e))
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for StdioTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StdioTransport")
            .field("max_line_len", &self.max_line_len)
            .field("active", &self.is_active())
            .finish_non_exhaustive()
    }
}
