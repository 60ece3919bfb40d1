// ============================================
// File: crates/palaver-agent/src/agent.rs
// ============================================
//! # Agent Run Loop
//!
//! ## Creation Reason
//! Connects an [`Orchestrator`] to a [`LineTransport`]: reads host input,
//! runs the matching operation, writes outbound lines and reports
//! everything meant for the user as [`HostEvent`]s.
//!
//! ## Main Functionality
//! ```text
//! ┌──────────────┐  recv_line   ┌──────────┐  start/receive/   ┌──────────────┐
//! │ LineTransport│─────────────►│  Agent   │──send/stop───────►│ Orchestrator │
//! │              │◄─────────────│          │◄──────────────────│              │
//! └──────────────┘  send_line   └────┬─────┘     Outcome       └──────────────┘
//!                                    │ HostEvent (mpsc)
//!                                    ▼
//!                              host / terminal
//! ```
//! - A cleanup tick prunes expired fragments
//! - Operation errors become `HostEvent::Error`; only transport write
//!   failures end the loop
//!
//! ## ⚠️ Important Note for Next Developer
//! - Events are sent with `try_send`; a full channel drops events rather
//!   than stalling the transport
//!
//! ## Last Modified
//! v0.1.0 - Initial run loop

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use palaver_common::Nickname;
use palaver_core::Fingerprint;
use palaver_transport::LineTransport;

use crate::commands::HostCommand;
use crate::error::{AgentError, ErrorKind, Result};
use crate::orchestrator::{Disposition, Orchestrator, Outcome, Verification};
use crate::services::SessionState;

/// Capacity of the host event channel.
const EVENT_CHANNEL_SIZE: usize = 1000;

/// Default interval between fragment cleanup passes.
const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

// ============================================
// HostEvent
// ============================================

/// Something to show the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    /// A line to display as received.
    Display(String),
    /// Keys to compare with the peer out-of-band.
    Verify {
        /// Peer nickname
        nick: String,
        /// Local and peer keys
        verification: Verification,
    },
    /// A session ended.
    Closed {
        /// Peer nickname
        nick: String,
    },
    /// The process identity fingerprint.
    Fingerprint(Fingerprint),
    /// Current sessions.
    Sessions(Vec<(Nickname, SessionState)>),
    /// An operation failed.
    Error {
        /// Classification
        kind: ErrorKind,
        /// Human-readable description
        message: String,
    },
}

impl HostEvent {
    fn from_error(err: &AgentError) -> Self {
        Self::Error {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

// ============================================
// Agent
// ============================================

/// Drives an orchestrator from a line transport.
pub struct Agent<T: LineTransport> {
    orchestrator: Arc<Orchestrator>,
    transport: Arc<T>,
    events: mpsc::Sender<HostEvent>,
    cleanup_interval: Duration,
    shutdown: AtomicBool,
    shutdown_tx: broadcast::Sender<()>,
}

impl<T: LineTransport> Agent<T> {
    /// Creates an agent and the receiver for its host events.
    pub fn new(orchestrator: Arc<Orchestrator>, transport: Arc<T>) -> (Self, mpsc::Receiver<HostEvent>) {
        let (events, events_rx) = mpsc::channel(EVENT_CHANNEL_SIZE);
        let (shutdown_tx, _) = broadcast::channel(1);
        let agent = Self {
            orchestrator,
            transport,
            events,
            cleanup_interval: DEFAULT_CLEANUP_INTERVAL,
            shutdown: AtomicBool::new(false),
            shutdown_tx,
        };
        (agent, events_rx)
    }

    /// Sets how often expired fragments are pruned.
    #[must_use]
    pub fn with_cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval = interval;
        self
    }

    /// Returns the orchestrator.
    #[must_use]
    pub fn orchestrator(&self) -> &Arc<Orchestrator> {
        &self.orchestrator
    }

    /// Runs until the input ends or [`shutdown`](Self::shutdown) is called.
    ///
    /// # Errors
    /// Returns error if the transport fails.
    pub async fn run(&self) -> Result<()> {
        info!(
            fingerprint = %self.orchestrator.local_key().fingerprint(),
            "Agent started"
        );
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let mut cleanup = tokio::time::interval(self.cleanup_interval);

        while !self.shutdown.load(Ordering::SeqCst) {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    debug!("Agent received shutdown signal");
                    break;
                }
                _ = cleanup.tick() => {
                    let pruned = self.orchestrator.prune_expired_fragments();
                    if pruned > 0 {
                        debug!(pruned, "Cleanup cycle complete");
                    }
                }
                line = self.transport.recv_line() => match line? {
                    Some(line) => self.handle_line(&line).await?,
                    None => {
                        debug!("Input exhausted");
                        break;
                    }
                },
            }
        }

        self.transport.shutdown().await?;
        info!(sessions = self.orchestrator.session_count(), "Agent stopped");
        Ok(())
    }

    /// Handles one line of host input.
    ///
    /// # Errors
    /// Returns error only if an outbound line cannot be written.
    pub async fn handle_line(&self, line: &str) -> Result<()> {
        let command = match HostCommand::parse(line) {
            Ok(command) => command,
            Err(e) => {
                self.emit(HostEvent::from_error(&e));
                return Ok(());
            }
        };

        let result = match command {
            HostCommand::Start(nick) => self.orchestrator.start(&nick),
            HostCommand::Stop(nick) => self.orchestrator.stop(&nick),
            HostCommand::Message { target, text } => self.orchestrator.send(&target, &text),
            HostCommand::Inbound(raw) => self.orchestrator.receive(&raw),
            HostCommand::Fingerprint => {
                self.emit(HostEvent::Fingerprint(self.orchestrator.local_key().fingerprint()));
                return Ok(());
            }
            HostCommand::Sessions => {
                self.emit(HostEvent::Sessions(self.orchestrator.sessions()));
                return Ok(());
            }
        };

        match result {
            Ok(outcome) => self.dispatch(outcome).await,
            Err(e) => {
                debug!(kind = %e.kind(), error = %e, "Operation failed");
                self.emit(HostEvent::from_error(&e));
                Ok(())
            }
        }
    }

    async fn dispatch(&self, outcome: Outcome) -> Result<()> {
        if let Some(line) = &outcome.outbound {
            self.transport.send_line(line).await?;
        }
        if let Some(display) = outcome.display {
            self.emit(HostEvent::Display(display));
        }
        if let Some(verification) = outcome.verification {
            self.emit(HostEvent::Verify {
                nick: outcome.peer.clone(),
                verification,
            });
        }
        if outcome.disposition == Disposition::Closed {
            self.emit(HostEvent::Closed { nick: outcome.peer });
        }
        Ok(())
    }

    fn emit(&self, event: HostEvent) {
        if self.events.try_send(event).is_err() {
            warn!("Host event channel full or closed, event dropped");
        }
    }

    /// Stops [`run`](Self::run) at its next iteration.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
        let _ = self.shutdown_tx.send(());
    }
}

impl<T: LineTransport> std::fmt::Debug for Agent<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("orchestrator", &self.orchestrator)
            .field("cleanup_interval", &self.cleanup_interval)
            .finish_non_exhaustive()
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use palaver_core::IdentityKeyPair;
    use palaver_transport::MockLineTransport;

    use super::*;
    use crate::config::AgentConfig;

    fn agent() -> (Agent<MockLineTransport>, mpsc::Receiver<HostEvent>, Arc<MockLineTransport>) {
        let orchestrator = Arc::new(Orchestrator::from_config(
            &AgentConfig::default(),
            Arc::new(IdentityKeyPair::generate()),
        ));
        let transport = Arc::new(MockLineTransport::default());
        let (agent, events) = Agent::new(orchestrator, Arc::clone(&transport));
        (agent, events, transport)
    }

    #[tokio::test]
    async fn test_start_writes_offer() {
        let (agent, _events, transport) = agent();
        agent.handle_line("/start bob").await.unwrap();

        let sent = transport.take_sent_lines();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].starts_with("PRIVMSG bob :?PLV:"));
    }

    #[tokio::test]
    async fn test_errors_become_events() {
        let (agent, mut events, transport) = agent();
        agent.handle_line("/stop ghost").await.unwrap();
        agent.handle_line("garbage").await.unwrap();

        assert!(matches!(
            events.recv().await,
            Some(HostEvent::Error { kind: ErrorKind::NoSuchSession, .. })
        ));
        assert!(matches!(
            events.recv().await,
            Some(HostEvent::Error { kind: ErrorKind::MalformedLine, .. })
        ));
        assert!(transport.take_sent_lines().is_empty());
    }

    #[tokio::test]
    async fn test_fingerprint_command() {
        let (agent, mut events, _transport) = agent();
        agent.handle_line("/fingerprint").await.unwrap();

        let expected = agent.orchestrator().local_key().fingerprint();
        assert_eq!(events.recv().await, Some(HostEvent::Fingerprint(expected)));
    }

    #[tokio::test]
    async fn test_run_until_input_exhausted() {
        let (agent, mut events, transport) = agent();
        transport.inject_line(":alice!a@host PRIVMSG bob :plain hello");
        transport.inject_line("/msg carol hi");
        transport.close_input();

        agent.run().await.unwrap();

        assert_eq!(
            events.recv().await,
            Some(HostEvent::Display(":alice!a@host PRIVMSG bob :plain hello".into()))
        );
        assert_eq!(transport.take_sent_lines(), vec!["PRIVMSG carol :hi"]);
        assert!(!transport.is_active());
    }

    #[tokio::test]
    async fn test_shutdown_stops_run() {
        let (agent, _events, transport) = agent();
        let agent = Arc::new(agent);
        let runner = {
            let agent = Arc::clone(&agent);
            tokio::spawn(async move { agent.run().await })
        };

        tokio::task::yield_now().await;
        agent.shutdown();
        runner.await.unwrap().unwrap();
        assert!(!transport.is_active());
    }
}
