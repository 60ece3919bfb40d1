// ============================================
// File: crates/palaver-agent/src/main.rs
// ============================================
//! # Palaver Agent Entry Point
//!
//! ## Creation Reason
//! Runs the agent as a filter process: a chat client pipes raw inbound
//! lines and slash commands to stdin, and writes whatever appears on
//! stdout to the server.
//!
//! ## Usage
//! ```bash
//! palaver-agent run --config palaver.toml
//! palaver-agent validate --config palaver.toml
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - stdout carries protocol lines only; everything for the user goes to
//!   stderr
//! - A fresh identity is generated on every start
//!
//! ## Last Modified
//! v0.1.0 - Initial CLI implementation

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use palaver_agent::{Agent, AgentConfig, HostEvent, Orchestrator};
use palaver_core::IdentityKeyPair;
use palaver_transport::StdioTransport;

// ============================================
// CLI Definition
// ============================================

/// Palaver end-to-end session agent
#[derive(Parser, Debug)]
#[command(name = "palaver-agent")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the agent over stdin/stdout
    Run {
        /// Path to configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Validate configuration file
    Validate {
        /// Path to configuration file
        #[arg(short, long, default_value = "palaver.toml")]
        config: PathBuf,
    },
}

// ============================================
// Main
// ============================================

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_logging("info");

    let result = match cli.command {
        Commands::Run { config } => cmd_run(config).await,
        Commands::Validate { config } => cmd_validate(&config).await,
    };

    if let Err(e) = result {
        error!("{:#}", e);
        std::process::exit(1);
    }

    // stdin's blocking reader would otherwise hold the runtime open
    std::process::exit(0);
}

// ============================================
// Commands
// ============================================

/// Runs the agent until stdin closes or Ctrl+C.
async fn cmd_run(config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let config = match config_path {
        Some(path) => AgentConfig::load(&path).await?,
        None => AgentConfig::default(),
    };

    init_logging(&config.logging.level);

    let identity = Arc::new(IdentityKeyPair::generate());
    let orchestrator = Arc::new(Orchestrator::from_config(&config, identity));
    let transport = Arc::new(StdioTransport::new(config.transport.max_line_len));
    let (agent, events) = Agent::new(Arc::clone(&orchestrator), transport);
    let agent = Arc::new(agent);

    eprintln!("Your fingerprint: {}", orchestrator.local_key().fingerprint());

    let printer = tokio::spawn(print_events(events));
    let signal = {
        let agent = Arc::clone(&agent);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Received shutdown signal");
                agent.shutdown();
            }
        })
    };

    let result = agent.run().await;
    signal.abort();
    let _ = signal.await;
    drop(agent);
    printer.await?;

    result?;
    Ok(())
}

/// Validates configuration file.
async fn cmd_validate(config_path: &Path) -> anyhow::Result<()> {
    let config = AgentConfig::load(config_path).await?;

    println!("✅ Configuration is valid");
    println!();
    println!("Transport:");
    println!("   Command:        {}", config.transport.command);
    println!("   Max Line:       {} bytes", config.transport.max_line_len);
    println!();
    println!("Fragments:");
    println!("   Max Pending:    {}", config.fragments.max_pending);
    println!("   Max Size:       {} bytes", config.fragments.max_fragment_bytes);
    println!("   TTL:            {}s", config.fragments.fragment_ttl_secs);
    println!();
    println!("Handshake:");
    println!("   Max Skew:       {}s", config.handshake.max_timestamp_skew_secs);
    println!();

    Ok(())
}

// ============================================
// Helper Functions
// ============================================

/// Writes host events to stderr until the agent is dropped.
async fn print_events(mut events: mpsc::Receiver<HostEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            HostEvent::Display(line) => eprintln!("{line}"),
            HostEvent::Verify { nick, verification } => {
                eprintln!("Verify with {nick} out-of-band:");
                eprintln!("   You:    {}", verification.local_fingerprint());
                eprintln!("   {nick}: {}", verification.peer_fingerprint());
            }
            HostEvent::Closed { nick } => eprintln!("Session with {nick} closed"),
            HostEvent::Fingerprint(fingerprint) => eprintln!("Your fingerprint: {fingerprint}"),
            HostEvent::Sessions(sessions) if sessions.is_empty() => eprintln!("No sessions"),
            HostEvent::Sessions(sessions) => {
                for (nick, state) in sessions {
                    eprintln!("   {nick}: {state}");
                }
            }
            HostEvent::Error { kind, message } => eprintln!("[{kind}] {message}"),
        }
    }
}

/// Initializes the tracing subscriber.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
        .with(filter)
        .try_init()
        .ok();
}
