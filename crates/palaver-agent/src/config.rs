// ============================================
// File: crates/palaver-agent/src/config.rs
// ============================================
//! # Agent Configuration
//!
//! ## Creation Reason
//! Collects the tunables of the agent (transport limits, reassembly
//! bounds, handshake freshness, log level) in one TOML document.
//!
//! ## Main Functionality
//! - `AgentConfig`: Main configuration structure
//! - TOML file loading and parsing
//! - Configuration validation
//! - Default values for every field
//!
//! ## Configuration Sections
//! - `transport`: message command, maximum line length
//! - `fragments`: reassembly bounds
//! - `handshake`: accepted clock skew on offers
//! - `logging`: Log level
//!
//! ## Example Configuration
//! ```toml
//! [transport]
//! command = "PRIVMSG"
//! max_line_len = 512
//!
//! [fragments]
//! max_pending = 64
//! max_fragment_bytes = 65536
//! fragment_ttl_secs = 300
//!
//! [handshake]
//! max_timestamp_skew_secs = 600
//!
//! [logging]
//! level = "info"
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Every section is optional; a missing file means all defaults
//! - `max_line_len` counts the trailing CRLF
//!
//! ## Last Modified
//! v0.1.0 - Initial configuration implementation

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use palaver_transport::DEFAULT_COMMAND;

use crate::error::{AgentError, Result};
use crate::services::fragments::FragmentLimits;

/// Smallest line length that still leaves room for a 64-byte target.
pub const MIN_LINE_LEN: usize = 128;

/// Largest line length accepted.
pub const MAX_LINE_LEN: usize = 8192;

/// Smallest reassembly limit; an armored Ack must always fit.
pub const MIN_FRAGMENT_BYTES: usize = 1024;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

// ============================================
// AgentConfig
// ============================================

/// Main agent configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Transport line settings.
    #[serde(default)]
    pub transport: TransportConfig,

    /// Fragment reassembly bounds.
    #[serde(default)]
    pub fragments: FragmentConfig,

    /// Handshake settings.
    #[serde(default)]
    pub handshake: HandshakeConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AgentConfig {
    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    /// Returns error if file cannot be read, parsed or validated.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let path_str = path.display().to_string();

        info!(path = %path_str, "Loading configuration");

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| AgentError::config_load(&path_str, e.to_string()))?;

        let config = Self::parse_with_origin(&content, &path_str)?;

        info!("Configuration loaded successfully");
        Ok(config)
    }

    fn parse_with_origin(content: &str, origin: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| AgentError::config_load(origin, e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    /// `ConfigInvalid` naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        self.transport.validate()?;
        self.fragments.validate()?;
        self.handshake.validate()?;
        self.logging.validate()
    }

    /// Serializes configuration to TOML string.
    #[must_use]
    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_default()
    }
}

impl FromStr for AgentConfig {
    type Err = AgentError;

    fn from_str(content: &str) -> Result<Self> {
        Self::parse_with_origin(content, "<string>")
    }
}

// ============================================
// TransportConfig
// ============================================

/// Transport configuration section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Message-delivery command.
    #[serde(default = "default_command")]
    pub command: String,

    /// Maximum line length in bytes, CRLF included.
    #[serde(default = "default_max_line_len")]
    pub max_line_len: usize,
}

fn default_command() -> String {
    DEFAULT_COMMAND.to_string()
}

const fn default_max_line_len() -> usize {
    512
}

impl TransportConfig {
    fn validate(&self) -> Result<()> {
        if self.command.is_empty() || !self.command.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(AgentError::config_invalid(
                "transport.command",
                "must be a non-empty alphanumeric command",
            ));
        }
        if !(MIN_LINE_LEN..=MAX_LINE_LEN).contains(&self.max_line_len) {
            return Err(AgentError::config_invalid(
                "transport.max_line_len",
                format!("must be between {MIN_LINE_LEN} and {MAX_LINE_LEN}"),
            ));
        }
        Ok(())
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            command: default_command(),
            max_line_len: default_max_line_len(),
        }
    }
}

// ============================================
// FragmentConfig
// ============================================

/// Fragment reassembly section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FragmentConfig {
    /// Maximum number of senders with a partial message in flight.
    #[serde(default = "default_max_pending")]
    pub max_pending: usize,

    /// Maximum size of one partial message.
    #[serde(default = "default_max_fragment_bytes")]
    pub max_fragment_bytes: usize,

    /// Seconds after which an untouched partial is discarded.
    #[serde(default = "default_fragment_ttl_secs")]
    pub fragment_ttl_secs: u64,
}

const fn default_max_pending() -> usize {
    64
}

const fn default_max_fragment_bytes() -> usize {
    64 * 1024
}

const fn default_fragment_ttl_secs() -> u64 {
    300
}

impl FragmentConfig {
    fn validate(&self) -> Result<()> {
        if self.max_pending == 0 {
            return Err(AgentError::config_invalid(
                "fragments.max_pending",
                "must be at least 1",
            ));
        }
        if self.max_fragment_bytes < MIN_FRAGMENT_BYTES {
            return Err(AgentError::config_invalid(
                "fragments.max_fragment_bytes",
                format!("must be at least {MIN_FRAGMENT_BYTES}"),
            ));
        }
        if self.fragment_ttl_secs == 0 {
            return Err(AgentError::config_invalid(
                "fragments.fragment_ttl_secs",
                "must be at least 1",
            ));
        }
        Ok(())
    }

    /// Returns the reassembler bounds described by this section.
    #[must_use]
    pub const fn limits(&self) -> FragmentLimits {
        FragmentLimits {
            max_pending: self.max_pending,
            max_fragment_bytes: self.max_fragment_bytes,
            ttl: Duration::from_secs(self.fragment_ttl_secs),
        }
    }
}

impl Default for FragmentConfig {
    fn default() -> Self {
        Self {
            max_pending: default_max_pending(),
            max_fragment_bytes: default_max_fragment_bytes(),
            fragment_ttl_secs: default_fragment_ttl_secs(),
        }
    }
}

// ============================================
// HandshakeConfig
// ============================================

/// Handshake configuration section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandshakeConfig {
    /// Maximum accepted distance between an offer's timestamp and now.
    #[serde(default = "default_max_timestamp_skew_secs")]
    pub max_timestamp_skew_secs: u64,
}

const fn default_max_timestamp_skew_secs() -> u64 {
    600
}

impl HandshakeConfig {
    fn validate(&self) -> Result<()> {
        if self.max_timestamp_skew_secs == 0 {
            return Err(AgentError::config_invalid(
                "handshake.max_timestamp_skew_secs",
                "must be at least 1",
            ));
        }
        Ok(())
    }
}

impl Default for HandshakeConfig {
    fn default() -> Self {
        Self {
            max_timestamp_skew_secs: default_max_timestamp_skew_secs(),
        }
    }
}

// ============================================
// LoggingConfig
// ============================================

/// Logging configuration section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter level; `RUST_LOG` takes precedence.
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl LoggingConfig {
    fn validate(&self) -> Result<()> {
        if !LOG_LEVELS.contains(&self.level.to_ascii_lowercase().as_str()) {
            return Err(AgentError::config_invalid(
                "logging.level",
                format!("must be one of {}", LOG_LEVELS.join(", ")),
            ));
        }
        Ok(())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AgentConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.transport.command, "PRIVMSG");
        assert_eq!(config.transport.max_line_len, 512);
        assert_eq!(config.fragments.max_pending, 64);
        assert_eq!(config.fragments.max_fragment_bytes, 65536);
        assert_eq!(config.handshake.max_timestamp_skew_secs, 600);
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        let config: AgentConfig = "".parse().unwrap();
        assert_eq!(config, AgentConfig::default());
    }

    #[test]
    fn test_partial_document() {
        let config: AgentConfig = r#"
            [transport]
            max_line_len = 400

            [fragments]
            fragment_ttl_secs = 30
        "#
        .parse()
        .unwrap();

        assert_eq!(config.transport.max_line_len, 400);
        assert_eq!(config.transport.command, "PRIVMSG");
        assert_eq!(config.fragments.limits().ttl, Duration::from_secs(30));
        assert_eq!(config.fragments.max_pending, 64);
    }

    #[test]
    fn test_rejects_tiny_line_length() {
        let err = "[transport]\nmax_line_len = 40\n"
            .parse::<AgentConfig>()
            .unwrap_err();
        assert!(err.is_config_error());
        assert!(err.to_string().contains("transport.max_line_len"));
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!("[transport]\ncommand = \"PRIV MSG\"\n"
            .parse::<AgentConfig>()
            .is_err());
        assert!("[fragments]\nmax_pending = 0\n".parse::<AgentConfig>().is_err());
        assert!("[handshake]\nmax_timestamp_skew_secs = 0\n"
            .parse::<AgentConfig>()
            .is_err());
        assert!("[logging]\nlevel = \"loud\"\n".parse::<AgentConfig>().is_err());
    }

    #[test]
    fn test_unparseable_document() {
        let err = "[transport\n".parse::<AgentConfig>().unwrap_err();
        assert!(matches!(err, AgentError::ConfigLoad { .. }));
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = AgentConfig::default();
        let parsed: AgentConfig = config.to_toml().parse().unwrap();
        assert_eq!(parsed, config);
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let err = AgentConfig::load("/nonexistent/palaver.toml").await.unwrap_err();
        assert!(matches!(err, AgentError::ConfigLoad { .. }));
    }
}
