//! Configuration module for ocdplot-rs
//!
//! This module handles the session configuration:
//! - Debug server endpoint and timeouts
//! - The variable to observe (address, representation, access width)
//! - Sampling interval and window horizon
//! - Optional recording of samples to disk
//!
//! # Config Location
//!
//! The configuration is stored as TOML in the platform-appropriate location:
//! - **Linux**: `~/.config/ocdplot-rs/config.toml`
//! - **macOS**: `~/Library/Application Support/ocdplot-rs/config.toml`
//! - **Windows**: `%APPDATA%\ocdplot-rs\config.toml`
//!
//! The `OCDPLOT_CONFIG` environment variable overrides the location.
//!
//! # Example
//!
//! ```ignore
//! use ocdplot_rs::config::AppConfig;
//!
//! let mut config = AppConfig::load_or_default(AppConfig::default_path().unwrap());
//! config.variable.address = "0x20000010".to_string();
//! config.validate()?;
//! ```

use crate::error::{OcdError, Result};
use crate::types::{AccessWidth, ReadCommand, Representation};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application identifier for config directories
pub const APP_ID: &str = "ocdplot-rs";

/// Config filename
pub const CONFIG_FILE: &str = "config.toml";

/// Environment variable overriding the config path
pub const CONFIG_ENV_VAR: &str = "OCDPLOT_CONFIG";

/// Default debug server host
pub const DEFAULT_HOST: &str = "localhost";

/// Default OpenOCD telnet port
pub const DEFAULT_PORT: u16 = 4444;

/// Default sampling interval in milliseconds
pub const DEFAULT_INTERVAL_MS: u64 = 1000;

/// Default window horizon in samples
pub const DEFAULT_HORIZON: u64 = 30;

/// Default connect timeout in milliseconds
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 3000;

/// Default read timeout in milliseconds (0 = wait for the prompt indefinitely)
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 0;

// ==================== Config Location ====================

/// Get the configuration directory path
pub fn config_dir() -> Option<PathBuf> {
    dirs_next::config_dir().map(|p| p.join(APP_ID))
}

/// Resolve the config file path, honoring `OCDPLOT_CONFIG`
pub fn config_path() -> Option<PathBuf> {
    match std::env::var_os(CONFIG_ENV_VAR) {
        Some(path) if !path.is_empty() => Some(PathBuf::from(path)),
        _ => config_dir().map(|p| p.join(CONFIG_FILE)),
    }
}

// ==================== App Config ====================

/// Complete configuration for a sampling session
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct AppConfig {
    /// Debug server endpoint
    #[serde(default)]
    pub target: TargetConfig,

    /// Variable to observe
    #[serde(default)]
    pub variable: VariableConfig,

    /// Sampling loop configuration
    #[serde(default)]
    pub sampling: SamplingConfig,

    /// Sample recording configuration
    #[serde(default)]
    pub recording: RecordingConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Default config file location
    pub fn default_path() -> Option<PathBuf> {
        config_path()
    }

    /// Load a config file from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            OcdError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        Self::from_toml(&content)
            .map_err(|e| e.with_context(format!("Failed to parse config file {:?}", path)))
    }

    /// Load a config file, returning defaults if any error occurs
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load(path.as_ref()) {
            Ok(config) => config,
            Err(e) => {
                tracing::debug!("Using default configuration: {}", e);
                Self::default()
            }
        }
    }

    /// Parse a config from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| OcdError::Config(e.to_string()))
    }

    /// Serialize the config to TOML text
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| OcdError::Config(format!("Failed to serialize config: {}", e)))
    }

    /// Save the config to disk as TOML
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                OcdError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        std::fs::write(path, self.to_toml()?).map_err(|e| {
            OcdError::Config(format!("Failed to write config file {:?}: {}", path, e))
        })
    }

    /// Check the configuration for values a session cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.target.host.trim().is_empty() {
            return Err(OcdError::Config("target host is empty".to_string()));
        }
        if self.target.port == 0 {
            return Err(OcdError::Config("target port must be non-zero".to_string()));
        }
        if self.sampling.interval_ms == 0 {
            return Err(OcdError::Config(
                "sampling interval must be at least 1 ms".to_string(),
            ));
        }
        if self.sampling.horizon == 0 {
            return Err(OcdError::Config(
                "window horizon must be at least 1 sample".to_string(),
            ));
        }
        if self.recording.enabled && self.recording.file_path.is_none() {
            return Err(OcdError::Config(
                "recording is enabled but no file path is set".to_string(),
            ));
        }
        self.variable.check_width()?;
        self.variable.read_command().map(|_| ())
    }
}

// ==================== Target Config ====================

/// Debug server connection configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TargetConfig {
    /// Host running the debug server
    pub host: String,

    /// Telnet port of the debug server
    pub port: u16,

    /// Connect timeout in milliseconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,

    /// Read timeout in milliseconds (0 = block until the prompt arrives)
    #[serde(default = "default_read_timeout")]
    pub read_timeout_ms: u64,
}

fn default_connect_timeout() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_MS
}

fn default_read_timeout() -> u64 {
    DEFAULT_READ_TIMEOUT_MS
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            read_timeout_ms: DEFAULT_READ_TIMEOUT_MS,
        }
    }
}

impl TargetConfig {
    /// Create a config for the given endpoint with default timeouts
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    /// Read timeout as a socket option value
    pub fn read_timeout(&self) -> Option<Duration> {
        (self.read_timeout_ms > 0).then(|| Duration::from_millis(self.read_timeout_ms))
    }
}

// ==================== Variable Config ====================

/// The variable to observe
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VariableConfig {
    /// Hex address, e.g. `0x20000000`
    pub address: String,

    /// Binary representation of the variable
    #[serde(rename = "type", default)]
    pub representation: Representation,

    /// Memory display width
    #[serde(default)]
    pub width: AccessWidth,
}

impl Default for VariableConfig {
    fn default() -> Self {
        Self {
            address: "0x20000000".to_string(),
            representation: Representation::Float32,
            width: AccessWidth::Word,
        }
    }
}

impl VariableConfig {
    /// Build the read command for this variable
    pub fn read_command(&self) -> Result<ReadCommand> {
        ReadCommand::new(self.address.clone(), self.width)
    }

    /// Reject an access width narrower than the representation
    ///
    /// A halfword or byte read cannot fill a 32-bit pattern, so decoding it
    /// as `float` would only produce denormal garbage.
    pub fn check_width(&self) -> Result<()> {
        let read_bits = self.width.size_bytes() as u32 * 8;
        if read_bits != self.representation.bit_width() {
            return Err(OcdError::Decode(format!(
                "{} is {} bits wide but '{}' reads {} bits",
                self.representation.c_name(),
                self.representation.bit_width(),
                self.width.mnemonic(),
                read_bits
            )));
        }
        Ok(())
    }
}

// ==================== Sampling Config ====================

/// Sampling loop configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SamplingConfig {
    /// Milliseconds between samples
    pub interval_ms: u64,

    /// Number of sample indices per display window
    #[serde(default = "default_horizon")]
    pub horizon: u64,

    /// Reset the target before the first sample
    #[serde(default = "default_true")]
    pub reset_on_start: bool,

    /// Capacity of the sample channel to the presentation layer
    #[serde(default = "default_channel_buffer_size")]
    pub channel_buffer_size: usize,
}

fn default_horizon() -> u64 {
    DEFAULT_HORIZON
}

fn default_true() -> bool {
    true
}

fn default_channel_buffer_size() -> usize {
    1024
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_INTERVAL_MS,
            horizon: DEFAULT_HORIZON,
            reset_on_start: true,
            channel_buffer_size: 1024,
        }
    }
}

impl SamplingConfig {
    /// Sampling interval as a duration
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

// ==================== Recording Config ====================

/// Configuration for recording emitted samples to a file
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct RecordingConfig {
    /// Whether recording is enabled
    #[serde(default)]
    pub enabled: bool,

    /// Output file
    #[serde(default)]
    pub file_path: Option<PathBuf>,

    /// Output format
    #[serde(default)]
    pub format: RecordFormat,

    /// Append to an existing file instead of truncating it
    #[serde(default)]
    pub append: bool,
}

/// Format for recorded samples
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RecordFormat {
    /// CSV format - human readable, easy to import into spreadsheets
    #[default]
    Csv,
    /// JSON Lines format - one JSON object per line
    JsonLines,
}

impl std::fmt::Display for RecordFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordFormat::Csv => write!(f, "CSV"),
            RecordFormat::JsonLines => write!(f, "JSON Lines"),
        }
    }
}

// ==================== Logging Config ====================

/// Logging configuration for the binary
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is not set
    #[serde(default)]
    pub filter: Option<String>,

    /// Directory for a daily-rotated log file (disabled when unset)
    #[serde(default)]
    pub directory: Option<PathBuf>,
}

// ==================== Tests ====================
