//! Configuration management for the RM-01 switcher
//!
//! Every value has a default that reproduces the reference timings of the
//! board's switching procedure, so a configuration file is optional.

pub mod loader;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub use loader::ConfigLoader;

/// Default serial device exposed by the carrier board's USB-CDC console
pub const DEFAULT_DEVICE: &str = "/dev/ttyACM0";

/// Default regex for the device's forced-recovery completion message
pub const DEFAULT_COMPLETION_PATTERN: &str =
    r"(?i)force(d)?\s+recovery\s+(mode\s+)?(is\s+)?complete(d)?";

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Serial device path the board enumerates as
    pub device: PathBuf,

    /// Terminal program configuration
    pub terminal: TerminalConfig,

    /// Device presence polling
    pub device_watch: DeviceWatchConfig,

    /// Delays and timeouts of the command sequences
    pub timing: TimingConfig,

    /// Recovery completion detection
    pub recovery: RecoveryConfig,

    /// Operator interaction
    pub operator: OperatorConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            device: PathBuf::from(DEFAULT_DEVICE),
            terminal: TerminalConfig::default(),
            device_watch: DeviceWatchConfig::default(),
            timing: TimingConfig::default(),
            recovery: RecoveryConfig::default(),
            operator: OperatorConfig::default(),
        }
    }
}

impl Config {
    /// Device path as a display string
    pub fn device_name(&self) -> String {
        self.device.to_string_lossy().to_string()
    }

    /// Validate configuration values
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.device.as_os_str().is_empty() {
            return Err(ConfigError::EmptyDevice);
        }
        if self.terminal.program.trim().is_empty() {
            return Err(ConfigError::EmptyProgram);
        }
        if self.device_watch.poll_count == 0 {
            return Err(ConfigError::InvalidPollCount(self.device_watch.poll_count));
        }
        if self.terminal.connect_timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout("terminal.connect_timeout_secs"));
        }
        if self.timing.recovery_timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout("timing.recovery_timeout_secs"));
        }
        regex::Regex::new(&self.recovery.completion_pattern)
            .map_err(|e| ConfigError::InvalidPattern(e.to_string()))?;
        Ok(())
    }
}

/// Terminal program settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerminalConfig {
    /// Terminal program executable
    pub program: String,

    /// Flag that makes the program list serial devices
    pub list_flag: String,

    /// Timeout for the device listing command in seconds
    pub list_timeout_secs: u64,

    /// Timeout for the connection banner in seconds
    pub connect_timeout_secs: u64,

    /// Control byte that switches the program into command mode (Ctrl-T)
    pub escape_byte: u8,

    /// Key sent after the escape byte to quit the program
    pub quit_key: String,

    /// How long to wait for the program to exit before killing it
    pub close_grace_ms: u64,

    /// Terminal dimensions (cols, rows)
    pub dimensions: (u16, u16),
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            program: "tio".to_string(),
            list_flag: "-l".to_string(),
            list_timeout_secs: 5,
            connect_timeout_secs: 10,
            escape_byte: 0x14,
            quit_key: "q".to_string(),
            close_grace_ms: 500,
            dimensions: (80, 24),
        }
    }
}

impl TerminalConfig {
    pub fn list_timeout(&self) -> Duration {
        Duration::from_secs(self.list_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn close_grace(&self) -> Duration {
        Duration::from_millis(self.close_grace_ms)
    }
}

/// Device polling settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceWatchConfig {
    /// Number of presence checks before giving up
    pub poll_count: u32,

    /// Delay before each check in seconds
    pub poll_interval_secs: u64,
}

impl Default for DeviceWatchConfig {
    fn default() -> Self {
        Self {
            poll_count: 2,
            poll_interval_secs: 5,
        }
    }
}

impl DeviceWatchConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

/// Command sequence timing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Settle delay after each command line in milliseconds
    pub command_delay_ms: u64,

    /// How long to wait for the recovery completion message in seconds
    pub recovery_timeout_secs: u64,

    /// Settle delay after recovery completes in milliseconds
    pub recovery_settle_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            command_delay_ms: 2000,
            recovery_timeout_secs: 60,
            recovery_settle_ms: 1000,
        }
    }
}

impl TimingConfig {
    pub fn command_delay(&self) -> Duration {
        Duration::from_millis(self.command_delay_ms)
    }

    pub fn recovery_timeout(&self) -> Duration {
        Duration::from_secs(self.recovery_timeout_secs)
    }

    pub fn recovery_settle(&self) -> Duration {
        Duration::from_millis(self.recovery_settle_ms)
    }
}

/// Recovery completion detection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecoveryConfig {
    /// Regex matched against session output after `agx recovery`
    pub completion_pattern: String,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            completion_pattern: DEFAULT_COMPLETION_PATTERN.to_string(),
        }
    }
}

/// Operator interaction settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OperatorConfig {
    /// Ask for ENTER after connecting and before sending commands
    pub confirm_before_switch: bool,
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            confirm_before_switch: true,
        }
    }
}

/// Configuration validation errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Device path must not be empty")]
    EmptyDevice,

    #[error("Terminal program must not be empty")]
    EmptyProgram,

    #[error("Invalid poll count: {0} (must be at least 1)")]
    InvalidPollCount(u32),

    #[error("Timeout '{0}' must be greater than zero")]
    ZeroTimeout(&'static str),

    #[error("Invalid completion pattern: {0}")]
    InvalidPattern(String),
}

impl ConfigError {
    /// Configuration field the error refers to
    pub fn field(&self) -> &'static str {
        match self {
            ConfigError::EmptyDevice => "device",
            ConfigError::EmptyProgram => "terminal.program",
            ConfigError::InvalidPollCount(_) => "device_watch.poll_count",
            ConfigError::ZeroTimeout(field) => *field,
            ConfigError::InvalidPattern(_) => "recovery.completion_pattern",
        }
    }
}

impl From<ConfigError> for crate::error::Error {
    fn from(err: ConfigError) -> Self {
        crate::error::Error::ConfigValidationFailed {
            field: err.field().to_string(),
            reason: err.to_string(),
        }
    }
}
