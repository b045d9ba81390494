//! Error types and Result aliases for the RM-01 switcher

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Result type alias for switcher operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the RM-01 switcher
#[derive(Debug)]
pub enum Error {
    // === Action errors ===
    /// The serial device never appeared while polling
    DeviceNotFound {
        device: String,
        attempts: u32,
    },

    /// The terminal program did not confirm the connection
    ConnectFailure {
        device: String,
        reason: String,
    },

    /// A pattern was not matched in time where the caller treats it as fatal
    CommandTimeout {
        command: String,
        duration: Duration,
    },

    /// The terminal session ended unexpectedly
    StreamClosed {
        during: String,
    },

    /// The terminal program could not be launched
    ProcessSpawnFailure {
        command: String,
        reason: String,
    },

    // === PTY-related errors ===
    /// Failed to create PTY
    PtyCreationFailed {
        command: String,
        reason: String,
    },

    /// Failed to clone PTY reader
    PtyReaderCloneFailed {
        reason: String,
    },

    /// Failed to take PTY writer
    PtyWriterTakeFailed {
        reason: String,
    },

    /// Failed to send input to PTY
    PtyInputSendFailed {
        reason: String,
    },

    /// Operation on a session that was already closed
    SessionNotOpen {
        device: String,
    },

    /// Failed to send signal to process
    SignalSendFailed {
        signal: String,
        reason: String,
    },

    /// Signal handling not supported on platform
    SignalNotSupported {
        signal: String,
        platform: String,
    },

    // === Device listing errors ===
    /// The device listing command failed or timed out
    DeviceListFailed {
        command: String,
        reason: String,
    },

    // === Configuration errors ===
    /// Failed to load configuration file
    ConfigLoadFailed {
        path: PathBuf,
        reason: String,
    },

    /// Failed to parse configuration
    ConfigParseFailed {
        format: String,
        reason: String,
    },

    /// Configuration validation failed
    ConfigValidationFailed {
        field: String,
        reason: String,
    },

    // === I/O and serialization errors ===
    /// I/O errors
    Io(std::io::Error),

    /// JSON errors
    Serde(serde_json::Error),

    /// TOML parsing errors
    Toml(toml::de::Error),

    /// Regex compilation errors
    Regex(regex::Error),

    // === Generic fallback (use sparingly) ===
    /// Generic errors
    Other(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Action errors
            Error::DeviceNotFound { device, attempts } => {
                write!(f, "Device '{}' not found after {} checks", device, attempts)
            }
            Error::ConnectFailure { device, reason } => {
                write!(f, "Failed to connect to '{}': {}", device, reason)
            }
            Error::CommandTimeout { command, duration } => {
                write!(f, "Command '{}' timed out after {:?}", command, duration)
            }
            Error::StreamClosed { during } => {
                write!(f, "Terminal session closed unexpectedly during {}", during)
            }
            Error::ProcessSpawnFailure { command, reason } => {
                write!(f, "Failed to launch '{}': {}", command, reason)
            }

            // PTY errors
            Error::PtyCreationFailed { command, reason } => {
                write!(f, "Failed to create PTY for command '{}': {}", command, reason)
            }
            Error::PtyReaderCloneFailed { reason } => {
                write!(f, "Failed to clone PTY reader: {}", reason)
            }
            Error::PtyWriterTakeFailed { reason } => {
                write!(f, "Failed to take PTY writer: {}", reason)
            }
            Error::PtyInputSendFailed { reason } => {
                write!(f, "Failed to send input to PTY: {}", reason)
            }
            Error::SessionNotOpen { device } => {
                write!(f, "Session to '{}' is not open", device)
            }
            Error::SignalSendFailed { signal, reason } => {
                write!(f, "Failed to send signal '{}': {}", signal, reason)
            }
            Error::SignalNotSupported { signal, platform } => {
                write!(f, "Signal '{}' not supported on {}", signal, platform)
            }

            // Device listing
            Error::DeviceListFailed { command, reason } => {
                write!(f, "Device listing via '{}' failed: {}", command, reason)
            }

            // Configuration errors
            Error::ConfigLoadFailed { path, reason } => {
                write!(f, "Failed to load config from '{}': {}", path.display(), reason)
            }
            Error::ConfigParseFailed { format, reason } => {
                write!(f, "Failed to parse {} config: {}", format, reason)
            }
            Error::ConfigValidationFailed { field, reason } => {
                write!(f, "Configuration validation failed for '{}': {}", field, reason)
            }

            // I/O and serialization errors
            Error::Io(err) => write!(f, "I/O error: {}", err),
            Error::Serde(err) => write!(f, "Serialization error: {}", err),
            Error::Toml(err) => write!(f, "TOML parsing error: {}", err),
            Error::Regex(err) => write!(f, "Regex compilation error: {}", err),

            // Generic fallback
            Error::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            Error::Serde(err) => Some(err),
            Error::Toml(err) => Some(err),
            Error::Regex(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serde(err)
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Toml(err)
    }
}

impl From<regex::Error> for Error {
    fn from(err: regex::Error) -> Self {
        Error::Regex(err)
    }
}

impl From<String> for Error {
    fn from(err: String) -> Self {
        Error::Other(err)
    }
}

impl From<&str> for Error {
    fn from(err: &str) -> Self {
        Error::Other(err.to_string())
    }
}
