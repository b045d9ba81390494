//! RM-01 Switcher - serial console tool for the RM-01 carrier board
//!
//! The board exposes one USB serial console whose USB multiplexer decides
//! which on-board module (inference or application) is reachable. This
//! library drives that console through the `tio` terminal program to switch
//! modules and to force the inference module into recovery mode.
//!
//! ## Module Organization
//!
//! - [`device`] - Polls `tio -l` until the serial device shows up
//! - [`session`] - Expect-style driver over one running terminal program
//! - [`pty`] - Pseudoterminal spawning, I/O threads and teardown
//! - [`switcher`] - The scripted switch and recovery sequences
//! - [`menu`] - Interactive numbered menu
//! - [`operator`] - Console I/O with the person at the keyboard
//! - [`config`] - Optional TOML/JSON configuration with defaults
//! - [`models`] - Module selector and session lifecycle state
//! - [`mod@error`] - Error types and Result aliases
//!
//! ## Architecture
//!
//! Everything runs on a single-threaded tokio runtime. The terminal program
//! runs in a PTY whose blocking reader and writer live on two OS threads,
//! bridged to the session through channels. Only one session exists at a
//! time and every action closes it before returning to the menu.
//!
//! The device listing, the terminal launcher and the operator are traits,
//! so the sequences can run against scripted doubles with paused time.

#![allow(unexpected_cfgs)]

#[macro_use]
extern crate tracing;

pub mod config;
pub mod device;
pub mod error;
pub mod menu;
pub mod models;
pub mod operator;
pub mod pty;
pub mod session;
pub mod switcher;

// Re-exports for core functionality
pub use config::{Config, ConfigLoader};
pub use error::{Error, Result};
pub use menu::{Menu, MenuChoice};
pub use models::{ModuleSelector, SessionState};
pub use operator::{Console, Operator};
pub use session::{ExpectOutcome, Pattern, Session};
pub use switcher::Switcher;

// Version information
/// The current version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The package name from Cargo.toml
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// The package description from Cargo.toml
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Report for an error that stops the program before the menu starts
pub fn handle_startup_error(error: &Error) -> String {
    match error {
        Error::ConfigLoadFailed { path, reason } => format!(
            "Configuration Error: Failed to load config from '{}': {}\n\nTry:\n• Check the path passed with --config or {}\n• Ensure file permissions are correct",
            path.display(),
            reason,
            config::loader::CONFIG_ENV_VAR
        ),
        Error::ConfigParseFailed { format, reason } => format!(
            "Configuration Error: Failed to parse {} config: {}\n\nTry:\n• Check configuration file syntax",
            format, reason
        ),
        Error::ConfigValidationFailed { field, reason } => format!(
            "Configuration Error: Validation failed for '{}': {}",
            field, reason
        ),
        Error::Regex(e) => format!(
            "Configuration Error: Invalid recovery.completion_pattern: {}",
            e
        ),
        other => format!("Unexpected Error: {}", other),
    }
}
