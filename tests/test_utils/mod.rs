//! Test Utilities and Mocks
//!
//! Scripted stand-ins for the serial terminal, the device listing and the
//! operator, shared by the integration and contract tests.

#![allow(dead_code)]

pub mod mock_serial;

// Re-exports for convenience
pub use fixtures::{unattended_config, switcher_with, CONFIRMED, DEVICE};
pub use mock_serial::{
    RecordingOperator, ScriptedLauncher, ScriptedLister, SerialLog, SerialScript, SharedOutput,
};
