//! Session Transport Abstraction
//!
//! The byte pipe between a [`Session`](super::Session) and the terminal
//! program it drives. The production implementation is
//! [`PtyTransport`](crate::pty::PtyTransport); tests substitute scripted
//! transports.

use crate::error::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Result of waiting for terminal output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// A chunk of output arrived
    Data(Vec<u8>),
    /// Nothing arrived before the timeout
    Idle,
    /// The terminal program closed its output
    Eof,
}

/// Bidirectional byte stream to an exclusively owned terminal process
#[async_trait]
pub trait Transport: Send {
    /// Queue bytes for the terminal's input
    ///
    /// # Errors
    /// Returns an error if the input side is no longer accepting data
    fn write(&mut self, data: &[u8]) -> Result<()>;

    /// Wait up to `timeout` for the next chunk of output
    async fn read(&mut self, timeout: Duration) -> ReadOutcome;

    /// Give the process `grace` to exit on its own, then force it down
    async fn shutdown(&mut self, grace: Duration);

    /// Force the process down immediately. Must be safe to call repeatedly.
    fn terminate(&mut self);
}

/// Spawns terminal programs attached to a serial device
#[async_trait]
pub trait TerminalLauncher: Send + Sync {
    /// Start the terminal program against `device`
    ///
    /// # Errors
    /// Returns [`Error::ProcessSpawnFailure`](crate::error::Error::ProcessSpawnFailure)
    /// when the program is missing or cannot be launched
    async fn launch(&self, device: &str) -> Result<Box<dyn Transport>>;
}
