//! Terminal program launcher
//!
//! Starts `tio <device>` (or the configured program) inside a PTY.

use async_trait::async_trait;

use super::transport::{TerminalLauncher, Transport};
use crate::config::TerminalConfig;
use crate::error::{Error, Result};
use crate::pty::{is_command_available, spawn_pty_process, SpawnConfig};

/// Launches the serial terminal program in a pseudoterminal
#[derive(Debug, Clone)]
pub struct TioLauncher {
    program: String,
    spawn_config: SpawnConfig,
}

impl TioLauncher {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            spawn_config: SpawnConfig::default(),
        }
    }

    /// Launcher for the configured program and terminal size
    pub fn from_config(config: &TerminalConfig) -> Self {
        let (cols, rows) = config.dimensions;
        Self {
            program: config.program.clone(),
            spawn_config: SpawnConfig::with_dimensions(cols, rows),
        }
    }
}

#[async_trait]
impl TerminalLauncher for TioLauncher {
    async fn launch(&self, device: &str) -> Result<Box<dyn Transport>> {
        if !is_command_available(&self.program) {
            return Err(Error::ProcessSpawnFailure {
                command: self.program.clone(),
                reason: "program not found in PATH".to_string(),
            });
        }

        info!("Launching {} {}", self.program, device);
        let transport = spawn_pty_process(&self.program, &[device.to_string()], &self.spawn_config)?;
        debug!("{} running as pid {:?}", self.program, transport.pid());
        Ok(Box::new(transport))
    }
}
