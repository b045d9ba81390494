//! PTY Process Spawning
//!
//! Handles the creation and spawning of the terminal program inside a
//! pseudoterminal using the portable-pty crate.

use portable_pty::{native_pty_system, CommandBuilder, MasterPty, PtySize};
use std::collections::HashMap;
use std::io::{Read, Write};
use std::sync::mpsc::channel;
use std::thread;
use tokio::sync::mpsc::unbounded_channel;

use super::streams::PtyStreams;
use super::transport::PtyTransport;
use crate::error::{Error, Result};

/// Process spawning configuration
#[derive(Debug, Clone)]
pub struct SpawnConfig {
    /// Terminal size
    pub size: PtySize,
    /// Extra environment variables on top of the inherited environment
    pub env_vars: HashMap<String, String>,
}

impl SpawnConfig {
    /// Configuration with the given terminal dimensions (cols, rows)
    pub fn with_dimensions(cols: u16, rows: u16) -> Self {
        Self {
            size: PtySize {
                rows,
                cols,
                pixel_width: 0,
                pixel_height: 0,
            },
            ..Default::default()
        }
    }
}

impl Default for SpawnConfig {
    fn default() -> Self {
        Self {
            size: PtySize {
                rows: 24,
                cols: 80,
                pixel_width: 0,
                pixel_height: 0,
            },
            env_vars: HashMap::new(),
        }
    }
}

/// Spawn `command` with `args` attached to a new PTY
pub fn spawn_pty_process(
    command: &str,
    args: &[String],
    config: &SpawnConfig,
) -> Result<PtyTransport> {
    let pty_system = native_pty_system();

    let pair = pty_system
        .openpty(config.size)
        .map_err(|e| Error::PtyCreationFailed {
            command: command.to_string(),
            reason: e.to_string(),
        })?;

    let mut cmd_builder = CommandBuilder::new(command);
    cmd_builder.args(args);
    for (key, value) in &config.env_vars {
        cmd_builder.env(key, value);
    }

    let child = pair
        .slave
        .spawn_command(cmd_builder)
        .map_err(|e| Error::ProcessSpawnFailure {
            command: command.to_string(),
            reason: e.to_string(),
        })?;

    // The child holds its own copy of the slave side; ours must go so the
    // master sees EOF once the child exits.
    drop(pair.slave);

    let pid = child.process_id();
    debug!("Spawned '{}' with args {:?} (pid: {:?})", command, args, pid);

    let streams = create_pty_streams(pair.master.as_ref())?;

    Ok(PtyTransport::new(command.to_string(), pid, child, pair.master, streams))
}

/// Create PTY streams from the PTY master
fn create_pty_streams(master: &dyn MasterPty) -> Result<PtyStreams> {
    // Bridge blocking PTY I/O to async via channels and background threads
    let mut master_reader = master
        .try_clone_reader()
        .map_err(|e| Error::PtyReaderCloneFailed {
            reason: e.to_string(),
        })?;
    let mut master_writer = master
        .take_writer()
        .map_err(|e| Error::PtyWriterTakeFailed {
            reason: e.to_string(),
        })?;

    // Channel: PTY output -> async consumer
    let (tx_async_out, rx_async_out) = unbounded_channel::<Vec<u8>>();
    // Channel: session input -> PTY writer thread
    let (tx_stdin, rx_stdin) = channel::<Vec<u8>>();

    // Reader thread: read from PTY master and forward to async channel
    thread::spawn(move || {
        let mut buf = [0u8; 4096];
        let mut consecutive_errors = 0;
        const MAX_CONSECUTIVE_ERRORS: u32 = 5;

        loop {
            match master_reader.read(&mut buf) {
                Ok(0) => {
                    debug!("PTY read EOF - process terminated");
                    break;
                }
                Ok(n) => {
                    consecutive_errors = 0;

                    if tx_async_out.send(buf[..n].to_vec()).is_err() {
                        debug!("PTY read: receiver dropped, stopping reader thread");
                        break;
                    }
                }
                Err(e) => {
                    if e.kind() == std::io::ErrorKind::Interrupted {
                        continue;
                    }

                    if e.kind() == std::io::ErrorKind::WouldBlock {
                        std::thread::sleep(std::time::Duration::from_millis(10));
                        continue;
                    }

                    // Linux reports EIO on the master once the slave side is gone
                    consecutive_errors += 1;
                    debug!(
                        "PTY read error ({}): {} (attempt {}/{})",
                        e.kind(),
                        e,
                        consecutive_errors,
                        MAX_CONSECUTIVE_ERRORS
                    );

                    if consecutive_errors >= MAX_CONSECUTIVE_ERRORS {
                        debug!("PTY read: too many consecutive errors, stopping reader thread");
                        break;
                    }

                    std::thread::sleep(std::time::Duration::from_millis(50));
                }
            }
        }
        debug!("PTY reader thread exiting");
    });

    // Writer thread: receive session input and write to PTY master
    thread::spawn(move || {
        let mut consecutive_errors = 0;
        const MAX_CONSECUTIVE_ERRORS: u32 = 3;

        while let Ok(data) = rx_stdin.recv() {
            let mut attempts = 0;
            const MAX_ATTEMPTS: u32 = 3;

            loop {
                match master_writer.write_all(&data) {
                    Ok(()) => {
                        consecutive_errors = 0;

                        if let Err(e) = master_writer.flush() {
                            debug!("PTY flush error: {}", e);
                        }

                        break;
                    }
                    Err(e) => {
                        attempts += 1;

                        if e.kind() == std::io::ErrorKind::Interrupted {
                            continue;
                        }

                        if e.kind() == std::io::ErrorKind::WouldBlock && attempts < MAX_ATTEMPTS {
                            std::thread::sleep(std::time::Duration::from_millis(10));
                            continue;
                        }

                        consecutive_errors += 1;
                        warn!(
                            "PTY write error ({}): {} (consecutive errors: {}/{})",
                            e.kind(),
                            e,
                            consecutive_errors,
                            MAX_CONSECUTIVE_ERRORS
                        );

                        if consecutive_errors >= MAX_CONSECUTIVE_ERRORS {
                            error!("PTY write: too many consecutive errors, stopping writer thread");
                            return;
                        }

                        break;
                    }
                }
            }
        }
        debug!("PTY writer thread exiting");
    });

    Ok(PtyStreams::from_channels(rx_async_out, tx_stdin))
}

/// Check if a command is available on the system
pub fn is_command_available(command: &str) -> bool {
    let path = std::path::Path::new(command);
    if path.components().count() > 1 {
        return path.is_file();
    }

    std::env::var_os("PATH")
        .map(|paths| std::env::split_paths(&paths).any(|dir| dir.join(command).is_file()))
        .unwrap_or(false)
}
