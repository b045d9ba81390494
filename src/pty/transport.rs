//! PTY-backed session transport
//!
//! Owns the spawned terminal program, its PTY master and the channel
//! streams, and guarantees the process is reaped when the transport is
//! shut down or dropped.

use async_trait::async_trait;
use portable_pty::{Child, ChildKiller, MasterPty};
use std::time::Duration;
use tokio::time::{sleep, Instant};

use super::signals::{self, Signal};
use super::streams::PtyStreams;
use crate::error::Result;
use crate::session::{ReadOutcome, Transport};

/// Poll interval while waiting for the child to exit
const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Terminal program running in a PTY
pub struct PtyTransport {
    command: String,
    pid: Option<u32>,
    child: Box<dyn Child + Send + Sync>,
    // Kept alive for the lifetime of the process
    _master: Box<dyn MasterPty + Send>,
    streams: PtyStreams,
    reaped: bool,
}

impl PtyTransport {
    pub(crate) fn new(
        command: String,
        pid: Option<u32>,
        child: Box<dyn Child + Send + Sync>,
        master: Box<dyn MasterPty + Send>,
        streams: PtyStreams,
    ) -> Self {
        Self {
            command,
            pid,
            child,
            _master: master,
            streams,
            reaped: false,
        }
    }

    /// OS process identifier of the terminal program
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Non-blocking exit check; marks the child reaped once it has exited
    fn try_reap(&mut self) -> bool {
        if self.reaped {
            return true;
        }
        match self.child.try_wait() {
            Ok(Some(status)) => {
                debug!("'{}' exited with {:?}", self.command, status);
                self.reaped = true;
                true
            }
            Ok(None) => false,
            Err(e) => {
                warn!("Failed to query '{}' exit status: {}", self.command, e);
                false
            }
        }
    }

    fn log_stats(&self) {
        let stats = self.streams.stats();
        debug!(
            "'{}' session traffic: {} bytes in ({} reads, {} idle), {} bytes out ({} writes)",
            self.command,
            stats.bytes_read,
            stats.read_operations,
            stats.read_timeouts,
            stats.bytes_written,
            stats.write_operations
        );
    }
}

#[async_trait]
impl Transport for PtyTransport {
    fn write(&mut self, data: &[u8]) -> Result<()> {
        self.streams.write(data)
    }

    async fn read(&mut self, timeout: Duration) -> ReadOutcome {
        self.streams.read_with_timeout(timeout).await
    }

    async fn shutdown(&mut self, grace: Duration) {
        let deadline = Instant::now() + grace;
        while !self.try_reap() {
            if Instant::now() >= deadline {
                debug!("'{}' still running after {:?}, terminating", self.command, grace);
                break;
            }
            sleep(EXIT_POLL_INTERVAL).await;
        }
        self.terminate();
    }

    fn terminate(&mut self) {
        if self.try_reap() {
            self.log_stats();
            return;
        }

        if let Some(pid) = self.pid {
            if let Err(e) = signals::send_signal(pid, Signal::Terminate) {
                debug!("SIGTERM to '{}' failed: {}", self.command, e);
            }
        }
        if let Err(e) = self.child.kill() {
            debug!("Kill of '{}' failed: {}", self.command, e);
            if let Some(pid) = self.pid {
                if let Err(e) = signals::send_signal(pid, Signal::Kill) {
                    debug!("SIGKILL to '{}' failed: {}", self.command, e);
                }
            }
        }
        match self.child.wait() {
            Ok(status) => debug!("'{}' terminated with {:?}", self.command, status),
            Err(e) => warn!("Failed to reap '{}': {}", self.command, e),
        }
        self.reaped = true;
        self.streams.drain_output();
        self.log_stats();
    }
}

impl Drop for PtyTransport {
    fn drop(&mut self) {
        if !self.reaped {
            self.terminate();
        }
    }
}
