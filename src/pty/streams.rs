//! PTY Streams
//!
//! Bridges the blocking PTY master reader and writer threads to the
//! session through channels.

use crate::error::{Error, Result};
use crate::session::ReadOutcome;
use std::sync::mpsc::Sender as StdSender;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;

/// PTY I/O streams wrapper
pub struct PtyStreams {
    /// Receiver for output bytes from the PTY (stdout/stderr)
    output_rx: UnboundedReceiver<Vec<u8>>,
    /// Sender for input bytes to the PTY (stdin)
    input_tx: StdSender<Vec<u8>>,
    /// Traffic counters
    stats: StreamStats,
}

impl PtyStreams {
    /// Create new PTY streams from channels
    pub fn from_channels(
        output_rx: UnboundedReceiver<Vec<u8>>,
        input_tx: StdSender<Vec<u8>>,
    ) -> Self {
        Self {
            output_rx,
            input_tx,
            stats: StreamStats::default(),
        }
    }

    /// Write data to the PTY stdin
    pub fn write(&mut self, data: &[u8]) -> Result<()> {
        self.input_tx
            .send(data.to_vec())
            .map_err(|e| Error::PtyInputSendFailed {
                reason: e.to_string(),
            })?;
        self.stats.bytes_written += data.len() as u64;
        self.stats.write_operations += 1;
        Ok(())
    }

    /// Wait up to `timeout` for the next output chunk
    pub async fn read_with_timeout(&mut self, timeout: Duration) -> ReadOutcome {
        match tokio::time::timeout(timeout, self.output_rx.recv()).await {
            Ok(Some(bytes)) => {
                self.stats.bytes_read += bytes.len() as u64;
                self.stats.read_operations += 1;
                ReadOutcome::Data(bytes)
            }
            // Reader thread exited: the process closed the PTY
            Ok(None) => ReadOutcome::Eof,
            Err(_) => {
                self.stats.read_timeouts += 1;
                ReadOutcome::Idle
            }
        }
    }

    /// Drain all pending output from the channel (discard it)
    pub fn drain_output(&mut self) -> usize {
        let mut count = 0;
        while self.output_rx.try_recv().is_ok() {
            count += 1;
        }
        count
    }

    /// Traffic counters since the streams were created
    pub fn stats(&self) -> &StreamStats {
        &self.stats
    }
}

/// Stream statistics for diagnostics
#[derive(Debug, Clone, Default)]
pub struct StreamStats {
    /// Total bytes read
    pub bytes_read: u64,
    /// Total bytes written
    pub bytes_written: u64,
    /// Number of read operations
    pub read_operations: u64,
    /// Number of write operations
    pub write_operations: u64,
    /// Number of reads that timed out
    pub read_timeouts: u64,
}
