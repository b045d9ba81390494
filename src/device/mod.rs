//! Serial Device Watcher
//!
//! Polls the terminal program's device listing until the board's serial
//! device shows up, with a fixed delay before every check.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::{sleep, timeout};

use crate::config::{DeviceWatchConfig, TerminalConfig};
use crate::error::{Error, Result};
use crate::operator::Operator;

/// Source of the serial device listing
#[async_trait]
pub trait DeviceLister: Send + Sync {
    /// Return the raw device listing
    ///
    /// # Errors
    /// Returns an error if the listing command is missing, fails, exits
    /// non-zero or times out
    async fn list_devices(&self) -> Result<String>;
}

/// Lists serial devices with `tio -l`
#[derive(Debug, Clone)]
pub struct TioLister {
    program: String,
    list_flag: String,
    timeout: Duration,
}

impl TioLister {
    pub fn new(program: impl Into<String>, list_flag: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            list_flag: list_flag.into(),
            timeout,
        }
    }

    pub fn from_config(config: &TerminalConfig) -> Self {
        Self::new(&config.program, &config.list_flag, config.list_timeout())
    }

    fn command_line(&self) -> String {
        format!("{} {}", self.program, self.list_flag)
    }
}

#[async_trait]
impl DeviceLister for TioLister {
    async fn list_devices(&self) -> Result<String> {
        let output = Command::new(&self.program)
            .arg(&self.list_flag)
            .kill_on_drop(true)
            .output();

        let output = timeout(self.timeout, output)
            .await
            .map_err(|_| Error::DeviceListFailed {
                command: self.command_line(),
                reason: format!("timed out after {:?}", self.timeout),
            })?
            .map_err(|e| Error::DeviceListFailed {
                command: self.command_line(),
                reason: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(Error::DeviceListFailed {
                command: self.command_line(),
                reason: format!(
                    "exited with {}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Waits for a serial device to appear
pub struct DeviceWatcher {
    lister: Arc<dyn DeviceLister>,
    poll_count: u32,
    poll_interval: Duration,
}

impl DeviceWatcher {
    pub fn new(lister: Arc<dyn DeviceLister>, poll_count: u32, poll_interval: Duration) -> Self {
        Self {
            lister,
            poll_count,
            poll_interval,
        }
    }

    pub fn from_config(lister: Arc<dyn DeviceLister>, config: &DeviceWatchConfig) -> Self {
        Self::new(lister, config.poll_count, config.poll_interval())
    }

    /// Number of checks made before giving up
    pub fn poll_count(&self) -> u32 {
        self.poll_count
    }

    /// Single presence check; listing failures count as absent
    pub async fn is_present(&self, device: &str) -> bool {
        match self.lister.list_devices().await {
            Ok(listing) => listing.contains(device),
            Err(e) => {
                warn!("Failed to check for {}: {}", device, e);
                false
            }
        }
    }

    /// Poll until `device` is listed, waiting the poll interval before each
    /// check. Returns false once every check has come back negative.
    pub async fn wait_for_device(&self, device: &str, operator: &mut dyn Operator) -> bool {
        operator.status("\nWaiting for connection...");

        for attempt in 1..=self.poll_count {
            sleep(self.poll_interval).await;

            if attempt == 1 {
                operator.status(&format!("Checking for {}...", device));
            } else {
                operator.status(&format!("Checking for {} again...", device));
            }

            if self.is_present(device).await {
                info!("{} detected on check {}/{}", device, attempt, self.poll_count);
                operator.status(&format!("✓ {} detected!", device));
                return true;
            }

            if attempt < self.poll_count {
                operator.status(&format!(
                    "Device not found, waiting another {} seconds...",
                    self.poll_interval.as_secs_f64()
                ));
            }
        }

        warn!("{} not found after {} checks", device, self.poll_count);
        operator.status(&format!("✗ {} not found", device));
        false
    }
}
