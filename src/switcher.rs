//! Module Switch Sequences
//!
//! The two fixed scripts run against the board's serial console:
//!
//! - **Module switch**: route the USB multiplexer to a module and save the
//!   setting; switching to the inference module also forces it through
//!   recovery on the way.
//! - **Recovery**: force the inference module into recovery mode and wait
//!   for the device to confirm it.
//!
//! A recovery confirmation that never arrives is tolerated during a module
//! switch (the mux setting is still saved) but fails the standalone recovery
//! action.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

use crate::config::Config;
use crate::device::{DeviceLister, DeviceWatcher};
use crate::error::{Error, Result};
use crate::models::ModuleSelector;
use crate::operator::Operator;
use crate::session::{
    EscapeSequence, ExpectOutcome, Pattern, Session, SessionOptions, TerminalLauncher,
};

/// Device command that forces the inference module into recovery
pub const RECOVERY_COMMAND: &str = "agx recovery";

/// Device command that persists the current mux routing
pub const SAVE_COMMAND: &str = "usbmux save";

const RULE_WIDTH: usize = 50;

/// Delays and timeouts of the scripted sequences
#[derive(Debug, Clone)]
pub struct SequenceTiming {
    /// Settle delay after each command line
    pub command_delay: Duration,
    /// Wait for the recovery completion message
    pub recovery_timeout: Duration,
    /// Settle delay after a confirmed recovery
    pub recovery_settle: Duration,
}

impl Default for SequenceTiming {
    fn default() -> Self {
        Self {
            command_delay: Duration::from_secs(2),
            recovery_timeout: Duration::from_secs(60),
            recovery_settle: Duration::from_secs(1),
        }
    }
}

/// Runs the switch and recovery sequences against one serial device
pub struct Switcher {
    device: String,
    watcher: DeviceWatcher,
    launcher: Arc<dyn TerminalLauncher>,
    session_options: SessionOptions,
    timing: SequenceTiming,
    completion: Pattern,
    confirm_before_switch: bool,
}

impl Switcher {
    /// Build a switcher from configuration and the two external seams
    ///
    /// # Errors
    /// Returns an error if the completion pattern does not compile
    pub fn new(
        config: &Config,
        lister: Arc<dyn DeviceLister>,
        launcher: Arc<dyn TerminalLauncher>,
    ) -> Result<Self> {
        Ok(Self {
            device: config.device_name(),
            watcher: DeviceWatcher::from_config(lister, &config.device_watch),
            launcher,
            session_options: SessionOptions {
                connect_timeout: config.terminal.connect_timeout(),
                escape: EscapeSequence {
                    control_byte: config.terminal.escape_byte,
                    quit_key: config.terminal.quit_key.clone(),
                },
                close_grace: config.terminal.close_grace(),
            },
            timing: SequenceTiming {
                command_delay: config.timing.command_delay(),
                recovery_timeout: config.timing.recovery_timeout(),
                recovery_settle: config.timing.recovery_settle(),
            },
            completion: Pattern::regex(&config.recovery.completion_pattern)?,
            confirm_before_switch: config.operator.confirm_before_switch,
        })
    }

    /// Device the switcher drives
    pub fn device(&self) -> &str {
        &self.device
    }

    /// Route the board's console to `module` and save the setting
    pub async fn switch_module(
        &self,
        module: ModuleSelector,
        operator: &mut dyn Operator,
    ) -> Result<()> {
        print_header(operator, &format!("Switching to {}", module));
        info!("Switching to {} (usbmux {})", module, module.token());

        let mut session = self
            .open_session(operator, "\nPress ENTER to start switching...")
            .await?;
        let result = self.run_switch(&mut session, module, operator).await;
        session.close().await;
        result?;

        operator.status(&format!("\n{}", "=".repeat(RULE_WIDTH)));
        operator.status(&format!("✓ Successfully switched to {}!", module));
        operator.status(&"=".repeat(RULE_WIDTH));
        info!("Switched to {}", module);
        Ok(())
    }

    /// Force the inference module into recovery mode
    pub async fn force_recovery(&self, operator: &mut dyn Operator) -> Result<()> {
        print_header(operator, "Forcing Inference Module into recovery mode");
        info!("Forcing recovery on {}", self.device);

        let mut session = self
            .open_session(operator, "\nPress ENTER to start recovery...")
            .await?;
        let result = self.run_recovery(&mut session, operator).await;
        session.close().await;
        result?;

        operator.status("\n✓ Inference Module is in recovery mode");
        info!("Recovery confirmed on {}", self.device);
        Ok(())
    }

    /// Wait for the device, connect, and optionally let the operator confirm with `prompt`
    async fn open_session(&self, operator: &mut dyn Operator, prompt: &str) -> Result<Session> {
        if !self.watcher.wait_for_device(&self.device, operator).await {
            return Err(Error::DeviceNotFound {
                device: self.device.clone(),
                attempts: self.watcher.poll_count(),
            });
        }

        operator.status("\nConnecting to serial console...");
        let session =
            Session::connect(self.launcher.as_ref(), &self.device, self.session_options.clone())
                .await?;
        operator.status(&format!("✓ Connected to {}", session.device()));

        if self.confirm_before_switch {
            // Dropping the session on error kills the terminal program
            operator.acknowledge(prompt).await?;
        }
        Ok(session)
    }

    async fn run_switch(
        &self,
        session: &mut Session,
        module: ModuleSelector,
        operator: &mut dyn Operator,
    ) -> Result<()> {
        session.send_line("")?;
        sleep(self.timing.command_delay).await;

        let command = module.usbmux_command();
        operator.status(&format!("Executing: {}", command));
        session.send_line(&command)?;
        sleep(self.timing.command_delay).await;

        if module.requires_recovery() {
            sleep(self.timing.command_delay).await;
            operator.status(&format!("Executing: {}", RECOVERY_COMMAND));
            session.send_line(RECOVERY_COMMAND)?;

            match session
                .expect(&self.completion, self.timing.recovery_timeout)
                .await
            {
                ExpectOutcome::Matched(line) => {
                    info!("Recovery confirmed: {}", line.trim());
                    operator.status("✓ Recovery complete");
                }
                ExpectOutcome::TimedOut => {
                    warn!(
                        "No recovery confirmation within {:?}, continuing with save",
                        self.timing.recovery_timeout
                    );
                    operator.status(
                        "Warning: recovery confirmation not received, saving configuration anyway",
                    );
                }
                ExpectOutcome::Closed => {
                    return Err(Error::StreamClosed {
                        during: RECOVERY_COMMAND.to_string(),
                    });
                }
            }
        }

        operator.status("Saving configuration...");
        session.send_line(SAVE_COMMAND)?;
        sleep(self.timing.command_delay).await;
        Ok(())
    }

    async fn run_recovery(&self, session: &mut Session, operator: &mut dyn Operator) -> Result<()> {
        session.send_line("")?;
        sleep(self.timing.command_delay).await;

        operator.status(&format!("Executing: {}", RECOVERY_COMMAND));
        session.send_line(RECOVERY_COMMAND)?;

        match session
            .expect(&self.completion, self.timing.recovery_timeout)
            .await
        {
            ExpectOutcome::Matched(line) => {
                info!("Recovery confirmed: {}", line.trim());
                sleep(self.timing.recovery_settle).await;
                Ok(())
            }
            ExpectOutcome::TimedOut => Err(Error::CommandTimeout {
                command: RECOVERY_COMMAND.to_string(),
                duration: self.timing.recovery_timeout,
            }),
            ExpectOutcome::Closed => Err(Error::StreamClosed {
                during: RECOVERY_COMMAND.to_string(),
            }),
        }
    }
}

fn print_header(operator: &mut dyn Operator, title: &str) {
    operator.status(&format!("\n{}", "=".repeat(RULE_WIDTH)));
    operator.status(title);
    operator.status(&"=".repeat(RULE_WIDTH));
}
