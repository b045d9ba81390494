//! Operator Menu Loop
//!
//! Numbered menu that dispatches to the switch sequences until the operator
//! exits. Action failures are reported and the menu comes back.

use std::io::Write;
use std::str::FromStr;
use tokio::io::AsyncBufRead;

use crate::error::{Error, Result};
use crate::models::ModuleSelector;
use crate::operator::Console;
use crate::switcher::Switcher;

const LOGO: &[&str] = &[
    "    ██████╗ ███╗   ███╗██╗███╗   ██╗████████╗███████╗",
    "    ██╔══██╗████╗ ████║██║████╗  ██║╚══██╔══╝██╔════╝",
    "    ██████╔╝██╔████╔██║██║██╔██╗ ██║   ██║   █████╗  ",
    "    ██╔══██╗██║╚██╔╝██║██║██║╚██╗██║   ██║   ██╔══╝  ",
    "    ██║  ██║██║ ╚═╝ ██║██║██║ ╚████║   ██║   ███████╗",
    "    ╚═╝  ╚═╝╚═╝     ╚═╝╚═╝╚═╝  ╚═══╝   ╚═╝   ╚══════╝",
];

/// Application title shown under the logo
pub const TITLE: &str = "RM-01 Serial Switcher Tool";

/// One menu entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    /// Route the console to a module
    Switch(ModuleSelector),
    /// Force the inference module into recovery
    Recovery,
    /// Leave the program
    Exit,
}

impl MenuChoice {
    /// All entries in display order
    pub const ALL: [MenuChoice; 4] = [
        MenuChoice::Switch(ModuleSelector::Inference),
        MenuChoice::Switch(ModuleSelector::Application),
        MenuChoice::Recovery,
        MenuChoice::Exit,
    ];

    /// Number the operator types for this entry
    pub fn number(self) -> usize {
        match self {
            MenuChoice::Switch(ModuleSelector::Inference) => 1,
            MenuChoice::Switch(ModuleSelector::Application) => 2,
            MenuChoice::Recovery => 3,
            MenuChoice::Exit => 4,
        }
    }

    pub fn label(self) -> String {
        match self {
            MenuChoice::Switch(module) => format!("Switch to {}", module),
            MenuChoice::Recovery => "Force Inference Module into recovery mode".to_string(),
            MenuChoice::Exit => "Exit".to_string(),
        }
    }
}

impl FromStr for MenuChoice {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        MenuChoice::ALL
            .into_iter()
            .find(|choice| choice.number().to_string() == trimmed)
            .ok_or_else(|| Error::Other(format!("invalid menu choice '{}'", trimmed)))
    }
}

/// Human-readable report for a failed action, with hints where useful
pub fn describe_action_error(error: &Error) -> String {
    match error {
        Error::DeviceNotFound { device, .. } => format!(
            "Error: Cannot connect to {}\n\nTry:\n• Check the USB cable to the board\n• Make sure the board is powered on\n• Verify you have permission to open {}",
            device, device
        ),
        Error::ConnectFailure { device, reason } => format!(
            "Error: Failed to connect to serial console on {} ({})\n\nTry:\n• Close other programs using the port\n• Unplug and replug the board",
            device, reason
        ),
        Error::ProcessSpawnFailure { command, reason } => format!(
            "Error: Could not start '{}': {}\n\nTry:\n• Install tio (e.g. `apt install tio`)\n• Set terminal.program in the configuration file",
            command, reason
        ),
        Error::CommandTimeout { command, duration } => format!(
            "Error: No confirmation for '{}' within {} seconds",
            command,
            duration.as_secs()
        ),
        Error::StreamClosed { during } => format!(
            "Error: Serial console closed unexpectedly during '{}'",
            during
        ),
        other => format!("\nError during switch: {}", other),
    }
}

/// The interactive menu loop
pub struct Menu<R, W> {
    switcher: Switcher,
    console: Console<R, W>,
}

impl<R, W> Menu<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: Write + Send,
{
    pub fn new(switcher: Switcher, console: Console<R, W>) -> Self {
        Self { switcher, console }
    }

    /// Print the logo and title
    pub fn print_logo(&mut self) {
        self.console.println("\n");
        for line in LOGO {
            self.console.println(line);
        }
        self.console.println("");
        self.console.println(&format!("\n{}", "-".repeat(50)));
        self.console.println(TITLE);
        self.console.println(&"-".repeat(50));
    }

    fn print_options(&mut self) {
        self.console.println("\nPlease select an option:");
        for choice in MenuChoice::ALL {
            self.console
                .println(&format!("  {}. {}", choice.number(), choice.label()));
        }
        self.console.println("");
        self.console
            .print(&format!("Enter your choice (1-{}): ", MenuChoice::ALL.len()));
    }

    /// Run until the operator exits or input ends.
    ///
    /// # Errors
    /// Only console I/O failures escape; action failures are reported inline.
    pub async fn run(&mut self) -> Result<()> {
        loop {
            self.print_options();
            let Some(line) = self.console.read_line().await? else {
                info!("Operator input closed, exiting");
                self.console.println("\nExiting...");
                return Ok(());
            };

            match line.parse::<MenuChoice>() {
                Ok(MenuChoice::Exit) => {
                    self.console.println("\nExiting...");
                    return Ok(());
                }
                Ok(choice) => {
                    debug!("Menu choice: {:?}", choice);
                    self.dispatch(choice).await;
                }
                Err(_) => {
                    self.console.println("\nInvalid choice, please try again.");
                }
            }

            self.console.println("\nPress ENTER to continue...");
            if self.console.read_line().await?.is_none() {
                info!("Operator input closed, exiting");
                return Ok(());
            }
        }
    }

    /// Run one action, reporting its failure instead of propagating it
    async fn dispatch(&mut self, choice: MenuChoice) {
        let result = match choice {
            MenuChoice::Switch(module) => {
                self.switcher.switch_module(module, &mut self.console).await
            }
            MenuChoice::Recovery => self.switcher.force_recovery(&mut self.console).await,
            MenuChoice::Exit => Ok(()),
        };

        if let Err(e) = result {
            error!("{} failed: {}", choice.label(), e);
            self.console.println(&describe_action_error(&e));
        }
    }
}
