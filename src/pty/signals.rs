//! PTY Signal Handling
//!
//! Sends termination signals to the terminal program when it does not
//! exit on its own after the quit escape.

use crate::error::{Error, Result};

/// Signal types used to bring a terminal program down
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// Termination signal (graceful shutdown)
    Terminate,
    /// Kill signal (forceful termination)
    Kill,
}

/// Send a signal to a process by PID
pub fn send_signal(pid: u32, signal: Signal) -> Result<()> {
    #[cfg(unix)]
    {
        use nix::sys::signal::{kill, Signal as NixSignal};
        use nix::unistd::Pid;

        let nix_signal = match signal {
            Signal::Terminate => NixSignal::SIGTERM,
            Signal::Kill => NixSignal::SIGKILL,
        };

        kill(Pid::from_raw(pid as i32), nix_signal).map_err(|e| Error::SignalSendFailed {
            signal: format!("{:?}", signal),
            reason: e.to_string(),
        })
    }

    #[cfg(not(unix))]
    {
        let _ = pid;
        Err(Error::SignalNotSupported {
            signal: format!("{:?}", signal),
            platform: std::env::consts::OS.to_string(),
        })
    }
}
