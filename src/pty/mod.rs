//! Pseudoterminal (PTY) Management
//!
//! Runs the serial terminal program inside a pseudoterminal, bridging its
//! blocking I/O to the session driver and tearing it down reliably.

pub mod process;
pub mod signals;
pub mod streams;
pub mod transport;

// Re-exports for convenience
pub use process::{is_command_available, spawn_pty_process, SpawnConfig};
pub use signals::Signal;
pub use streams::{PtyStreams, StreamStats};
pub use transport::PtyTransport;
