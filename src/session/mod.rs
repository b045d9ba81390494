//! Serial Console Session Driver
//!
//! A [`Session`] owns one running terminal program attached to the board's
//! serial device. It writes command lines, waits for expected output with an
//! explicit three-way outcome, and closes the program with its quit escape.
//!
//! The process is released on every path: [`Session::close`] sends the quit
//! escape and waits briefly, and dropping an unclosed session kills it.

pub mod buffer;
pub mod launcher;
pub mod transport;

use regex::Regex;
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;

use crate::error::{Error, Result};
use crate::models::SessionState;
pub use buffer::OutputBuffer;
pub use launcher::TioLauncher;
pub use transport::{ReadOutcome, TerminalLauncher, Transport};

/// Line terminator appended by [`Session::send_line`]
pub const LINE_TERMINATOR: &str = "\n";

/// Banner the terminal program prints once attached to `device`
pub fn connection_banner(device: &str) -> String {
    format!("Connected to {}", device)
}

/// Text to wait for in session output
#[derive(Debug, Clone)]
pub enum Pattern {
    /// Exact substring
    Literal(String),
    /// Regular expression
    Regex(Regex),
}

impl Pattern {
    pub fn literal(text: impl Into<String>) -> Self {
        Pattern::Literal(text.into())
    }

    /// Compile a regular expression pattern
    pub fn regex(pattern: &str) -> Result<Self> {
        Ok(Pattern::Regex(Regex::new(pattern)?))
    }

    /// Byte range of the first match in `haystack`
    pub fn find(&self, haystack: &str) -> Option<(usize, usize)> {
        match self {
            Pattern::Literal(text) => haystack
                .find(text.as_str())
                .map(|start| (start, start + text.len())),
            Pattern::Regex(re) => re.find(haystack).map(|m| (m.start(), m.end())),
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pattern::Literal(text) => write!(f, "{:?}", text),
            Pattern::Regex(re) => write!(f, "/{}/", re.as_str()),
        }
    }
}

/// Outcome of [`Session::expect`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpectOutcome {
    /// The pattern appeared; carries the matched text
    Matched(String),
    /// The timeout elapsed first
    TimedOut,
    /// The terminal program closed its output first
    Closed,
}

/// Keys that make the terminal program quit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EscapeSequence {
    /// Control byte entering the program's command mode
    pub control_byte: u8,
    /// Command key sent after the control byte
    pub quit_key: String,
}

impl EscapeSequence {
    /// Raw bytes to write
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = vec![self.control_byte];
        bytes.extend_from_slice(self.quit_key.as_bytes());
        bytes
    }
}

impl Default for EscapeSequence {
    /// Ctrl-T then `q`, the tio quit sequence
    fn default() -> Self {
        Self {
            control_byte: 0x14,
            quit_key: "q".to_string(),
        }
    }
}

/// Session connection parameters
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// How long to wait for the connection banner
    pub connect_timeout: Duration,
    /// Quit sequence sent by [`Session::close`]
    pub escape: EscapeSequence,
    /// How long the program gets to exit after the quit sequence
    pub close_grace: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            escape: EscapeSequence::default(),
            close_grace: Duration::from_millis(500),
        }
    }
}

/// One interactive terminal session against a serial device
pub struct Session {
    device: String,
    transport: Option<Box<dyn Transport>>,
    buffer: OutputBuffer,
    state: SessionState,
    options: SessionOptions,
}

impl Session {
    /// Launch the terminal program and wait for its connection banner.
    ///
    /// # Errors
    /// - [`Error::ProcessSpawnFailure`] if the program cannot be launched
    /// - [`Error::ConnectFailure`] if the banner does not appear within
    ///   `options.connect_timeout` or the program exits first
    ///
    /// Nothing is written to the program on failure.
    pub async fn connect(
        launcher: &dyn TerminalLauncher,
        device: &str,
        options: SessionOptions,
    ) -> Result<Session> {
        let mut session = Session {
            device: device.to_string(),
            transport: None,
            buffer: OutputBuffer::new(),
            state: SessionState::Disconnected,
            options,
        };

        session.set_state(SessionState::Connecting);
        let transport = match launcher.launch(device).await {
            Ok(transport) => transport,
            Err(e) => {
                session.set_state(SessionState::Failed);
                return Err(e);
            }
        };
        session.transport = Some(transport);

        let banner = Pattern::literal(connection_banner(device));
        let timeout = session.options.connect_timeout;
        let reason = match session.wait_for(&banner, timeout).await {
            ExpectOutcome::Matched(_) => {
                info!("Connected to {}", device);
                session.set_state(SessionState::Connected);
                return Ok(session);
            }
            ExpectOutcome::TimedOut => format!("no connection banner within {:?}", timeout),
            ExpectOutcome::Closed => "terminal program exited before connecting".to_string(),
        };

        session.set_state(SessionState::Failed);
        session.release().await;
        Err(Error::ConnectFailure {
            device: device.to_string(),
            reason,
        })
    }

    /// Device this session is attached to
    pub fn device(&self) -> &str {
        &self.device
    }

    /// Current lifecycle state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Write `text` followed by the line terminator
    pub fn send_line(&mut self, text: &str) -> Result<()> {
        if !self.state.is_open() {
            return Err(Error::SessionNotOpen {
                device: self.device.clone(),
            });
        }
        let transport = self.transport.as_mut().ok_or_else(|| Error::SessionNotOpen {
            device: self.device.clone(),
        })?;

        debug!("-> {:?}", text);
        let mut line = String::with_capacity(text.len() + LINE_TERMINATOR.len());
        line.push_str(text);
        line.push_str(LINE_TERMINATOR);
        transport.write(line.as_bytes())
    }

    /// Wait until `pattern` appears in the session output.
    ///
    /// Output up to the end of the match is consumed. A timeout leaves the
    /// session usable; end of stream closes it.
    pub async fn expect(&mut self, pattern: &Pattern, timeout: Duration) -> ExpectOutcome {
        if !self.state.is_open() {
            return ExpectOutcome::Closed;
        }

        self.set_state(SessionState::AwaitingPattern);
        let outcome = self.wait_for(pattern, timeout).await;
        match outcome {
            ExpectOutcome::Matched(ref text) => {
                debug!("Matched {} ({:?})", pattern, text);
                self.set_state(SessionState::Connected);
            }
            ExpectOutcome::TimedOut => {
                debug!("No match for {} within {:?}", pattern, timeout);
                self.set_state(SessionState::Connected);
            }
            ExpectOutcome::Closed => {
                debug!("Stream closed while waiting for {}", pattern);
                self.set_state(SessionState::Closed);
                self.release().await;
            }
        }
        outcome
    }

    /// Send the quit escape and release the terminal program.
    ///
    /// Safe to call on an already closed session.
    pub async fn close(&mut self) {
        if self.transport.is_none() {
            self.state = SessionState::Closed;
            return;
        }

        if self.state.is_open() {
            if let Some(transport) = self.transport.as_mut() {
                if let Err(e) = transport.write(&self.options.escape.to_bytes()) {
                    warn!("Failed to send quit sequence to {}: {}", self.device, e);
                }
            }
        }

        self.set_state(SessionState::Closed);
        self.release().await;
        debug!("Session to {} closed", self.device);
    }

    /// Core wait loop shared by the banner wait and [`Session::expect`]
    async fn wait_for(&mut self, pattern: &Pattern, timeout: Duration) -> ExpectOutcome {
        let deadline = Instant::now() + timeout;

        loop {
            if let Some((start, end)) = pattern.find(self.buffer.as_str()) {
                let matched = self.buffer.as_str()[start..end].to_string();
                self.buffer.consume(end);
                return ExpectOutcome::Matched(matched);
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return ExpectOutcome::TimedOut;
            }

            let Some(transport) = self.transport.as_mut() else {
                return ExpectOutcome::Closed;
            };
            match transport.read(remaining).await {
                ReadOutcome::Data(bytes) => {
                    trace!("<- {:?}", String::from_utf8_lossy(&bytes));
                    self.buffer.push(&bytes);
                }
                // Idle only happens once the deadline passes; the next turn returns TimedOut
                ReadOutcome::Idle => {}
                ReadOutcome::Eof => {
                    return match pattern.find(self.buffer.as_str()) {
                        Some((start, end)) => {
                            let matched = self.buffer.as_str()[start..end].to_string();
                            self.buffer.consume(end);
                            ExpectOutcome::Matched(matched)
                        }
                        None => ExpectOutcome::Closed,
                    };
                }
            }
        }
    }

    /// Shut the transport down and forget it
    async fn release(&mut self) {
        if let Some(mut transport) = self.transport.take() {
            transport.shutdown(self.options.close_grace).await;
        }
    }

    fn set_state(&mut self, next: SessionState) {
        if self.state == next {
            return;
        }
        if !self.state.can_transition_to(next) {
            debug!("Unexpected session transition {:?} -> {:?}", self.state, next);
        }
        trace!("Session {}: {:?} -> {:?}", self.device, self.state, next);
        self.state = next;
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Some(mut transport) = self.transport.take() {
            warn!("Session to {} dropped while open, killing terminal program", self.device);
            transport.terminate();
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("device", &self.device)
            .field("state", &self.state)
            .field("buffered", &self.buffer.as_str().len())
            .finish()
    }
}
