//! Operator Console
//!
//! The person at the keyboard: status messages go out, confirmation and
//! menu lines come in.

use async_trait::async_trait;
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::error::{Error, Result};

/// Interaction with the operator during an action
#[async_trait]
pub trait Operator: Send {
    /// Show a progress or result message
    fn status(&mut self, message: &str);

    /// Show `prompt` and wait for the operator to press ENTER
    ///
    /// # Errors
    /// Returns an error if input is closed or unreadable
    async fn acknowledge(&mut self, prompt: &str) -> Result<()>;
}

/// Line-oriented console over an async reader and a writer
pub struct Console<R, W> {
    input: R,
    output: W,
}

impl<R, W> Console<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: Write + Send,
{
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Write `text` without a trailing newline and flush
    pub fn print(&mut self, text: &str) {
        if let Err(e) = write!(self.output, "{}", text).and_then(|_| self.output.flush()) {
            debug!("Console write failed: {}", e);
        }
    }

    /// Write `text` followed by a newline
    pub fn println(&mut self, text: &str) {
        self.print(text);
        self.print("\n");
    }

    /// Read one line, without its terminator. `None` at end of input.
    pub async fn read_line(&mut self) -> Result<Option<String>> {
        let mut line = String::new();
        let read = self.input.read_line(&mut line).await?;
        if read == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }
}

#[async_trait]
impl<R, W> Operator for Console<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: Write + Send,
{
    fn status(&mut self, message: &str) {
        self.println(message);
    }

    async fn acknowledge(&mut self, prompt: &str) -> Result<()> {
        self.println(prompt);
        match self.read_line().await? {
            Some(_) => Ok(()),
            None => Err(Error::Other("operator input closed".to_string())),
        }
    }
}
