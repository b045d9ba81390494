//! Scripted serial terminal, device listing and operator

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rm01_switcher::device::DeviceLister;
use rm01_switcher::error::{Error, Result};
use rm01_switcher::operator::Operator;
use rm01_switcher::session::{connection_banner, ReadOutcome, TerminalLauncher, Transport};

/// What happened on the scripted terminals
#[derive(Debug, Default)]
pub struct SerialLog {
    /// Every write, in order
    pub writes: Vec<Vec<u8>>,
    /// Graceful shutdowns
    pub shutdowns: usize,
    /// Forced kills
    pub terminations: usize,
}

impl SerialLog {
    /// Writes decoded as text
    pub fn written_text(&self) -> Vec<String> {
        self.writes
            .iter()
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
            .collect()
    }

    /// Whether `line` plus terminator was written
    pub fn wrote_line(&self, line: &str) -> bool {
        let expected = format!("{}\n", line);
        self.writes.iter().any(|w| w == expected.as_bytes())
    }
}

#[derive(Debug, Clone)]
enum Reaction {
    Output(String),
    Close,
}

/// Behavior of one terminal program run
#[derive(Debug, Clone, Default)]
pub struct SerialScript {
    greeting: Vec<String>,
    reactions: Vec<(String, Reaction)>,
    close_after_greeting: bool,
}

impl SerialScript {
    /// Prints tio's connection banner for `device`
    pub fn connected(device: &str) -> Self {
        Self {
            greeting: vec![format!("[tio 10:42:17] {}\r\n", connection_banner(device))],
            ..Default::default()
        }
    }

    /// Prints nothing and never exits
    pub fn silent() -> Self {
        Self::default()
    }

    /// Prints `text` on start
    pub fn greeting(mut self, text: &str) -> Self {
        self.greeting.push(text.to_string());
        self
    }

    /// Prints `output` after `line` is written
    pub fn on_line(mut self, line: &str, output: &str) -> Self {
        self.reactions
            .push((line.to_string(), Reaction::Output(output.to_string())));
        self
    }

    /// Exits after `line` is written
    pub fn close_on_line(mut self, line: &str) -> Self {
        self.reactions.push((line.to_string(), Reaction::Close));
        self
    }

    /// Exits once the greeting has been read
    pub fn then_close(mut self) -> Self {
        self.close_after_greeting = true;
        self
    }
}

struct ScriptedTransport {
    pending: VecDeque<Vec<u8>>,
    reactions: Vec<(String, Reaction)>,
    close_when_drained: bool,
    shut_down: bool,
    log: Arc<Mutex<SerialLog>>,
}

impl ScriptedTransport {
    fn new(script: &SerialScript, log: Arc<Mutex<SerialLog>>) -> Self {
        Self {
            pending: script
                .greeting
                .iter()
                .map(|chunk| chunk.as_bytes().to_vec())
                .collect(),
            reactions: script.reactions.clone(),
            close_when_drained: script.close_after_greeting,
            shut_down: false,
            log,
        }
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    fn write(&mut self, data: &[u8]) -> Result<()> {
        if self.shut_down || (self.close_when_drained && self.pending.is_empty()) {
            return Err(Error::PtyInputSendFailed {
                reason: "terminal program exited".to_string(),
            });
        }
        self.log.lock().unwrap().writes.push(data.to_vec());

        let text = String::from_utf8_lossy(data);
        let line = text.trim_end_matches('\n');
        for (trigger, reaction) in &self.reactions {
            if trigger == line {
                match reaction {
                    Reaction::Output(output) => self.pending.push_back(output.as_bytes().to_vec()),
                    Reaction::Close => self.close_when_drained = true,
                }
            }
        }
        Ok(())
    }

    async fn read(&mut self, timeout: Duration) -> ReadOutcome {
        if let Some(chunk) = self.pending.pop_front() {
            return ReadOutcome::Data(chunk);
        }
        if self.close_when_drained || self.shut_down {
            return ReadOutcome::Eof;
        }
        tokio::time::sleep(timeout).await;
        ReadOutcome::Idle
    }

    async fn shutdown(&mut self, _grace: Duration) {
        self.shut_down = true;
        self.log.lock().unwrap().shutdowns += 1;
    }

    fn terminate(&mut self) {
        self.shut_down = true;
        self.log.lock().unwrap().terminations += 1;
    }
}

/// Launcher handing out scripted terminals
pub struct ScriptedLauncher {
    script: SerialScript,
    failure: Option<String>,
    launches: AtomicUsize,
    log: Arc<Mutex<SerialLog>>,
}

impl ScriptedLauncher {
    pub fn new(script: SerialScript) -> Arc<Self> {
        Arc::new(Self {
            script,
            failure: None,
            launches: AtomicUsize::new(0),
            log: Arc::new(Mutex::new(SerialLog::default())),
        })
    }

    /// Launcher whose program cannot be started
    pub fn failing(reason: &str) -> Arc<Self> {
        Arc::new(Self {
            script: SerialScript::silent(),
            failure: Some(reason.to_string()),
            launches: AtomicUsize::new(0),
            log: Arc::new(Mutex::new(SerialLog::default())),
        })
    }

    /// Number of launch attempts
    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    pub fn log(&self) -> std::sync::MutexGuard<'_, SerialLog> {
        self.log.lock().unwrap()
    }
}

#[async_trait]
impl TerminalLauncher for ScriptedLauncher {
    async fn launch(&self, _device: &str) -> Result<Box<dyn Transport>> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        if let Some(reason) = &self.failure {
            return Err(Error::ProcessSpawnFailure {
                command: "tio".to_string(),
                reason: reason.clone(),
            });
        }
        Ok(Box::new(ScriptedTransport::new(&self.script, self.log.clone())))
    }
}

/// Device listing that replays canned results, then repeats a fallback
pub struct ScriptedLister {
    responses: Mutex<VecDeque<std::result::Result<String, String>>>,
    fallback: String,
    calls: AtomicUsize,
}

impl ScriptedLister {
    /// Always lists `listing`
    pub fn always(listing: &str) -> Arc<Self> {
        Self::sequence(Vec::new(), listing)
    }

    /// Never lists anything
    pub fn empty() -> Arc<Self> {
        Self::always("")
    }

    /// Replays `responses` (an `Err` is a failed listing) then `fallback`
    pub fn sequence(
        responses: Vec<std::result::Result<&str, &str>>,
        fallback: &str,
    ) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(
                responses
                    .into_iter()
                    .map(|r| r.map(str::to_string).map_err(str::to_string))
                    .collect(),
            ),
            fallback: fallback.to_string(),
            calls: AtomicUsize::new(0),
        })
    }

    /// Number of listings taken
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DeviceLister for ScriptedLister {
    async fn list_devices(&self) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.responses.lock().unwrap().pop_front();
        match next {
            Some(Ok(listing)) => Ok(listing),
            Some(Err(reason)) => Err(Error::DeviceListFailed {
                command: "tio -l".to_string(),
                reason,
            }),
            None => Ok(self.fallback.clone()),
        }
    }
}

/// Console writer whose contents stay readable after it is handed off
#[derive(Debug, Clone, Default)]
pub struct SharedOutput(Arc<Mutex<Vec<u8>>>);

impl SharedOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl std::io::Write for SharedOutput {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Operator that records messages and acknowledges every prompt
#[derive(Debug, Default)]
pub struct RecordingOperator {
    pub messages: Vec<String>,
    pub prompts: Vec<String>,
    /// Fail acknowledgements as if input had closed
    pub input_closed: bool,
}

impl RecordingOperator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether any message contains `needle`
    pub fn saw(&self, needle: &str) -> bool {
        self.messages.iter().any(|m| m.contains(needle))
    }
}

#[async_trait]
impl Operator for RecordingOperator {
    fn status(&mut self, message: &str) {
        self.messages.push(message.to_string());
    }

    async fn acknowledge(&mut self, prompt: &str) -> Result<()> {
        self.prompts.push(prompt.to_string());
        if self.input_closed {
            return Err(Error::Other("operator input closed".to_string()));
        }
        Ok(())
    }
}
