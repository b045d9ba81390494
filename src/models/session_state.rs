//! Session State Model
//!
//! Lifecycle of one interactive terminal session.

/// Represents the state of a terminal session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// No process has been spawned yet
    #[default]
    Disconnected,
    /// Process spawned, waiting for the connection banner
    Connecting,
    /// Banner seen, ready for commands
    Connected,
    /// Blocked in a pattern wait
    AwaitingPattern,
    /// Session released
    Closed,
    /// Connection could not be established
    Failed,
}

impl SessionState {
    /// Whether moving from `self` to `next` is a legal lifecycle step
    pub fn can_transition_to(self, next: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, next),
            (Disconnected, Connecting)
                | (Connecting, Connected)
                | (Connecting, Failed)
                | (Connected, AwaitingPattern)
                | (AwaitingPattern, Connected)
                | (AwaitingPattern, Closed)
                | (Connected, Closed)
                | (Failed, Closed)
        )
    }

    /// Whether commands can be written in this state
    pub fn is_open(self) -> bool {
        matches!(self, SessionState::Connected | SessionState::AwaitingPattern)
    }
}
