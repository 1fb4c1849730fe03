// SPDX-FileCopyrightText: 2026 Stan Grams <sjg@haxx.space>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Session state machine.
//!
//! Tracks where a modem session is in the bring-up sequence. Sending and
//! status queries are not gated by state; only `join` requires a completed
//! configuration.

use std::fmt;

use serde::Serialize;

/// Events that can trigger state transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// Configuration sub-commands are about to be sent
    ConfigureStarted,
    /// All configuration sub-commands were attempted
    ConfigureFinished,
    /// Configuration stopped on a transport error
    ConfigureAborted,
    /// Join command is about to be sent
    JoinStarted,
    /// Join success fragment was seen
    JoinAccepted,
    /// Join retry budget exhausted, or the transport failed mid-join
    JoinRejected,
}

/// The current state of a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum SessionState {
    #[default]
    Unconfigured,
    Configuring,
    Configured,
    Joining,
    Joined,
    JoinFailed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unconfigured => write!(f, "Unconfigured"),
            Self::Configuring => write!(f, "Configuring"),
            Self::Configured => write!(f, "Configured"),
            Self::Joining => write!(f, "Joining"),
            Self::Joined => write!(f, "Joined"),
            Self::JoinFailed => write!(f, "JoinFailed"),
        }
    }
}

impl SessionState {
    /// Whether configuration has completed at least once.
    pub fn is_configured(&self) -> bool {
        matches!(
            self,
            Self::Configured | Self::Joining | Self::Joined | Self::JoinFailed
        )
    }

    pub fn is_joined(&self) -> bool {
        matches!(self, Self::Joined)
    }

    /// States in which a new configure or join may begin.
    pub fn is_idle(&self) -> bool {
        !matches!(self, Self::Configuring | Self::Joining)
    }
}

/// The session state machine that manages state transitions.
#[derive(Debug, Clone)]
pub struct SessionStateMachine {
    state: SessionState,
    transition_count: u64,
}

impl Default for SessionStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStateMachine {
    /// Create a new state machine in the Unconfigured state.
    pub fn new() -> Self {
        Self {
            state: SessionState::Unconfigured,
            transition_count: 0,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn transition_count(&self) -> u64 {
        self.transition_count
    }

    /// Process an event and potentially transition to a new state.
    /// Returns true if a transition occurred.
    pub fn process_event(&mut self, event: SessionEvent) -> bool {
        match self.next_state(event) {
            Some(state) => {
                self.state = state;
                self.transition_count += 1;
                true
            }
            None => false,
        }
    }

    fn next_state(&self, event: SessionEvent) -> Option<SessionState> {
        use SessionEvent as E;
        use SessionState as S;

        match (self.state, event) {
            // Reconfiguring is allowed from any settled state
            (current, E::ConfigureStarted) if current.is_idle() => Some(S::Configuring),
            (S::Configuring, E::ConfigureFinished) => Some(S::Configured),
            (S::Configuring, E::ConfigureAborted) => Some(S::Unconfigured),

            (current, E::JoinStarted) if current.is_idle() && current.is_configured() => {
                Some(S::Joining)
            }
            (S::Joining, E::JoinAccepted) => Some(S::Joined),
            (S::Joining, E::JoinRejected) => Some(S::JoinFailed),

            _ => None,
        }
    }
}
