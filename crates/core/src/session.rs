// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Conversation sessions and their lifecycle state machine.
//!
//! Transitions:
//!   - `active → idle` by the sweeper once `idle_timeout` has elapsed
//!   - `idle → active` on any message
//!   - `idle → abandoned` by the sweeper once `2 × idle_timeout` has elapsed
//!   - `active | idle → completed` explicitly by the caller
//!
//! The sweeper applies at most one transition per cycle; `abandoned` and
//! `completed` are terminal.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Default idle timeout: 30 minutes.
pub const DEFAULT_IDLE_TIMEOUT_MS: u64 = 30 * 60 * 1000;

/// Who said a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

crate::simple_display! {
    Role {
        User => "user",
        Assistant => "assistant",
    }
}

/// One turn in a session. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// Session lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    #[default]
    Active,
    Idle,
    Abandoned,
    Completed,
}

crate::simple_display! {
    SessionState {
        Active => "active",
        Idle => "idle",
        Abandoned => "abandoned",
        Completed => "completed",
    }
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Abandoned | Self::Completed)
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(Self::Active),
            "idle" => Some(Self::Idle),
            "abandoned" => Some(Self::Abandoned),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }
}

fn default_idle_timeout() -> u64 {
    DEFAULT_IDLE_TIMEOUT_MS
}

/// A conversation thread with one agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub agent: String,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    #[serde(default)]
    pub state: SessionState,
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_ms: u64,
    #[serde(default)]
    pub messages: Vec<Message>,
    /// Name of a Tool crystallized in this thread, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command_generated: Option<String>,
}

impl Session {
    pub fn new(id: impl Into<String>, agent: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            agent: agent.into(),
            created_at: now,
            last_activity: now,
            state: SessionState::Active,
            idle_timeout_ms: DEFAULT_IDLE_TIMEOUT_MS,
            messages: Vec::new(),
            command_generated: None,
        }
    }

    /// Append a message. Any message revives an idle session.
    pub fn add_message(&mut self, role: Role, content: impl Into<String>, now: DateTime<Utc>) {
        self.messages.push(Message { role, content: content.into(), timestamp: now });
        self.last_activity = now;
        if self.state == SessionState::Idle {
            self.state = SessionState::Active;
        }
    }

    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    fn idle_timeout(&self) -> Duration {
        Duration::milliseconds(self.idle_timeout_ms as i64)
    }

    /// Evaluate one sweep cycle. Returns the new state if a transition
    /// applies, without mutating.
    ///
    /// At most one step per call: an expired `active` session goes `idle`
    /// now and can only go `abandoned` on a later sweep.
    pub fn sweep_transition(&self, now: DateTime<Utc>) -> Option<SessionState> {
        if self.state.is_terminal() {
            return None;
        }
        let elapsed = now.signed_duration_since(self.last_activity);
        match self.state {
            SessionState::Active if elapsed > self.idle_timeout() => Some(SessionState::Idle),
            SessionState::Idle if elapsed > self.idle_timeout() * 2 => {
                Some(SessionState::Abandoned)
            }
            _ => None,
        }
    }

    /// Apply one sweep cycle. Returns the transition taken, if any.
    pub fn sweep(&mut self, now: DateTime<Utc>) -> Option<SessionState> {
        let next = self.sweep_transition(now)?;
        self.state = next;
        Some(next)
    }

    /// Explicit terminal transition, e.g. after a command crystallizes.
    pub fn complete(&mut self) {
        if !self.state.is_terminal() {
            self.state = SessionState::Completed;
        }
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
