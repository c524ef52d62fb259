//! World state.
//!
//! `WorldState` is an immutable fact snapshot. Nothing in the pipeline mutates
//! it in place: the runtime derives a new snapshot from the old one plus a
//! validated decision, and every other component only reads it.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::intent::Intent;
use crate::proposal::Decision;
use crate::value::{payload, Payload};

/// Symbolic status of the agent session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AgentStatus {
    AwaitingUserConfirmation,
    WaitingUserResponse,
    Aborted,
    Other(String),
}

impl AgentStatus {
    /// Returns the wire label of this status.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::AwaitingUserConfirmation => "awaiting_user_confirmation",
            Self::WaitingUserResponse => "waiting_user_response",
            Self::Aborted => "aborted",
            Self::Other(label) => label,
        }
    }

    /// `aborted` is terminal; nothing may transition out of it.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Aborted)
    }
}

impl From<String> for AgentStatus {
    fn from(label: String) -> Self {
        match label.as_str() {
            "awaiting_user_confirmation" => Self::AwaitingUserConfirmation,
            "waiting_user_response" => Self::WaitingUserResponse,
            "aborted" => Self::Aborted,
            _ => Self::Other(label),
        }
    }
}

impl From<AgentStatus> for String {
    fn from(status: AgentStatus) -> Self {
        match status {
            AgentStatus::Other(label) => label,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable snapshot of everything the agent knows about the world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldState {
    pub status: AgentStatus,
    pub user_intent: String,
    /// Domain payload, e.g. the meeting being rescheduled.
    pub meeting: Payload,
    pub permissions: BTreeSet<String>,
}

impl WorldState {
    /// Creates a snapshot with no permissions.
    #[must_use]
    pub fn new(status: AgentStatus, user_intent: impl Into<String>, meeting: Payload) -> Self {
        Self {
            status,
            user_intent: user_intent.into(),
            meeting,
            permissions: BTreeSet::new(),
        }
    }

    /// Returns a copy of this snapshot with a different status.
    #[must_use]
    pub fn with_status(&self, status: AgentStatus) -> Self {
        Self {
            status,
            ..self.clone()
        }
    }

    /// Returns a copy of this snapshot with an extra permission.
    #[must_use]
    pub fn with_permission(&self, permission: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.permissions.insert(permission.into());
        next
    }

    /// Transition function. Only [`crate::runtime::AgentRuntime`] calls this.
    ///
    /// | status | decision | next |
    /// |---|---|---|
    /// | awaiting_user_confirmation | AskForConfirmation | waiting_user_response |
    /// | awaiting_user_confirmation | Abort | aborted |
    /// | any | anything else | unchanged |
    pub(crate) fn apply(&self, decision: &Decision) -> Self {
        let next = match (&self.status, &decision.intent) {
            (AgentStatus::AwaitingUserConfirmation, Intent::AskForConfirmation) => {
                AgentStatus::WaitingUserResponse
            }
            (AgentStatus::AwaitingUserConfirmation, Intent::Abort) => AgentStatus::Aborted,
            (current, _) => current.clone(),
        };
        self.with_status(next)
    }
}

/// Supplies the initial world state of an episode.
pub trait Bootstrap: Send + Sync {
    /// Builds a fresh snapshot.
    fn bootstrap(&self) -> WorldState;
}

impl<F> Bootstrap for F
where
    F: Fn() -> WorldState + Send + Sync,
{
    fn bootstrap(&self) -> WorldState {
        self()
    }
}

/// Meeting `m_123` at 2026-01-06 10:00, awaiting confirmation to reschedule.
#[derive(Debug, Default, Clone, Copy)]
pub struct RescheduleScenario;

impl Bootstrap for RescheduleScenario {
    fn bootstrap(&self) -> WorldState {
        WorldState::new(
            AgentStatus::AwaitingUserConfirmation,
            "reschedule_meeting",
            payload([("id", "m_123"), ("time", "2026-01-06 10:00")]),
        )
        .with_permission("send_email")
    }
}
