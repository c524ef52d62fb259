//! Decision input: the observation window handed to every provider.
//!
//! Providers never see the `WorldState` itself, only the projection built by
//! an [`Observer`]. The input is fixed at cycle start.

use serde::{Deserialize, Serialize};

use crate::intent::Intent;
use crate::state::{AgentStatus, WorldState};
use crate::value::{Payload, Value};

/// Constraint text that forbids emailing before the user confirmed.
pub const NO_EMAIL_WITHOUT_CONFIRMATION: &str = "Do not send email without confirmation";

/// Constraint text that limits a provider to one intent.
pub const SINGLE_INTENT: &str = "Only propose one intent";

/// What a provider is allowed to see and do during one cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionInput {
    pub task: String,
    pub observable_state: Payload,
    pub allowed_intents: Vec<Intent>,
    pub constraints: Vec<String>,
}

impl DecisionInput {
    /// Returns true if `intent` is among the allowed intents.
    #[must_use]
    pub fn permits(&self, intent: &Intent) -> bool {
        self.allowed_intents.contains(intent)
    }
}

/// Derives a [`DecisionInput`] from a world state.
pub trait Observer: Send + Sync {
    /// Projects `state` into the observation window for one cycle.
    fn observe(&self, state: &WorldState) -> DecisionInput;
}

/// Observer for the reschedule scenario.
///
/// While the session awaits confirmation it exposes the status, the meeting
/// time and a context line, and permits the three known intents. Any other
/// status yields a `No-op` task with nothing permitted.
#[derive(Debug, Default, Clone, Copy)]
pub struct RescheduleObserver;

impl Observer for RescheduleObserver {
    fn observe(&self, state: &WorldState) -> DecisionInput {
        if state.status != AgentStatus::AwaitingUserConfirmation {
            return DecisionInput {
                task: "No-op".to_string(),
                observable_state: Payload::new(),
                allowed_intents: Vec::new(),
                constraints: Vec::new(),
            };
        }

        let mut observable = Payload::new();
        observable.insert("status".to_string(), Value::from(state.status.as_str()));
        if let Some(time) = state.meeting.get("time") {
            observable.insert("meeting_time".to_string(), time.clone());
        }
        observable.insert(
            "context".to_string(),
            Value::from("User wants to reschedule a meeting"),
        );

        DecisionInput {
            task: "Handle user's request".to_string(),
            observable_state: observable,
            allowed_intents: vec![
                Intent::AskForConfirmation,
                Intent::SendRescheduleEmail,
                Intent::Abort,
            ],
            constraints: vec![
                NO_EMAIL_WITHOUT_CONFIRMATION.to_string(),
                SINGLE_INTENT.to_string(),
            ],
        }
    }
}
