//! Agent runtime: the only component allowed to advance the world state.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::clock::{Clock, SystemClock};
use crate::proposal::Decision;
use crate::state::{AgentStatus, WorldState};

/// What the runtime did with a decision; becomes part of the episode step.
#[derive(Debug, Clone, PartialEq)]
pub struct Applied {
    pub decision: Decision,
    pub from: AgentStatus,
    pub to: AgentStatus,
    pub timestamp: DateTime<Utc>,
}

/// Applies validated decisions to world state.
#[derive(Clone)]
pub struct AgentRuntime {
    clock: Arc<dyn Clock>,
}

impl AgentRuntime {
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// Produces the next world state. `state` itself is left untouched.
    #[must_use]
    pub fn execute(&self, state: &WorldState, decision: &Decision) -> (WorldState, Applied) {
        let next = state.apply(decision);
        tracing::debug!(
            intent = %decision.intent(),
            from = %state.status,
            to = %next.status,
            "decision applied"
        );
        let applied = Applied {
            decision: decision.clone(),
            from: state.status.clone(),
            to: next.status.clone(),
            timestamp: self.clock.now(),
        };
        (next, applied)
    }
}

impl Default for AgentRuntime {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl std::fmt::Debug for AgentRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentRuntime").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::clock::FixedClock;
    use crate::intent::Intent;
    use crate::state::{Bootstrap, RescheduleScenario};
    use crate::value::payload;

    fn runtime() -> (AgentRuntime, DateTime<Utc>) {
        let at = Utc.with_ymd_and_hms(2026, 1, 6, 9, 0, 0).unwrap();
        (AgentRuntime::new(Arc::new(FixedClock::new(at))), at)
    }

    #[test]
    fn ask_for_confirmation_waits_for_user() {
        let (rt, at) = runtime();
        let state = RescheduleScenario.bootstrap();
        let decision = Decision {
            intent: Intent::AskForConfirmation,
            payload: payload([("message", "confirm?")]),
        };
        let (next, applied) = rt.execute(&state, &decision);
        assert_eq!(next.status, AgentStatus::WaitingUserResponse);
        assert_eq!(state.status, AgentStatus::AwaitingUserConfirmation);
        assert_eq!(applied.from, AgentStatus::AwaitingUserConfirmation);
        assert_eq!(applied.to, AgentStatus::WaitingUserResponse);
        assert_eq!(applied.timestamp, at);
        assert_eq!(applied.decision, decision);
    }

    #[test]
    fn abort_is_applied() {
        let (rt, _) = runtime();
        let decision = Decision {
            intent: Intent::Abort,
            payload: payload([("reason", "unclear")]),
        };
        let (next, _) = rt.execute(&RescheduleScenario.bootstrap(), &decision);
        assert_eq!(next.status, AgentStatus::Aborted);
    }

    #[test]
    fn unknown_decision_keeps_state() {
        let (rt, _) = runtime();
        let state = RescheduleScenario.bootstrap();
        let decision = Decision {
            intent: Intent::Other("Snooze".into()),
            payload: payload::<&str, &str, _>([]),
        };
        let (next, applied) = rt.execute(&state, &decision);
        assert_eq!(next, state);
        assert_eq!(applied.from, applied.to);
    }
}
