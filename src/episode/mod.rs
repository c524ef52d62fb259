//! Episodes: frozen, ordered records of decision cycles.
//!
//! An [`EpisodeStep`] captures everything needed to re-decide a cycle
//! offline: the state and input the providers saw, every proposal, every
//! score, and the outcome. Steps are immutable once built; an [`Episode`]
//! only grows by appending.

#[cfg(feature = "persistent")]
mod file_lock;
mod replay;
mod serialization;
#[cfg(feature = "persistent")]
mod store;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::arbitration::Candidate;
use crate::input::DecisionInput;
use crate::intent::Intent;
use crate::proposal::{Decision, DecisionProposal, DecisionScore};
use crate::provider::ProviderId;
use crate::state::WorldState;

pub use replay::{compare, replay_episode, replay_step, AbRow};
pub use serialization::{from_json, to_json_pretty};
#[cfg(feature = "persistent")]
pub use store::EpisodeStore;

/// A step whose parts do not fit together.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct InvalidStep(String);

/// The parts of a step before its invariants are checked.
///
/// This is also the wire shape of a step.
#[derive(Debug, Clone, Deserialize)]
pub struct StepRecord {
    pub state_snapshot: WorldState,
    pub decision_input: DecisionInput,
    pub proposals: BTreeMap<ProviderId, DecisionProposal>,
    pub scores: BTreeMap<ProviderId, DecisionScore>,
    pub chosen_intent: Intent,
    #[serde(default)]
    pub chosen_provider: Option<ProviderId>,
    #[serde(default, deserialize_with = "crate::proposal::deserialize_recorded")]
    pub(crate) decision: Option<Decision>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

/// One frozen decision cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "StepRecord")]
pub struct EpisodeStep {
    state_snapshot: WorldState,
    decision_input: DecisionInput,
    proposals: BTreeMap<ProviderId, DecisionProposal>,
    scores: BTreeMap<ProviderId, DecisionScore>,
    chosen_intent: Intent,
    #[serde(skip_serializing_if = "Option::is_none")]
    chosen_provider: Option<ProviderId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    decision: Option<Decision>,
    #[serde(skip_serializing_if = "Option::is_none")]
    timestamp: Option<DateTime<Utc>>,
}

impl TryFrom<StepRecord> for EpisodeStep {
    type Error = InvalidStep;

    fn try_from(record: StepRecord) -> Result<Self, Self::Error> {
        if record.proposals.is_empty() {
            return Err(InvalidStep("step has no proposals".to_string()));
        }

        if !record.proposals.keys().eq(record.scores.keys()) {
            let proposals: Vec<&str> = record.proposals.keys().map(ProviderId::as_str).collect();
            let scores: Vec<&str> = record.scores.keys().map(ProviderId::as_str).collect();
            return Err(InvalidStep(format!(
                "proposal providers {proposals:?} differ from score providers {scores:?}"
            )));
        }

        for (id, proposal) in &record.proposals {
            let score = &record.scores[id];
            if score.confidence != proposal.confidence {
                return Err(InvalidStep(format!(
                    "score confidence {} does not match proposal confidence {} for provider '{id}'",
                    score.confidence, proposal.confidence
                )));
            }
        }

        if let Some(provider) = &record.chosen_provider {
            let proposal = record.proposals.get(provider).ok_or_else(|| {
                InvalidStep(format!("chosen provider '{provider}' made no proposal"))
            })?;
            if proposal.intent != record.chosen_intent {
                return Err(InvalidStep(format!(
                    "chosen provider '{provider}' proposed '{}', step records '{}'",
                    proposal.intent, record.chosen_intent
                )));
            }
        }

        if let Some(decision) = &record.decision {
            if decision.intent != record.chosen_intent {
                return Err(InvalidStep(format!(
                    "decision intent '{}' differs from chosen intent '{}'",
                    decision.intent, record.chosen_intent
                )));
            }
        }

        Ok(Self {
            state_snapshot: record.state_snapshot,
            decision_input: record.decision_input,
            proposals: record.proposals,
            scores: record.scores,
            chosen_intent: record.chosen_intent,
            chosen_provider: record.chosen_provider,
            decision: record.decision,
            timestamp: record.timestamp,
        })
    }
}

impl EpisodeStep {
    /// State the providers observed.
    #[must_use]
    pub const fn state_snapshot(&self) -> &WorldState {
        &self.state_snapshot
    }

    #[must_use]
    pub const fn decision_input(&self) -> &DecisionInput {
        &self.decision_input
    }

    #[must_use]
    pub const fn proposals(&self) -> &BTreeMap<ProviderId, DecisionProposal> {
        &self.proposals
    }

    #[must_use]
    pub const fn scores(&self) -> &BTreeMap<ProviderId, DecisionScore> {
        &self.scores
    }

    #[must_use]
    pub const fn chosen_intent(&self) -> &Intent {
        &self.chosen_intent
    }

    #[must_use]
    pub const fn chosen_provider(&self) -> Option<&ProviderId> {
        self.chosen_provider.as_ref()
    }

    #[must_use]
    pub const fn decision(&self) -> Option<&Decision> {
        self.decision.as_ref()
    }

    #[must_use]
    pub const fn timestamp(&self) -> Option<&DateTime<Utc>> {
        self.timestamp.as_ref()
    }

    /// Candidates in provider-id order, the same order the online cycle used.
    #[must_use]
    pub fn candidates(&self) -> Vec<Candidate<'_>> {
        self.proposals
            .iter()
            .zip(self.scores.values())
            .map(|((provider, proposal), score)| Candidate {
                provider,
                proposal,
                score,
            })
            .collect()
    }
}

/// An append-only sequence of steps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Episode {
    steps: Vec<EpisodeStep>,
}

impl Episode {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a step.
    pub fn add(&mut self, step: EpisodeStep) {
        self.steps.push(step);
    }

    #[must_use]
    pub fn steps(&self) -> &[EpisodeStep] {
        &self.steps
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, EpisodeStep> {
        self.steps.iter()
    }
}

impl From<Vec<EpisodeStep>> for Episode {
    fn from(steps: Vec<EpisodeStep>) -> Self {
        Self { steps }
    }
}

impl<'a> IntoIterator for &'a Episode {
    type Item = &'a EpisodeStep;
    type IntoIter = std::slice::Iter<'a, EpisodeStep>;

    fn into_iter(self) -> Self::IntoIter {
        self.steps.iter()
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::confidence::Confidence;
    use crate::input::{Observer, RescheduleObserver};
    use crate::scorer::ProposalScorer;
    use crate::state::{Bootstrap, RescheduleScenario};
    use crate::value::payload;

    /// Scenario B frozen: abort, llm email at 0.95, rule ask.
    pub(crate) fn record() -> StepRecord {
        let state = RescheduleScenario.bootstrap();
        let input = RescheduleObserver.observe(&state);
        let proposals = BTreeMap::from([
            (
                ProviderId::from("abort"),
                DecisionProposal::new(
                    Intent::Abort,
                    payload([("reason", "User intent unclear")]),
                    Confidence::new(0.6).unwrap(),
                ),
            ),
            (
                ProviderId::from("llm"),
                DecisionProposal::new(
                    Intent::SendRescheduleEmail,
                    payload([("message", "LLM suggests SendRescheduleEmail")]),
                    Confidence::new(0.95).unwrap(),
                ),
            ),
            (
                ProviderId::from("rule"),
                DecisionProposal::new(
                    Intent::AskForConfirmation,
                    payload([("message", "Rule: please confirm first")]),
                    Confidence::new(0.7).unwrap(),
                ),
            ),
        ]);
        let scorer = ProposalScorer::default();
        let scores = proposals
            .iter()
            .map(|(id, p)| (id.clone(), scorer.score(p, &input, id)))
            .collect();
        let decision = Decision {
            intent: Intent::AskForConfirmation,
            payload: proposals[&ProviderId::from("rule")].args.clone(),
        };
        StepRecord {
            state_snapshot: state,
            decision_input: input,
            proposals,
            scores,
            chosen_intent: Intent::AskForConfirmation,
            chosen_provider: Some(ProviderId::from("rule")),
            decision: Some(decision),
            timestamp: None,
        }
    }

    pub(crate) fn step() -> EpisodeStep {
        EpisodeStep::try_from(record()).unwrap()
    }
}
