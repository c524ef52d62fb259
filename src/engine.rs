//! The decision engine: one observe, propose, arbitrate, validate, execute
//! cycle.
//!
//! The engine owns no world state. Each cycle takes a state snapshot and
//! returns the successor together with the frozen [`EpisodeStep`]; the caller
//! decides whether to append it to an episode. A cycle that fails at any
//! stage produces no step.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use rand::RngCore;

use crate::arbitration::{Arbitrator, Candidate};
use crate::clock::{Clock, SystemClock};
use crate::episode::{EpisodeStep, StepRecord};
use crate::error::{ArbiterError, ArbiterResult};
use crate::input::{Observer, RescheduleObserver};
use crate::proposal::{DecisionProposal, DecisionScore};
use crate::provider::{Provider, ProviderId};
use crate::runtime::AgentRuntime;
use crate::scorer::ProposalScorer;
use crate::state::{Bootstrap, WorldState};
use crate::validator::Validator;

/// Result of one successful cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleOutcome {
    pub next_state: WorldState,
    pub step: EpisodeStep,
}

/// Runs decision cycles over a fixed set of providers.
pub struct DecisionEngine {
    observer: Arc<dyn Observer>,
    /// Sorted by provider id.
    providers: Vec<Arc<dyn Provider>>,
    scorer: ProposalScorer,
    validator: Validator,
    runtime: AgentRuntime,
}

impl DecisionEngine {
    #[must_use]
    pub fn builder() -> DecisionEngineBuilder {
        DecisionEngineBuilder::default()
    }

    /// Provider identities in invocation order.
    pub fn provider_ids(&self) -> impl Iterator<Item = &ProviderId> {
        self.providers.iter().map(|p| p.id())
    }

    #[must_use]
    pub const fn validator(&self) -> &Validator {
        &self.validator
    }

    #[must_use]
    pub const fn scorer(&self) -> &ProposalScorer {
        &self.scorer
    }

    /// Runs one cycle from `state`.
    ///
    /// Providers are invoked in provider-id order, all drawing from `rng`.
    ///
    /// # Errors
    ///
    /// A provider error, `NoValidCandidate` from the arbitrator, or the
    /// validator's rejection of the chosen proposal.
    pub fn run_cycle(
        &self,
        state: &WorldState,
        arbitrator: &dyn Arbitrator,
        rng: &mut dyn RngCore,
    ) -> ArbiterResult<CycleOutcome> {
        let input = self.observer.observe(state);

        let mut proposals: BTreeMap<ProviderId, DecisionProposal> = BTreeMap::new();
        for provider in &self.providers {
            let proposal = provider.propose(&input, rng)?;
            tracing::debug!(
                provider = %provider.id(),
                intent = %proposal.intent,
                confidence = proposal.confidence.value(),
                "proposal"
            );
            proposals.insert(provider.id().clone(), proposal);
        }

        let scores: BTreeMap<ProviderId, DecisionScore> = proposals
            .iter()
            .map(|(id, proposal)| (id.clone(), self.scorer.score(proposal, &input, id)))
            .collect();

        let (chosen_provider, decision) = {
            let candidates: Vec<Candidate<'_>> = proposals
                .iter()
                .zip(scores.values())
                .map(|((provider, proposal), score)| Candidate {
                    provider,
                    proposal,
                    score,
                })
                .collect();

            let chosen = arbitrator.choose(&candidates).map_err(|e| {
                tracing::warn!(policy = arbitrator.name(), error = %e, "arbitration failed");
                e
            })?;

            let decision = self
                .validator
                .validate(state, chosen.proposal, &input)
                .map_err(|e| {
                    tracing::warn!(
                        provider = %chosen.provider,
                        intent = %chosen.proposal.intent,
                        error = %e,
                        "decision rejected"
                    );
                    e
                })?;

            (chosen.provider.clone(), decision)
        };

        let (next_state, applied) = self.runtime.execute(state, &decision);

        let step = EpisodeStep::try_from(StepRecord {
            state_snapshot: state.clone(),
            decision_input: input,
            proposals,
            scores,
            chosen_intent: decision.intent().clone(),
            chosen_provider: Some(chosen_provider),
            decision: Some(decision),
            timestamp: Some(applied.timestamp),
        })
        .map_err(|e| ArbiterError::internal(format!("cycle produced an inconsistent step: {e}")))?;

        Ok(CycleOutcome { next_state, step })
    }

    /// Runs one cycle from a freshly bootstrapped state.
    ///
    /// # Errors
    ///
    /// See [`DecisionEngine::run_cycle`].
    pub fn run_once(
        &self,
        bootstrap: &dyn Bootstrap,
        arbitrator: &dyn Arbitrator,
        rng: &mut dyn RngCore,
    ) -> ArbiterResult<CycleOutcome> {
        self.run_cycle(&bootstrap.bootstrap(), arbitrator, rng)
    }
}

impl std::fmt::Debug for DecisionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecisionEngine")
            .field("providers", &self.provider_ids().collect::<Vec<_>>())
            .field("scorer", &self.scorer)
            .field("validator", &self.validator)
            .finish_non_exhaustive()
    }
}

/// Builder for [`DecisionEngine`].
///
/// Defaults: the reschedule observer, the default scorer and validator, and
/// the system clock. At least one provider is required.
#[derive(Default)]
pub struct DecisionEngineBuilder {
    observer: Option<Arc<dyn Observer>>,
    providers: Vec<Arc<dyn Provider>>,
    scorer: Option<ProposalScorer>,
    validator: Option<Validator>,
    clock: Option<Arc<dyn Clock>>,
}

impl DecisionEngineBuilder {
    #[must_use]
    pub fn observer(mut self, observer: impl Observer + 'static) -> Self {
        self.observer = Some(Arc::new(observer));
        self
    }

    #[must_use]
    pub fn provider(mut self, provider: impl Provider + 'static) -> Self {
        self.providers.push(Arc::new(provider));
        self
    }

    #[must_use]
    pub fn shared_provider(mut self, provider: Arc<dyn Provider>) -> Self {
        self.providers.push(provider);
        self
    }

    #[must_use]
    pub fn scorer(mut self, scorer: ProposalScorer) -> Self {
        self.scorer = Some(scorer);
        self
    }

    #[must_use]
    pub fn validator(mut self, validator: Validator) -> Self {
        self.validator = Some(validator);
        self
    }

    #[must_use]
    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Some(Arc::new(clock));
        self
    }

    /// Builds the engine.
    ///
    /// # Errors
    ///
    /// `NoProviders` for an empty provider set, `DuplicateProvider` when two
    /// providers share an identity.
    pub fn build(self) -> ArbiterResult<DecisionEngine> {
        if self.providers.is_empty() {
            return Err(ArbiterError::NoProviders);
        }

        let mut seen = BTreeSet::new();
        for provider in &self.providers {
            if !seen.insert(provider.id().clone()) {
                return Err(ArbiterError::DuplicateProvider {
                    id: provider.id().to_string(),
                });
            }
        }

        let mut providers = self.providers;
        providers.sort_by(|a, b| a.id().cmp(b.id()));

        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));

        Ok(DecisionEngine {
            observer: self.observer.unwrap_or_else(|| Arc::new(RescheduleObserver)),
            providers,
            scorer: self.scorer.unwrap_or_default(),
            validator: self.validator.unwrap_or_default(),
            runtime: AgentRuntime::new(clock),
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::arbitration::ArbitrationPolicy;
    use crate::clock::FixedClock;
    use crate::intent::Intent;
    use crate::provider::{AbortProvider, RuleProvider, StochasticProvider};
    use crate::state::{AgentStatus, RescheduleScenario};

    fn engine() -> DecisionEngine {
        DecisionEngine::builder()
            .provider(StochasticProvider::new())
            .provider(RuleProvider::new())
            .provider(AbortProvider::new())
            .clock(FixedClock::new(Utc.with_ymd_and_hms(2026, 1, 6, 9, 0, 0).unwrap()))
            .build()
            .unwrap()
    }

    #[test]
    fn providers_run_in_id_order() {
        let e = engine();
        let ids: Vec<&str> = e.provider_ids().map(ProviderId::as_str).collect();
        assert_eq!(ids, ["abort", "llm", "rule"]);
    }

    #[test]
    fn baseline_cycle_asks_for_confirmation() {
        let e = engine();
        for seed in 0..50 {
            let out = e
                .run_once(&RescheduleScenario, &ArbitrationPolicy::Baseline, &mut StdRng::seed_from_u64(seed))
                .unwrap();
            assert_eq!(out.step.chosen_intent(), &Intent::AskForConfirmation);
            assert_eq!(out.step.chosen_provider().map(ProviderId::as_str), Some("rule"));
            assert_eq!(out.next_state.status, AgentStatus::WaitingUserResponse);
            assert_eq!(out.step.proposals().len(), 3);
            assert_eq!(out.step.state_snapshot().status, AgentStatus::AwaitingUserConfirmation);
            assert!(out.step.timestamp().is_some());
        }
    }

    #[test]
    fn same_seed_same_step() {
        let e = engine();
        // compare whole results; under ConfidenceOnly some seeds end in a validation error
        for seed in 0..20 {
            let a = e.run_once(&RescheduleScenario, &ArbitrationPolicy::ConfidenceOnly, &mut StdRng::seed_from_u64(seed));
            let b = e.run_once(&RescheduleScenario, &ArbitrationPolicy::ConfidenceOnly, &mut StdRng::seed_from_u64(seed));
            assert_eq!(format!("{a:?}"), format!("{b:?}"));
        }
    }

    #[test]
    fn confidence_only_can_pick_a_rejected_email() {
        // an email at high confidence wins arbitration but fails validation
        let e = DecisionEngine::builder()
            .provider(
                StochasticProvider::new()
                    .with_intents(vec![Intent::SendRescheduleEmail])
                    .with_confidence_range(0.9, 0.9),
            )
            .provider(RuleProvider::new())
            .build()
            .unwrap();
        let err = e
            .run_once(&RescheduleScenario, &ArbitrationPolicy::ConfidenceOnly, &mut StdRng::seed_from_u64(0))
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn aborted_state_yields_no_candidate() {
        let e = engine();
        let aborted = RescheduleScenario.bootstrap().with_status(AgentStatus::Aborted);
        let err = e
            .run_cycle(&aborted, &ArbitrationPolicy::Baseline, &mut StdRng::seed_from_u64(0))
            .unwrap_err();
        assert!(err.is_no_valid_candidate());
    }

    #[test]
    fn rejects_empty_and_duplicate_providers() {
        assert!(matches!(DecisionEngine::builder().build(), Err(ArbiterError::NoProviders)));
        let err = DecisionEngine::builder()
            .provider(RuleProvider::new())
            .provider(AbortProvider::new().with_id("rule"))
            .build()
            .unwrap_err();
        assert!(matches!(err, ArbiterError::DuplicateProvider { id } if id == "rule"));
    }

    #[test]
    fn input_state_is_untouched() {
        let e = engine();
        let state = RescheduleScenario.bootstrap();
        let before = state.clone();
        let _ = e
            .run_cycle(&state, &ArbitrationPolicy::Baseline, &mut StdRng::seed_from_u64(1))
            .unwrap();
        assert_eq!(state, before);
    }
}
