use rand::seq::SliceRandom;
use rand::{Rng, RngCore};

use crate::confidence::Confidence;
use crate::error::{ArbiterError, ArbiterResult};
use crate::input::DecisionInput;
use crate::intent::Intent;
use crate::proposal::DecisionProposal;
use crate::value::payload;

use super::{Provider, ProviderId};

/// Conservative, deterministic fallback: always asks for confirmation.
#[derive(Debug, Clone)]
pub struct RuleProvider {
    id: ProviderId,
    confidence: Confidence,
}

impl RuleProvider {
    /// Confidence of the rule proposal.
    pub const CONFIDENCE: f64 = 0.7;

    #[must_use]
    pub fn new() -> Self {
        Self {
            id: ProviderId::new(ProviderId::RULE),
            confidence: Confidence::saturating(Self::CONFIDENCE),
        }
    }

    /// Same rule, different identity.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<ProviderId>) -> Self {
        self.id = id.into();
        self
    }
}

impl Default for RuleProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl Provider for RuleProvider {
    fn id(&self) -> &ProviderId {
        &self.id
    }

    fn propose(
        &self,
        _input: &DecisionInput,
        _rng: &mut dyn RngCore,
    ) -> ArbiterResult<DecisionProposal> {
        Ok(DecisionProposal::new(
            Intent::AskForConfirmation,
            payload([("message", "Rule: please confirm first")]),
            self.confidence,
        ))
    }
}

/// Unreliable, exploratory source, standing in for a model-backed provider.
///
/// Samples the intent uniformly from a candidate set and the confidence
/// uniformly from `[low, high)`.
#[derive(Debug, Clone)]
pub struct StochasticProvider {
    id: ProviderId,
    intents: Vec<Intent>,
    low: f64,
    high: f64,
}

impl StochasticProvider {
    /// Default confidence range.
    pub const RANGE: (f64, f64) = (0.4, 0.95);

    #[must_use]
    pub fn new() -> Self {
        Self {
            id: ProviderId::new(ProviderId::LLM),
            intents: vec![Intent::AskForConfirmation, Intent::SendRescheduleEmail],
            low: Self::RANGE.0,
            high: Self::RANGE.1,
        }
    }

    #[must_use]
    pub fn with_intents(mut self, intents: Vec<Intent>) -> Self {
        self.intents = intents;
        self
    }

    /// Sets the confidence range. Bounds are clamped into [0.0, 1.0].
    #[must_use]
    pub fn with_confidence_range(mut self, low: f64, high: f64) -> Self {
        self.low = Confidence::saturating(low).value();
        self.high = Confidence::saturating(high).value();
        self
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<ProviderId>) -> Self {
        self.id = id.into();
        self
    }
}

impl Default for StochasticProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl Provider for StochasticProvider {
    fn id(&self) -> &ProviderId {
        &self.id
    }

    fn propose(
        &self,
        _input: &DecisionInput,
        rng: &mut dyn RngCore,
    ) -> ArbiterResult<DecisionProposal> {
        let intent = self
            .intents
            .choose(&mut *rng)
            .cloned()
            .ok_or_else(|| ArbiterError::internal(format!("provider '{}' has no intents", self.id)))?;

        let confidence = if self.low < self.high {
            rng.gen_range(self.low..self.high)
        } else {
            self.low
        };

        Ok(DecisionProposal::new(
            intent.clone(),
            payload([("message", format!("LLM suggests {intent}"))]),
            Confidence::saturating(confidence),
        ))
    }
}

/// Circuit breaker: always proposes to abort with moderate confidence.
#[derive(Debug, Clone)]
pub struct AbortProvider {
    id: ProviderId,
    confidence: Confidence,
}

impl AbortProvider {
    /// Confidence of the abort proposal.
    pub const CONFIDENCE: f64 = 0.6;

    #[must_use]
    pub fn new() -> Self {
        Self {
            id: ProviderId::new(ProviderId::ABORT),
            confidence: Confidence::saturating(Self::CONFIDENCE),
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<ProviderId>) -> Self {
        self.id = id.into();
        self
    }
}

impl Default for AbortProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl Provider for AbortProvider {
    fn id(&self) -> &ProviderId {
        &self.id
    }

    fn propose(
        &self,
        _input: &DecisionInput,
        _rng: &mut dyn RngCore,
    ) -> ArbiterResult<DecisionProposal> {
        Ok(DecisionProposal::new(
            Intent::Abort,
            payload([("reason", "User intent unclear")]),
            self.confidence,
        ))
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::input::{Observer, RescheduleObserver};
    use crate::state::{Bootstrap, RescheduleScenario};

    fn input() -> DecisionInput {
        RescheduleObserver.observe(&RescheduleScenario.bootstrap())
    }

    #[test]
    fn rule_is_deterministic() {
        let p = RuleProvider::new();
        let mut a = StdRng::seed_from_u64(1);
        let mut b = StdRng::seed_from_u64(2);
        let x = p.propose(&input(), &mut a).unwrap();
        let y = p.propose(&input(), &mut b).unwrap();
        assert_eq!(x, y);
        assert_eq!(x.intent, Intent::AskForConfirmation);
        assert_eq!(x.confidence.value(), 0.7);
        assert_eq!(p.id().as_str(), "rule");
    }

    #[test]
    fn abort_proposes_reason() {
        let p = AbortProvider::new();
        let x = p.propose(&input(), &mut StdRng::seed_from_u64(0)).unwrap();
        assert_eq!(x.intent, Intent::Abort);
        assert_eq!(x.args["reason"].as_string(), Some("User intent unclear"));
        assert_eq!(x.confidence.value(), 0.6);
    }

    #[test]
    fn stochastic_stays_in_range_and_set() {
        let p = StochasticProvider::new();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let x = p.propose(&input(), &mut rng).unwrap();
            let c = x.confidence.value();
            assert!((0.4..0.95).contains(&c), "confidence {c} out of range");
            assert!(matches!(
                x.intent,
                Intent::AskForConfirmation | Intent::SendRescheduleEmail
            ));
            assert!(x.args["message"].as_string().unwrap().starts_with("LLM suggests"));
        }
    }

    #[test]
    fn stochastic_is_reproducible_per_seed() {
        let p = StochasticProvider::new();
        let a = p.propose(&input(), &mut StdRng::seed_from_u64(42)).unwrap();
        let b = p.propose(&input(), &mut StdRng::seed_from_u64(42)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn stochastic_without_intents_fails() {
        let p = StochasticProvider::new().with_intents(vec![]);
        let err = p.propose(&input(), &mut StdRng::seed_from_u64(0)).unwrap_err();
        assert!(err.is_internal());
    }

    #[test]
    fn degenerate_range_uses_low() {
        let p = StochasticProvider::new().with_confidence_range(0.8, 0.8);
        let x = p.propose(&input(), &mut StdRng::seed_from_u64(0)).unwrap();
        assert_eq!(x.confidence.value(), 0.8);
    }
}
