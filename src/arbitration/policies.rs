use serde::{Deserialize, Serialize};

use crate::error::ArbiterResult;

use super::resolver::{choose_baseline, choose_by_confidence, choose_by_priority, choose_random};
use super::{Arbitrator, Candidate};

/// The built-in arbitration policies.
///
/// Policies are pure selection rules so a stored step can be re-decided
/// deterministically. `Random` is only deterministic when seeded; the seed is
/// mixed with the candidate set on every call, so the result depends on the
/// step and never on call history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum ArbitrationPolicy {
    /// Drop invalid or constraint-violating candidates, then order by
    /// (violations asc, priority desc, confidence desc).
    Baseline,

    /// Trust confidence alone. Ignores validity and priority.
    ConfidenceOnly,

    /// Trust provider priority alone. Ignores validity and confidence.
    PriorityOnly,

    /// Uniform pick over the unfiltered candidate set.
    Random {
        /// Fixed seed for reproducible picks; `None` draws from the thread RNG.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        seed: Option<u64>,
    },
}

impl Default for ArbitrationPolicy {
    fn default() -> Self {
        Self::Baseline
    }
}

impl ArbitrationPolicy {
    /// A seeded random policy.
    #[must_use]
    pub const fn random_seeded(seed: u64) -> Self {
        Self::Random { seed: Some(seed) }
    }

    /// Returns a short stable identifier suitable for logging/debugging.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Baseline => "baseline",
            Self::ConfidenceOnly => "confidence_only",
            Self::PriorityOnly => "priority_only",
            Self::Random { .. } => "random",
        }
    }
}

impl Arbitrator for ArbitrationPolicy {
    fn name(&self) -> &str {
        ArbitrationPolicy::name(self)
    }

    fn choose<'a>(&self, candidates: &[Candidate<'a>]) -> ArbiterResult<Candidate<'a>> {
        match self {
            Self::Baseline => choose_baseline(candidates),
            Self::ConfidenceOnly => choose_by_confidence(candidates),
            Self::PriorityOnly => choose_by_priority(candidates),
            Self::Random { seed } => choose_random(candidates, *seed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serde_uses_type_tag() {
        let json = serde_json::to_string(&ArbitrationPolicy::Baseline).unwrap();
        assert_eq!(json, r#"{"type":"baseline"}"#);

        let p: ArbitrationPolicy = serde_json::from_str(r#"{"type":"random","seed":9}"#).unwrap();
        assert_eq!(p, ArbitrationPolicy::random_seeded(9));

        let p: ArbitrationPolicy = serde_json::from_str(r#"{"type":"random"}"#).unwrap();
        assert_eq!(p, ArbitrationPolicy::Random { seed: None });
    }

    #[test]
    fn names_are_stable() {
        assert_eq!(ArbitrationPolicy::default().name(), "baseline");
        assert_eq!(ArbitrationPolicy::ConfidenceOnly.name(), "confidence_only");
        assert_eq!(ArbitrationPolicy::PriorityOnly.name(), "priority_only");
        assert_eq!(ArbitrationPolicy::random_seeded(1).name(), "random");
    }
}
