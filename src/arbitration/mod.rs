//! Arbitration: choosing one proposal among scored candidates.
//!
//! Arbitrators are the "personality" of the runtime. They are pure selection
//! rules over a candidate slice: no memory between calls, no dependence on
//! call order. Either they return one of the candidates or they fail with
//! `NoValidCandidate`; they never invent a fallback.

mod policies;
mod resolver;

use crate::error::ArbiterResult;
use crate::proposal::{DecisionProposal, DecisionScore};
use crate::provider::ProviderId;

pub use policies::ArbitrationPolicy;
pub use resolver::{choose_baseline, choose_by_confidence, choose_by_priority, choose_random};

/// One scored proposal, borrowed from the cycle or the frozen step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate<'a> {
    pub provider: &'a ProviderId,
    pub proposal: &'a DecisionProposal,
    pub score: &'a DecisionScore,
}

/// Selection policy over scored candidates.
pub trait Arbitrator: Send + Sync {
    /// Short stable name, used in logs and batch reports.
    fn name(&self) -> &str;

    /// Chooses one candidate.
    ///
    /// # Errors
    ///
    /// Returns `ArbiterError::NoValidCandidate` when nothing is eligible.
    fn choose<'a>(&self, candidates: &[Candidate<'a>]) -> ArbiterResult<Candidate<'a>>;
}

impl<A: Arbitrator + ?Sized> Arbitrator for &A {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn choose<'a>(&self, candidates: &[Candidate<'a>]) -> ArbiterResult<Candidate<'a>> {
        (**self).choose(candidates)
    }
}

impl<A: Arbitrator + ?Sized> Arbitrator for Box<A> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn choose<'a>(&self, candidates: &[Candidate<'a>]) -> ArbiterResult<Candidate<'a>> {
        (**self).choose(candidates)
    }
}
