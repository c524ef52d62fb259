//! Proposal scoring.
//!
//! `score(proposal, input, provider)` is a pure function: no clock, no
//! randomness, no interior state. Recomputing a score from the same inputs
//! always gives the same vector, which is what lets a frozen episode be
//! audited later.

use std::collections::BTreeMap;

use crate::constraint::{ConstraintRuleSpec, ConstraintTable};
use crate::error::ValidationError;
use crate::input::DecisionInput;
use crate::proposal::{DecisionProposal, DecisionScore};
use crate::provider::ProviderId;

/// Static rank per provider identity. Unknown identities rank 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriorityTable(BTreeMap<ProviderId, i32>);

impl PriorityTable {
    #[must_use]
    pub fn new(entries: BTreeMap<ProviderId, i32>) -> Self {
        Self(entries)
    }

    /// Priority of `id`, or 0 when the identity is unknown.
    #[must_use]
    pub fn priority(&self, id: &ProviderId) -> i32 {
        self.0.get(id).copied().unwrap_or(0)
    }

    /// Default ranks: rule 3, abort 2, llm 1.
    #[must_use]
    pub fn default_entries() -> BTreeMap<ProviderId, i32> {
        BTreeMap::from([
            (ProviderId::new(ProviderId::RULE), 3),
            (ProviderId::new(ProviderId::ABORT), 2),
            (ProviderId::new(ProviderId::LLM), 1),
        ])
    }
}

impl Default for PriorityTable {
    fn default() -> Self {
        Self(Self::default_entries())
    }
}

/// Maps a proposal onto a comparable [`DecisionScore`].
#[derive(Debug, Clone, Default)]
pub struct ProposalScorer {
    priorities: PriorityTable,
    constraints: ConstraintTable,
}

impl ProposalScorer {
    #[must_use]
    pub fn new(priorities: PriorityTable, constraints: ConstraintTable) -> Self {
        Self {
            priorities,
            constraints,
        }
    }

    /// Builds a scorer from configuration tables.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidConstraintRule` for a bad pattern.
    pub fn from_specs(
        priorities: BTreeMap<ProviderId, i32>,
        rules: &[ConstraintRuleSpec],
    ) -> Result<Self, ValidationError> {
        Ok(Self::new(PriorityTable::new(priorities), ConstraintTable::new(rules)?))
    }

    /// Scores one proposal.
    #[must_use]
    pub fn score(
        &self,
        proposal: &DecisionProposal,
        input: &DecisionInput,
        provider: &ProviderId,
    ) -> DecisionScore {
        let violations = self
            .constraints
            .violations(&proposal.intent, &input.constraints)
            .count();

        DecisionScore {
            confidence: proposal.confidence,
            intent_valid: input.permits(&proposal.intent),
            constraint_violation: u32::try_from(violations).unwrap_or(u32::MAX),
            provider_priority: self.priorities.priority(provider),
        }
    }

    /// The constraint table shared with the validator.
    #[must_use]
    pub fn constraints(&self) -> &ConstraintTable {
        &self.constraints
    }

    #[must_use]
    pub fn priorities(&self) -> &PriorityTable {
        &self.priorities
    }
}
