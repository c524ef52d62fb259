//! Proposals, scores and decisions.

use serde::{Deserialize, Deserializer, Serialize};

use crate::confidence::Confidence;
use crate::intent::Intent;
use crate::value::Payload;

/// A candidate decision suggested by one provider. Not binding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionProposal {
    pub intent: Intent,
    pub args: Payload,
    pub confidence: Confidence,
}

impl DecisionProposal {
    #[must_use]
    pub fn new(intent: Intent, args: Payload, confidence: Confidence) -> Self {
        Self {
            intent,
            args,
            confidence,
        }
    }
}

/// Comparable score vector of one proposal.
///
/// Produced only by [`crate::scorer::ProposalScorer`], which is a pure
/// function of (proposal, input, provider identity).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionScore {
    pub confidence: Confidence,
    pub intent_valid: bool,
    pub constraint_violation: u32,
    pub provider_priority: i32,
}

impl DecisionScore {
    /// Valid intent and no violated constraint.
    #[must_use]
    pub const fn is_clean(&self) -> bool {
        self.intent_valid && self.constraint_violation == 0
    }
}

/// The authoritative decision. Only this may be applied to a world state.
///
/// Outside this crate a `Decision` can only be obtained from
/// [`crate::validator::Validator::validate`] or from a loaded episode step.
/// It serializes but has no public `Deserialize`:
///
/// ```compile_fail
/// let forged: kyro_arbiter::Decision =
///     serde_json::from_str(r#"{"intent":"SendRescheduleEmail","payload":{}}"#).unwrap();
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Decision {
    pub(crate) intent: Intent,
    pub(crate) payload: Payload,
}

#[derive(Deserialize)]
struct RecordedDecision {
    intent: Intent,
    payload: Payload,
}

/// Reads the optional decision of a stored episode step.
pub(crate) fn deserialize_recorded<'de, D>(deserializer: D) -> Result<Option<Decision>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<RecordedDecision>::deserialize(deserializer)?.map(|r| Decision {
        intent: r.intent,
        payload: r.payload,
    }))
}

impl Decision {
    pub const fn intent(&self) -> &Intent {
        &self.intent
    }

    pub const fn payload(&self) -> &Payload {
        &self.payload
    }
}
