//! Decision providers.
//!
//! A provider is a source of candidate decisions. It sees only the
//! [`DecisionInput`] and never touches the world state. Providers may be
//! nondeterministic, but all randomness comes from the generator passed in
//! by the caller, so one cycle's stream never leaks into another's.

mod builtin;

use std::fmt;

use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::error::ArbiterResult;
use crate::input::DecisionInput;
use crate::proposal::DecisionProposal;

pub use builtin::{AbortProvider, RuleProvider, StochasticProvider};

/// Stable identity of a provider.
///
/// Used as the join key across the proposal, score and priority tables.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProviderId(String);

impl ProviderId {
    /// Identity of the rule-based provider.
    pub const RULE: &'static str = "rule";
    /// Identity of the stochastic, model-backed provider.
    pub const LLM: &'static str = "llm";
    /// Identity of the abort provider.
    pub const ABORT: &'static str = "abort";

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ProviderId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Source of candidate decisions.
pub trait Provider: Send + Sync {
    /// Stable identity of this provider.
    fn id(&self) -> &ProviderId;

    /// Proposes one decision for `input`.
    ///
    /// # Errors
    ///
    /// A provider error is fatal for the current cycle and is not retried.
    fn propose(&self, input: &DecisionInput, rng: &mut dyn RngCore)
        -> ArbiterResult<DecisionProposal>;
}
