//! # kyro-arbiter - multi-provider decision arbitration with replay
//!
//! Several providers each propose what an agent should do next. Their
//! proposals are scored, one is chosen by an arbitration policy, and the
//! choice is validated before it may touch the world state. Every cycle is
//! frozen into an episode step so the same evidence can later be re-decided
//! under a different policy without calling any provider again.
//!
//! ## Core Concepts
//!
//! - **Provider**: untrusted source of a [`DecisionProposal`]
//! - **Scorer**: pure map from a proposal to a comparable [`DecisionScore`]
//! - **Arbitrator**: selection rule over scored candidates
//! - **Validator**: the only path from a proposal to an authoritative [`Decision`]
//! - **Episode**: append-only record of frozen cycles, replayable offline
//!
//! ## Usage
//!
//! ```rust,ignore
//! use kyro_arbiter::{ArbitrationPolicy, DecisionEngine, RescheduleScenario};
//! use kyro_arbiter::provider::{AbortProvider, RuleProvider, StochasticProvider};
//! use rand::SeedableRng;
//!
//! let engine = DecisionEngine::builder()
//!     .provider(RuleProvider::new())
//!     .provider(StochasticProvider::new())
//!     .provider(AbortProvider::new())
//!     .build()?;
//!
//! let mut rng = rand::rngs::StdRng::seed_from_u64(7);
//! let outcome = engine.run_once(&RescheduleScenario, &ArbitrationPolicy::Baseline, &mut rng)?;
//!
//! let mut episode = kyro_arbiter::Episode::new();
//! episode.add(outcome.step);
//! let replayed = kyro_arbiter::episode::replay_episode(&episode, &ArbitrationPolicy::ConfidenceOnly)?;
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Core types
pub mod confidence;
pub mod error;
pub mod intent;
pub mod proposal;
pub mod state;
pub mod value;

// Decision pipeline
pub mod arbitration;
pub mod constraint;
pub mod input;
pub mod provider;
pub mod scorer;
pub mod validator;

// Execution, recording and replay
pub mod batch;
pub mod clock;
pub mod config;
pub mod engine;
pub mod episode;
pub mod runtime;

pub use arbitration::{ArbitrationPolicy, Arbitrator, Candidate};
pub use batch::{BatchConfig, BatchHarness, BatchReport, CancelToken, Corpus, IntentDistribution};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::ArbiterConfig;
pub use confidence::Confidence;
pub use constraint::{ConstraintRuleSpec, ConstraintTable};
pub use engine::{CycleOutcome, DecisionEngine};
pub use episode::{Episode, EpisodeStep};
pub use error::{ArbiterError, ArbiterResult, EpisodeError, ValidationError};
pub use input::{DecisionInput, Observer, RescheduleObserver};
pub use intent::Intent;
pub use proposal::{Decision, DecisionProposal, DecisionScore};
pub use provider::{Provider, ProviderId};
pub use runtime::AgentRuntime;
pub use scorer::ProposalScorer;
pub use state::{AgentStatus, Bootstrap, RescheduleScenario, WorldState};
pub use validator::Validator;
pub use value::{Payload, Value};
