//! Configuration loaded from TOML.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::arbitration::{ArbitrationPolicy, Arbitrator};
use crate::batch::{BatchConfig, BatchHarness, BatchReport};
use crate::constraint::{ConstraintRuleSpec, ConstraintTable};
use crate::engine::{DecisionEngine, DecisionEngineBuilder};
use crate::error::{ArbiterResult, ValidationError};
use crate::provider::{AbortProvider, ProviderId, RuleProvider, StochasticProvider};
use crate::scorer::{PriorityTable, ProposalScorer};
use crate::state::RescheduleScenario;
use crate::validator::Validator;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatorConfig {
    #[serde(default = "default_floor")]
    pub confidence_floor: f64,
}

fn default_floor() -> f64 {
    Validator::DEFAULT_FLOOR
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            confidence_floor: default_floor(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScorerConfig {
    #[serde(default = "PriorityTable::default_entries")]
    pub priorities: BTreeMap<ProviderId, i32>,
    #[serde(default = "ConstraintTable::default_specs")]
    pub constraint_rules: Vec<ConstraintRuleSpec>,
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            priorities: PriorityTable::default_entries(),
            constraint_rules: ConstraintTable::default_specs(),
        }
    }
}

fn default_replay_policies() -> Vec<ArbitrationPolicy> {
    vec![
        ArbitrationPolicy::Baseline,
        ArbitrationPolicy::ConfidenceOnly,
        ArbitrationPolicy::PriorityOnly,
        ArbitrationPolicy::random_seeded(0),
    ]
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArbiterConfig {
    #[serde(default)]
    pub validator: ValidatorConfig,
    #[serde(default)]
    pub scorer: ScorerConfig,
    #[serde(default)]
    pub batch: BatchConfig,
    /// Arbitrator used while recording the corpus.
    #[serde(default)]
    pub online_policy: ArbitrationPolicy,
    /// Arbitrators the corpus is replayed under.
    #[serde(default = "default_replay_policies")]
    pub replay_policies: Vec<ArbitrationPolicy>,
}

impl Default for ArbiterConfig {
    fn default() -> Self {
        Self {
            validator: ValidatorConfig::default(),
            scorer: ScorerConfig::default(),
            batch: BatchConfig::default(),
            online_policy: ArbitrationPolicy::default(),
            replay_policies: default_replay_policies(),
        }
    }
}

impl ArbiterConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` for unparsable TOML or out-of-range values,
    /// `InvalidConstraintRule` for a bad pattern.
    pub fn from_toml_str(s: &str) -> Result<Self, ValidationError> {
        let config: Self = toml::from_str(s).map_err(|e| ValidationError::InvalidConfig {
            reason: format!("parse config: {e}"),
        })?;
        config.validate()
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// As [`ArbiterConfig::from_toml_str`], plus `InvalidConfig` when the file
    /// cannot be read.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ValidationError> {
        let path = path.as_ref();
        let s = std::fs::read_to_string(path).map_err(|e| ValidationError::InvalidConfig {
            reason: format!("read {}: {e}", path.display()),
        })?;
        Self::from_toml_str(&s)
    }

    /// Checks value ranges and compiles the constraint rules.
    ///
    /// # Errors
    ///
    /// The first invalid setting.
    pub fn validate(self) -> Result<Self, ValidationError> {
        let floor = self.validator.confidence_floor;
        if floor.is_nan() || !(0.0..=1.0).contains(&floor) {
            return Err(ValidationError::InvalidConfig {
                reason: format!("validator.confidence_floor must be in [0.0, 1.0] (got {floor})"),
            });
        }

        for (name, value) in [
            ("batch.cycles", self.batch.cycles),
            ("batch.workers", self.batch.workers),
            ("batch.queue_capacity", self.batch.queue_capacity),
        ] {
            if value == 0 {
                return Err(ValidationError::InvalidConfig {
                    reason: format!("{name} must be at least 1"),
                });
            }
        }

        ConstraintTable::new(&self.scorer.constraint_rules)?;
        Ok(self)
    }

    /// # Errors
    ///
    /// `InvalidConstraintRule` for a bad pattern.
    pub fn build_scorer(&self) -> Result<ProposalScorer, ValidationError> {
        ProposalScorer::from_specs(self.scorer.priorities.clone(), &self.scorer.constraint_rules)
    }

    /// # Errors
    ///
    /// `InvalidConfig` or `InvalidConstraintRule`.
    pub fn build_validator(&self) -> Result<Validator, ValidationError> {
        Validator::new(
            self.validator.confidence_floor,
            ConstraintTable::new(&self.scorer.constraint_rules)?,
        )
    }

    /// Engine builder with the configured scorer and validator and no
    /// providers.
    ///
    /// # Errors
    ///
    /// See [`ArbiterConfig::build_validator`].
    pub fn engine_builder(&self) -> ArbiterResult<DecisionEngineBuilder> {
        Ok(DecisionEngine::builder()
            .scorer(self.build_scorer()?)
            .validator(self.build_validator()?))
    }

    /// Engine over the rule, stochastic and abort providers.
    ///
    /// # Errors
    ///
    /// See [`ArbiterConfig::engine_builder`].
    pub fn reschedule_engine(&self) -> ArbiterResult<DecisionEngine> {
        self.engine_builder()?
            .provider(RuleProvider::new())
            .provider(StochasticProvider::new())
            .provider(AbortProvider::new())
            .build()
    }

    /// Batch harness over [`ArbiterConfig::reschedule_engine`] and the
    /// reschedule scenario.
    ///
    /// # Errors
    ///
    /// See [`ArbiterConfig::engine_builder`].
    pub fn reschedule_harness(&self) -> ArbiterResult<BatchHarness> {
        Ok(BatchHarness::new(
            self.reschedule_engine()?,
            RescheduleScenario,
            self.batch.clone(),
        ))
    }

    /// Records a corpus under `online_policy` and replays it under every
    /// entry of `replay_policies`, in order.
    ///
    /// # Errors
    ///
    /// See [`ArbiterConfig::reschedule_harness`] and [`BatchHarness::run`].
    pub fn run_batch(&self) -> ArbiterResult<BatchReport> {
        let harness = self.reschedule_harness()?;
        let replays: Vec<&dyn Arbitrator> = self.replay_policies.iter().map(|p| p as &dyn Arbitrator).collect();
        harness.run(Arc::new(self.online_policy), &replays)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::Intent;

    #[test]
    fn test_defaults() {
        let cfg = ArbiterConfig::default();
        assert_eq!(cfg.validator.confidence_floor, 0.6);
        assert_eq!(cfg.scorer.priorities[&ProviderId::from("rule")], 3);
        assert_eq!(cfg.scorer.priorities[&ProviderId::from("abort")], 2);
        assert_eq!(cfg.scorer.priorities[&ProviderId::from("llm")], 1);
        assert_eq!(cfg.scorer.constraint_rules.len(), 1);
        assert_eq!(cfg.batch, BatchConfig::default());
        assert_eq!(cfg.batch.cycles, 1000);
        assert_eq!(cfg.online_policy, ArbitrationPolicy::Baseline);
        assert_eq!(cfg.replay_policies.len(), 4);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_empty_document_is_default() {
        assert_eq!(ArbiterConfig::from_toml_str("").unwrap(), ArbiterConfig::default());
    }

    #[test]
    fn test_partial_document() {
        let cfg = ArbiterConfig::from_toml_str(
            r#"
            [validator]
            confidence_floor = 0.8

            [scorer.priorities]
            rule = 5
            oracle = 4

            [[scorer.constraint_rules]]
            pattern = "(?i)never abort"
            intent = "Abort"

            [batch]
            cycles = 10
            workers = 2

            [online_policy]
            type = "random"
            seed = 7
            "#,
        )
        .unwrap();

        assert_eq!(cfg.validator.confidence_floor, 0.8);
        assert_eq!(cfg.scorer.priorities.len(), 2);
        assert_eq!(cfg.scorer.constraint_rules[0].intent, Intent::Abort);
        assert_eq!(cfg.batch.cycles, 10);
        assert_eq!(cfg.batch.workers, 2);
        assert_eq!(cfg.batch.queue_capacity, 1024);
        assert_eq!(cfg.online_policy, ArbitrationPolicy::random_seeded(7));

        let scorer = cfg.build_scorer().unwrap();
        assert_eq!(scorer.priorities().priority(&"oracle".into()), 4);
        assert_eq!(cfg.build_validator().unwrap().confidence_floor(), 0.8);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(ArbiterConfig::from_toml_str("[validator]\nconfidence_floor = 1.2").is_err());
        assert!(ArbiterConfig::from_toml_str("[batch]\nworkers = 0").is_err());
        assert!(ArbiterConfig::from_toml_str("[batch]\ncycles = 0").is_err());
        assert!(matches!(
            ArbiterConfig::from_toml_str("[[scorer.constraint_rules]]\npattern = \"(\"\nintent = \"Abort\""),
            Err(ValidationError::InvalidConstraintRule { .. })
        ));
        assert!(matches!(
            ArbiterConfig::from_toml_str("not = [toml"),
            Err(ValidationError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("arbiter.toml");
        std::fs::write(&path, "[batch]\nseed = 99\n").unwrap();
        assert_eq!(ArbiterConfig::from_path(&path).unwrap().batch.seed, 99);
        assert!(ArbiterConfig::from_path(dir.path().join("absent.toml")).is_err());
    }

    #[test]
    fn test_toml_roundtrip() {
        let cfg = ArbiterConfig::default();
        let serialized = toml::to_string(&cfg).expect("serialize");
        let deserialized = ArbiterConfig::from_toml_str(&serialized).expect("deserialize");
        assert_eq!(deserialized, cfg);
    }

    #[test]
    fn test_run_batch_uses_configured_policies() {
        let mut cfg = ArbiterConfig::default();
        cfg.batch.cycles = 300;
        let report = cfg.run_batch().unwrap();
        assert_eq!(report.online_policy, "baseline");
        assert_eq!(report.requested_cycles, 300);
        let names: Vec<&str> = report.replays.iter().map(|r| r.policy.as_str()).collect();
        assert_eq!(names, ["baseline", "confidence_only", "priority_only", "random"]);

        let random = report.replay("random").unwrap();
        assert_eq!(random.total(), 300);
        assert!(random.iter().filter(|(_, count)| *count > 0).count() > 1);
    }

    #[test]
    fn test_run_batch_with_custom_online_policy() {
        let cfg = ArbiterConfig::from_toml_str(
            r#"
            replay_policies = [{ type = "priority_only" }]

            [batch]
            cycles = 12
            workers = 2

            [online_policy]
            type = "confidence_only"
            "#,
        )
        .unwrap();
        let report = cfg.run_batch().unwrap();
        assert_eq!(report.online_policy, "confidence_only");
        assert_eq!(report.online.total(), 12);
        assert_eq!(report.replays.len(), 1);
        assert_eq!(report.replays[0].policy, "priority_only");
    }

    #[test]
    fn test_reschedule_engine() {
        let engine = ArbiterConfig::default().reschedule_engine().unwrap();
        assert_eq!(engine.provider_ids().count(), 3);
    }
}
