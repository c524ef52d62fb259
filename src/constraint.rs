//! Constraint rule table.
//!
//! A rule pairs a regex over constraint text with an intent. A proposal
//! violates an active constraint when some rule matches both. The scorer
//! counts violations; the validator rejects on the first one. Both read the
//! same table so they never disagree.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::intent::Intent;

/// Serializable form of a rule, as it appears in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintRuleSpec {
    /// Regex matched against each active constraint.
    pub pattern: String,
    /// Intent the rule forbids while the constraint is active.
    pub intent: Intent,
}

impl ConstraintRuleSpec {
    pub fn new(pattern: impl Into<String>, intent: Intent) -> Self {
        Self {
            pattern: pattern.into(),
            intent,
        }
    }
}

#[derive(Debug, Clone)]
struct ConstraintRule {
    pattern: regex::Regex,
    intent: Intent,
}

/// Compiled rule table.
#[derive(Debug, Clone)]
pub struct ConstraintTable {
    rules: Vec<ConstraintRule>,
}

impl ConstraintTable {
    /// Compiles a rule table.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidConstraintRule` if a pattern does not
    /// compile.
    pub fn new(specs: &[ConstraintRuleSpec]) -> Result<Self, ValidationError> {
        let mut rules = Vec::with_capacity(specs.len());
        for spec in specs {
            let pattern = regex::Regex::new(&spec.pattern).map_err(|e| {
                ValidationError::InvalidConstraintRule {
                    reason: format!("invalid regex '{}': {e}", spec.pattern),
                }
            })?;
            rules.push(ConstraintRule {
                pattern,
                intent: spec.intent.clone(),
            });
        }
        Ok(Self { rules })
    }

    /// Rules shipped with the reschedule scenario.
    #[must_use]
    pub fn default_specs() -> Vec<ConstraintRuleSpec> {
        vec![ConstraintRuleSpec::new(
            format!("(?i){}", regex::escape("Do not send email")),
            Intent::SendRescheduleEmail,
        )]
    }

    /// Every active constraint that `intent` violates, once per matched
    /// (constraint, rule) pair.
    pub fn violations<'a>(
        &'a self,
        intent: &'a Intent,
        constraints: &'a [String],
    ) -> impl Iterator<Item = &'a str> + 'a {
        constraints.iter().flat_map(move |constraint| {
            self.rules
                .iter()
                .filter(move |rule| rule.intent == *intent && rule.pattern.is_match(constraint))
                .map(move |_| constraint.as_str())
        })
    }

    /// Number of rules in the table.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Default for ConstraintTable {
    fn default() -> Self {
        let rules = Self::default_specs()
            .into_iter()
            .filter_map(|spec| {
                regex::Regex::new(&spec.pattern)
                    .ok()
                    .map(|pattern| ConstraintRule {
                        pattern,
                        intent: spec.intent,
                    })
            })
            .collect();
        Self { rules }
    }
}
