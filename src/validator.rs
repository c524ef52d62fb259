//! Validation gate between arbitration and the runtime.
//!
//! The validator turns one chosen proposal into an authoritative
//! [`Decision`] or refuses it. It never coerces: a missing field, a wrong
//! shape, an unmet precondition or a low confidence is an error.

use std::collections::BTreeMap;

use crate::constraint::ConstraintTable;
use crate::error::ValidationError;
use crate::input::DecisionInput;
use crate::intent::Intent;
use crate::proposal::{Decision, DecisionProposal};
use crate::state::{AgentStatus, WorldState};
use crate::value::Value;

/// Expected shape of a payload field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    Bool,
    Int,
    /// Int or float.
    Number,
    List,
    Map,
}

impl FieldKind {
    fn accepts(self, value: &Value) -> bool {
        matches!(
            (self, value),
            (Self::String, Value::String(_))
                | (Self::Bool, Value::Bool(_))
                | (Self::Int, Value::Int(_))
                | (Self::Number, Value::Int(_) | Value::Float(_))
                | (Self::List, Value::List(_))
                | (Self::Map, Value::Map(_))
        )
    }

    fn name(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Number => "number",
            Self::List => "list",
            Self::Map => "map",
        }
    }
}

/// Per-intent requirements.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntentRules {
    /// Payload fields that must be present with the given shape.
    pub required_fields: Vec<(String, FieldKind)>,
    /// Statuses the state must be in. `None` means any non-terminal status.
    pub allowed_statuses: Option<Vec<AgentStatus>>,
    /// Permission the state must grant.
    pub required_permission: Option<String>,
}

impl IntentRules {
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.required_fields.push((name.into(), kind));
        self
    }

    #[must_use]
    pub fn when(mut self, status: AgentStatus) -> Self {
        self.allowed_statuses.get_or_insert_with(Vec::new).push(status);
        self
    }

    #[must_use]
    pub fn permission(mut self, permission: impl Into<String>) -> Self {
        self.required_permission = Some(permission.into());
        self
    }
}

/// Converts a chosen proposal into an authoritative decision.
#[derive(Debug, Clone)]
pub struct Validator {
    confidence_floor: f64,
    rules: BTreeMap<Intent, IntentRules>,
    constraints: ConstraintTable,
}

impl Validator {
    /// Default confidence floor.
    pub const DEFAULT_FLOOR: f64 = 0.6;

    /// Creates a validator with the default per-intent rules.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidConfig` if `confidence_floor` is not
    /// in [0.0, 1.0].
    pub fn new(confidence_floor: f64, constraints: ConstraintTable) -> Result<Self, ValidationError> {
        if confidence_floor.is_nan() || !(0.0..=1.0).contains(&confidence_floor) {
            return Err(ValidationError::InvalidConfig {
                reason: format!("confidence floor {confidence_floor} is out of range [0.0, 1.0]"),
            });
        }
        Ok(Self {
            confidence_floor,
            rules: Self::default_rules(),
            constraints,
        })
    }

    /// Rules for the reschedule scenario.
    #[must_use]
    pub fn default_rules() -> BTreeMap<Intent, IntentRules> {
        BTreeMap::from([
            (
                Intent::AskForConfirmation,
                IntentRules::default()
                    .field("message", FieldKind::String)
                    .when(AgentStatus::AwaitingUserConfirmation),
            ),
            (
                Intent::SendRescheduleEmail,
                IntentRules::default()
                    .field("message", FieldKind::String)
                    .when(AgentStatus::AwaitingUserConfirmation)
                    .permission("send_email"),
            ),
            (
                Intent::Abort,
                IntentRules::default().field("reason", FieldKind::String),
            ),
        ])
    }

    /// Replaces the rules for one intent.
    #[must_use]
    pub fn with_rules(mut self, intent: Intent, rules: IntentRules) -> Self {
        self.rules.insert(intent, rules);
        self
    }

    #[must_use]
    pub const fn confidence_floor(&self) -> f64 {
        self.confidence_floor
    }

    /// Validates `proposal` against the current state and input.
    ///
    /// Checks, in order: the intent is permitted, no active constraint is
    /// violated, required payload fields are present and well-shaped, state
    /// preconditions hold, and the confidence reaches the floor.
    ///
    /// # Errors
    ///
    /// Returns the first `ValidationError` encountered.
    pub fn validate(
        &self,
        state: &WorldState,
        proposal: &DecisionProposal,
        input: &DecisionInput,
    ) -> Result<Decision, ValidationError> {
        let intent = &proposal.intent;

        if !input.permits(intent) {
            return Err(ValidationError::InvalidProposal {
                intent: intent.clone(),
            });
        }

        if let Some(constraint) = self.constraints.violations(intent, &input.constraints).next() {
            return Err(ValidationError::ConstraintViolation {
                intent: intent.clone(),
                constraint: constraint.to_string(),
            });
        }

        let rules = self.rules.get(intent);

        if let Some(rules) = rules {
            for (field, kind) in &rules.required_fields {
                let value = proposal.args.get(field).ok_or_else(|| ValidationError::MissingField {
                    intent: intent.clone(),
                    field: field.clone(),
                })?;
                if !kind.accepts(value) {
                    return Err(ValidationError::WrongFieldType {
                        field: field.clone(),
                        expected: kind.name(),
                        actual: value.type_name(),
                    });
                }
            }
        }

        self.check_preconditions(state, intent, rules)?;

        if proposal.confidence.value() < self.confidence_floor {
            return Err(ValidationError::LowConfidence {
                confidence: proposal.confidence.value(),
                floor: self.confidence_floor,
            });
        }

        Ok(Decision {
            intent: intent.clone(),
            payload: proposal.args.clone(),
        })
    }

    fn check_preconditions(
        &self,
        state: &WorldState,
        intent: &Intent,
        rules: Option<&IntentRules>,
    ) -> Result<(), ValidationError> {
        let failed = |required: String| ValidationError::PreconditionFailed {
            intent: intent.clone(),
            required,
            actual: state.status.to_string(),
        };

        if state.status.is_terminal() {
            return Err(failed("a non-terminal status".to_string()));
        }

        let Some(rules) = rules else {
            return Ok(());
        };

        if let Some(allowed) = &rules.allowed_statuses {
            if !allowed.contains(&state.status) {
                let names: Vec<&str> = allowed.iter().map(AgentStatus::as_str).collect();
                return Err(failed(format!("one of [{}]", names.join(", "))));
            }
        }

        if let Some(permission) = &rules.required_permission {
            if !state.permissions.contains(permission) {
                return Err(failed(format!("permission '{permission}'")));
            }
        }

        Ok(())
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self {
            confidence_floor: Self::DEFAULT_FLOOR,
            rules: Self::default_rules(),
            constraints: ConstraintTable::default(),
        }
    }
}
