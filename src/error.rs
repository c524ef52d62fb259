//! Error types for kyro-arbiter.
//!
//! All errors are strongly typed using thiserror so callers can match on the
//! exact reason a decision cycle or an episode load was refused.

use thiserror::Error;

use crate::intent::Intent;

/// Validation errors raised while turning a proposal into a decision, or while
/// checking configuration.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("Intent '{intent}' is not permitted by the current decision input")]
    InvalidProposal {
        intent: Intent,
    },

    #[error("Intent '{intent}' violates active constraint '{constraint}'")]
    ConstraintViolation {
        intent: Intent,
        constraint: String,
    },

    #[error("Confidence {confidence} is below the validator floor {floor}")]
    LowConfidence {
        confidence: f64,
        floor: f64,
    },

    #[error("Confidence value {value} is out of range [0.0, 1.0]")]
    ConfidenceOutOfRange {
        value: f64,
    },

    #[error("Required payload field '{field}' is missing for intent '{intent}'")]
    MissingField {
        intent: Intent,
        field: String,
    },

    #[error("Payload field '{field}' must be {expected}, got {actual}")]
    WrongFieldType {
        field: String,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("Intent '{intent}' requires status {required}, state is '{actual}'")]
    PreconditionFailed {
        intent: Intent,
        required: String,
        actual: String,
    },

    #[error("Invalid constraint rule: {reason}")]
    InvalidConstraintRule {
        reason: String,
    },

    #[error("Invalid configuration: {reason}")]
    InvalidConfig {
        reason: String,
    },
}

/// Errors raised while persisting or loading episodes.
#[derive(Debug, Error)]
pub enum EpisodeError {
    #[error("Schema mismatch in step {step}: {reason}")]
    SchemaMismatch {
        step: usize,
        reason: String,
    },

    #[error("Serialization error: {message}")]
    Serialization {
        message: String,
    },

    #[error("I/O error on {path}: {message}")]
    Io {
        path: String,
        message: String,
    },

    #[error("Episode store {path} is locked by another process")]
    Locked {
        path: String,
    },
}

impl EpisodeError {
    pub(crate) fn schema(step: usize, reason: impl Into<String>) -> Self {
        Self::SchemaMismatch {
            step,
            reason: reason.into(),
        }
    }
}

/// Top-level error type for kyro-arbiter.
#[derive(Debug, Error)]
pub enum ArbiterError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Episode error: {0}")]
    Episode(#[from] EpisodeError),

    #[error("No valid candidate for policy '{policy}' among {candidates} candidate(s)")]
    NoValidCandidate {
        policy: String,
        candidates: usize,
    },

    #[error("Duplicate provider identity: {id}")]
    DuplicateProvider {
        id: String,
    },

    #[error("Decision engine has no providers")]
    NoProviders,

    #[error("Internal error: {message}")]
    Internal {
        message: String,
    },
}

impl ArbiterError {
    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Creates a `NoValidCandidate` error for the named policy.
    #[must_use]
    pub fn no_valid_candidate(policy: impl Into<String>, candidates: usize) -> Self {
        Self::NoValidCandidate {
            policy: policy.into(),
            candidates,
        }
    }

    /// Returns true if this is a validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if arbitration found nothing to choose.
    #[must_use]
    pub const fn is_no_valid_candidate(&self) -> bool {
        matches!(self, Self::NoValidCandidate { .. })
    }

    /// Returns true if a persisted episode was structurally inconsistent.
    #[must_use]
    pub const fn is_schema_mismatch(&self) -> bool {
        matches!(self, Self::Episode(EpisodeError::SchemaMismatch { .. }))
    }

    /// Returns true if a document could not be encoded or parsed at all.
    #[must_use]
    pub const fn is_serialization(&self) -> bool {
        matches!(self, Self::Episode(EpisodeError::Serialization { .. }))
    }

    /// Returns true if this is an internal error.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Internal { .. })
    }
}

/// Result type alias for kyro-arbiter operations.
pub type ArbiterResult<T> = Result<T, ArbiterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_low_confidence_message() {
        let err = ValidationError::LowConfidence {
            confidence: 0.4,
            floor: 0.6,
        };
        let msg = format!("{err}");
        assert!(msg.contains("0.4"));
        assert!(msg.contains("0.6"));
    }

    #[test]
    fn test_invalid_proposal_names_intent() {
        let err = ValidationError::InvalidProposal {
            intent: Intent::SendRescheduleEmail,
        };
        assert!(format!("{err}").contains("SendRescheduleEmail"));
    }

    #[test]
    fn test_schema_mismatch_names_step() {
        let err = EpisodeError::schema(3, "proposals and scores key sets differ");
        let msg = format!("{err}");
        assert!(msg.contains("step 3"));
        assert!(msg.contains("key sets differ"));
    }

    #[test]
    fn test_arbiter_error_from_validation() {
        let err: ArbiterError = ValidationError::ConfidenceOutOfRange { value: 1.5 }.into();
        assert!(err.is_validation());
        assert!(!err.is_no_valid_candidate());
    }

    #[test]
    fn test_arbiter_error_from_episode() {
        let err: ArbiterError = EpisodeError::schema(0, "missing field").into();
        assert!(err.is_schema_mismatch());
        assert!(!err.is_serialization());

        let err: ArbiterError = EpisodeError::Serialization {
            message: "eof".to_string(),
        }
        .into();
        assert!(err.is_serialization());
    }

    #[test]
    fn test_no_valid_candidate() {
        let err = ArbiterError::no_valid_candidate("baseline", 3);
        assert!(err.is_no_valid_candidate());
        let msg = format!("{err}");
        assert!(msg.contains("baseline"));
        assert!(msg.contains('3'));
    }

    #[test]
    fn test_internal() {
        let err = ArbiterError::internal("worker panicked");
        assert!(err.is_internal());
        assert!(format!("{err}").contains("worker panicked"));
    }
}
