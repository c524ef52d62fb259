//! Offline replay: re-decide frozen steps under another arbitrator.
//!
//! Replay reads only what the step recorded. It never calls a provider,
//! never recomputes a score and never touches a world state.

use crate::arbitration::Arbitrator;
use crate::error::{ArbiterError, ArbiterResult};
use crate::intent::Intent;

use super::{Episode, EpisodeStep};

/// Intent `arbitrator` picks for a frozen step.
///
/// # Errors
///
/// Propagates `NoValidCandidate` from the arbitrator.
pub fn replay_step(step: &EpisodeStep, arbitrator: &dyn Arbitrator) -> ArbiterResult<Intent> {
    let candidates = step.candidates();
    let chosen = arbitrator.choose(&candidates)?;
    Ok(chosen.proposal.intent.clone())
}

/// Replays every step in order. Stops at the first failing step.
///
/// # Errors
///
/// Propagates the first arbitration error.
pub fn replay_episode(episode: &Episode, arbitrator: &dyn Arbitrator) -> ArbiterResult<Vec<Intent>> {
    episode.iter().map(|step| replay_step(step, arbitrator)).collect()
}

/// One row of an A/B comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbRow {
    /// What the online cycle chose.
    pub original: Intent,
    /// `None` when the arbitrator found no valid candidate.
    pub a: Option<Intent>,
    pub b: Option<Intent>,
}

impl AbRow {
    /// True when both arbitrators picked the same intent.
    #[must_use]
    pub fn agree(&self) -> bool {
        self.a == self.b
    }
}

/// Replays every step under both `a` and `b`.
///
/// A step where an arbitrator finds no valid candidate yields `None` for that
/// side instead of aborting the comparison.
///
/// # Errors
///
/// Any arbitration error other than `NoValidCandidate`.
pub fn compare(episode: &Episode, a: &dyn Arbitrator, b: &dyn Arbitrator) -> ArbiterResult<Vec<AbRow>> {
    let side = |step: &EpisodeStep, arbitrator: &dyn Arbitrator| match replay_step(step, arbitrator) {
        Ok(intent) => Ok(Some(intent)),
        Err(ArbiterError::NoValidCandidate { .. }) => Ok(None),
        Err(e) => Err(e),
    };

    episode
        .iter()
        .map(|step| -> ArbiterResult<AbRow> {
            Ok(AbRow {
                original: step.chosen_intent().clone(),
                a: side(step, a)?,
                b: side(step, b)?,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arbitration::ArbitrationPolicy;
    use crate::episode::fixtures::{record, step};
    use crate::provider::ProviderId;

    #[test]
    fn baseline_and_confidence_disagree_on_scenario_b() {
        let s = step();
        assert_eq!(
            replay_step(&s, &ArbitrationPolicy::Baseline).unwrap(),
            Intent::AskForConfirmation
        );
        assert_eq!(
            replay_step(&s, &ArbitrationPolicy::ConfidenceOnly).unwrap(),
            Intent::SendRescheduleEmail
        );
        assert_eq!(
            replay_step(&s, &ArbitrationPolicy::PriorityOnly).unwrap(),
            Intent::AskForConfirmation
        );
    }

    #[test]
    fn replay_is_repeatable() {
        let e = Episode::from(vec![step(), step()]);
        for policy in [
            ArbitrationPolicy::Baseline,
            ArbitrationPolicy::ConfidenceOnly,
            ArbitrationPolicy::random_seeded(11),
        ] {
            let first = replay_episode(&e, &policy).unwrap();
            let second = replay_episode(&e, &policy).unwrap();
            assert_eq!(first, second);
        }
    }

    #[test]
    fn replay_does_not_mutate_step() {
        let s = step();
        let before = s.clone();
        let _ = replay_step(&s, &ArbitrationPolicy::ConfidenceOnly).unwrap();
        assert_eq!(s, before);
    }

    #[test]
    fn compare_reports_all_three() {
        let e = Episode::from(vec![step()]);
        let rows = compare(&e, &ArbitrationPolicy::Baseline, &ArbitrationPolicy::ConfidenceOnly).unwrap();
        assert_eq!(
            rows,
            vec![AbRow {
                original: Intent::AskForConfirmation,
                a: Some(Intent::AskForConfirmation),
                b: Some(Intent::SendRescheduleEmail),
            }]
        );
        assert!(!rows[0].agree());
    }

    #[test]
    fn compare_marks_no_candidate_as_none() {
        // only the violating email proposal survives
        let mut r = record();
        for id in ["abort", "rule"] {
            r.proposals.remove(&ProviderId::from(id));
            r.scores.remove(&ProviderId::from(id));
        }
        r.chosen_intent = crate::intent::Intent::SendRescheduleEmail;
        r.chosen_provider = None;
        r.decision = None;
        let e = Episode::from(vec![EpisodeStep::try_from(r).unwrap()]);

        let rows = compare(&e, &ArbitrationPolicy::Baseline, &ArbitrationPolicy::ConfidenceOnly).unwrap();
        assert_eq!(rows[0].a, None);
        assert_eq!(rows[0].b, Some(Intent::SendRescheduleEmail));

        let err = replay_episode(&e, &ArbitrationPolicy::Baseline).unwrap_err();
        assert!(err.is_no_valid_candidate());
    }
}
