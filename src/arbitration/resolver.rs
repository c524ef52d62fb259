use std::cmp::Ordering;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{ArbiterError, ArbiterResult};

use super::Candidate;

/// Baseline ordering: violations ascending, then priority descending, then
/// confidence descending.
fn baseline_order(a: &Candidate<'_>, b: &Candidate<'_>) -> Ordering {
    a.score
        .constraint_violation
        .cmp(&b.score.constraint_violation)
        .then_with(|| b.score.provider_priority.cmp(&a.score.provider_priority))
        .then_with(|| b.score.confidence.total_cmp(&a.score.confidence))
}

/// Baseline policy.
///
/// Keeps only candidates with a valid intent and zero violations, fails with
/// `NoValidCandidate` if none remain, otherwise returns the first candidate
/// under [`baseline_order`]. The sort is stable, so full ties resolve to the
/// earliest candidate.
pub fn choose_baseline<'a>(candidates: &[Candidate<'a>]) -> ArbiterResult<Candidate<'a>> {
    let mut eligible: Vec<Candidate<'a>> = candidates
        .iter()
        .copied()
        .filter(|c| c.score.is_clean())
        .collect();

    eligible.sort_by(baseline_order);

    eligible
        .first()
        .copied()
        .ok_or_else(|| ArbiterError::no_valid_candidate("baseline", candidates.len()))
}

/// Highest confidence wins; the earliest candidate wins a tie.
pub fn choose_by_confidence<'a>(candidates: &[Candidate<'a>]) -> ArbiterResult<Candidate<'a>> {
    let mut best: Option<Candidate<'a>> = None;
    for c in candidates {
        match best {
            Some(b) if c.score.confidence.total_cmp(&b.score.confidence) != Ordering::Greater => {}
            _ => best = Some(*c),
        }
    }
    best.ok_or_else(|| ArbiterError::no_valid_candidate("confidence_only", 0))
}

/// Highest provider priority wins; the earliest candidate wins a tie.
pub fn choose_by_priority<'a>(candidates: &[Candidate<'a>]) -> ArbiterResult<Candidate<'a>> {
    let mut best: Option<Candidate<'a>> = None;
    for c in candidates {
        match best {
            Some(b) if c.score.provider_priority <= b.score.provider_priority => {}
            _ => best = Some(*c),
        }
    }
    best.ok_or_else(|| ArbiterError::no_valid_candidate("priority_only", 0))
}

/// Generator seed for one seeded random pick: blake3 over the policy seed
/// and every candidate's provider, intent and confidence bits.
fn candidate_seed(seed: u64, candidates: &[Candidate<'_>]) -> u64 {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&seed.to_le_bytes());
    for c in candidates {
        hasher.update(c.provider.as_str().as_bytes());
        hasher.update(&[0]);
        hasher.update(c.proposal.intent.as_str().as_bytes());
        hasher.update(&[0]);
        hasher.update(&c.proposal.confidence.value().to_bits().to_le_bytes());
    }
    let hash = hasher.finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&hash.as_bytes()[..8]);
    u64::from_le_bytes(bytes)
}

/// Uniform pick over all candidates.
///
/// With `Some(seed)` the generator is seeded from the seed and the candidate
/// set, so the same step always yields the same pick while different steps
/// spread across the set.
pub fn choose_random<'a>(
    candidates: &[Candidate<'a>],
    seed: Option<u64>,
) -> ArbiterResult<Candidate<'a>> {
    if candidates.is_empty() {
        return Err(ArbiterError::no_valid_candidate("random", 0));
    }
    let idx = match seed {
        Some(seed) => StdRng::seed_from_u64(candidate_seed(seed, candidates)).gen_range(0..candidates.len()),
        None => rand::thread_rng().gen_range(0..candidates.len()),
    };
    Ok(candidates[idx])
}
