//! Batch harness: many independent online cycles, then offline replays.
//!
//! Online cycles run on a bounded worker pool. Every cycle gets its own
//! generator seeded from `(seed, cycle index)`, so a corpus is identical for
//! any worker count. Replays only read the frozen corpus and run one scoped
//! thread per arbitrator.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::arbitration::Arbitrator;
use crate::engine::DecisionEngine;
use crate::episode::{replay_step, Episode, EpisodeStep};
use crate::error::{ArbiterError, ArbiterResult};
use crate::intent::Intent;
use crate::state::Bootstrap;

/// Batch sizing and seeding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Number of online cycles.
    pub cycles: usize,
    /// Worker threads.
    pub workers: usize,
    /// Root seed for per-cycle generators.
    pub seed: u64,
    /// Maximum queued cycles.
    pub queue_capacity: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            cycles: 1000,
            workers: 4,
            seed: 0,
            queue_capacity: 1024,
        }
    }
}

/// Seed of the generator used by cycle `cycle` under root `seed`.
#[must_use]
pub fn cycle_seed(seed: u64, cycle: usize) -> u64 {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&seed.to_le_bytes());
    hasher.update(&(cycle as u64).to_le_bytes());
    let hash = hasher.finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&hash.as_bytes()[..8]);
    u64::from_le_bytes(bytes)
}

/// Stops a batch before its next cycle. A running cycle always completes.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Chosen-intent frequencies for one arbitrator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntentDistribution {
    counts: BTreeMap<Intent, usize>,
    failed: usize,
}

impl IntentDistribution {
    pub fn record(&mut self, intent: &Intent) {
        *self.counts.entry(intent.clone()).or_insert(0) += 1;
    }

    pub fn record_failure(&mut self) {
        self.failed += 1;
    }

    #[must_use]
    pub fn count(&self, intent: &Intent) -> usize {
        self.counts.get(intent).copied().unwrap_or(0)
    }

    /// Steps or cycles that produced no intent.
    #[must_use]
    pub const fn failed(&self) -> usize {
        self.failed
    }

    /// Steps or cycles that produced an intent.
    #[must_use]
    pub fn decided(&self) -> usize {
        self.counts.values().sum()
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.decided() + self.failed
    }

    /// Fraction of all recorded outcomes that chose `intent`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn share(&self, intent: &Intent) -> f64 {
        match self.total() {
            0 => 0.0,
            total => self.count(intent) as f64 / total as f64,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Intent, usize)> {
        self.counts.iter().map(|(k, v)| (k, *v))
    }
}

/// A replay distribution labelled with its arbitrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyDistribution {
    pub policy: String,
    pub distribution: IntentDistribution,
}

/// A cycle that produced no step.
#[derive(Debug)]
pub struct CycleFailure {
    pub cycle: usize,
    pub error: ArbiterError,
}

/// Output of the online phase.
#[derive(Debug, Default)]
pub struct Corpus {
    policy: String,
    episodes: Vec<Episode>,
    failures: Vec<CycleFailure>,
    cancelled: bool,
}

impl Corpus {
    /// Wraps already recorded episodes, e.g. loaded from disk.
    #[must_use]
    pub fn new(policy: impl Into<String>, episodes: Vec<Episode>) -> Self {
        Self {
            policy: policy.into(),
            episodes,
            ..Self::default()
        }
    }

    /// Arbitrator that produced the corpus online.
    #[must_use]
    pub fn policy(&self) -> &str {
        &self.policy
    }

    /// Episodes in cycle order.
    #[must_use]
    pub fn episodes(&self) -> &[Episode] {
        &self.episodes
    }

    #[must_use]
    pub fn failures(&self) -> &[CycleFailure] {
        &self.failures
    }

    #[must_use]
    pub const fn cancelled(&self) -> bool {
        self.cancelled
    }

    pub fn steps(&self) -> impl Iterator<Item = &EpisodeStep> {
        self.episodes.iter().flat_map(Episode::iter)
    }

    /// Online chosen-intent distribution; failed cycles count as failures.
    #[must_use]
    pub fn distribution(&self) -> IntentDistribution {
        let mut d = IntentDistribution::default();
        for step in self.steps() {
            d.record(step.chosen_intent());
        }
        for _ in &self.failures {
            d.record_failure();
        }
        d
    }
}

/// Replays every step of `corpus` under `arbitrator`.
///
/// # Errors
///
/// Arbitration errors other than `NoValidCandidate`, which is counted.
pub fn replay_distribution(corpus: &Corpus, arbitrator: &dyn Arbitrator) -> ArbiterResult<IntentDistribution> {
    let mut d = IntentDistribution::default();
    for step in corpus.steps() {
        match replay_step(step, arbitrator) {
            Ok(intent) => d.record(&intent),
            Err(ArbiterError::NoValidCandidate { .. }) => d.record_failure(),
            Err(e) => return Err(e),
        }
    }
    Ok(d)
}

/// Replays `corpus` under each arbitrator in parallel.
///
/// # Errors
///
/// A replay error, or `Internal` if a replay thread could not be spawned or
/// panicked.
pub fn replay_corpus(corpus: &Corpus, arbitrators: &[&dyn Arbitrator]) -> ArbiterResult<Vec<PolicyDistribution>> {
    thread::scope(|s| -> ArbiterResult<Vec<PolicyDistribution>> {
        let mut handles = Vec::with_capacity(arbitrators.len());
        for arbitrator in arbitrators {
            let arbitrator: &dyn Arbitrator = *arbitrator;
            let handle = thread::Builder::new()
                .name(format!("kyro-arbiter-replay-{}", arbitrator.name()))
                .spawn_scoped(s, move || replay_distribution(corpus, arbitrator))
                .map_err(|e| ArbiterError::internal(format!("failed to spawn replay thread: {e}")))?;
            handles.push((arbitrator.name().to_string(), handle));
        }

        handles
            .into_iter()
            .map(|(policy, handle)| -> ArbiterResult<PolicyDistribution> {
                let distribution = handle
                    .join()
                    .map_err(|_| ArbiterError::internal(format!("replay thread for '{policy}' panicked")))??;
                tracing::info!(
                    policy = %policy,
                    decided = distribution.decided(),
                    failed = distribution.failed(),
                    "replay finished"
                );
                Ok(PolicyDistribution { policy, distribution })
            })
            .collect()
    })
}

/// Online and replay distributions of one batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReport {
    pub online_policy: String,
    pub requested_cycles: usize,
    /// Cycles that failed before producing a step.
    pub aborted_cycles: usize,
    pub cancelled: bool,
    pub online: IntentDistribution,
    pub replays: Vec<PolicyDistribution>,
}

impl BatchReport {
    #[must_use]
    pub fn replay(&self, policy: &str) -> Option<&IntentDistribution> {
        self.replays
            .iter()
            .find(|r| r.policy == policy)
            .map(|r| &r.distribution)
    }
}

fn write_distribution(f: &mut fmt::Formatter<'_>, d: &IntentDistribution) -> fmt::Result {
    for (intent, count) in d.iter() {
        writeln!(f, "  {intent}: {count} ({:.1}%)", d.share(intent) * 100.0)?;
    }
    Ok(())
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "online [{}]: {} of {} cycles decided, {} aborted{}",
            self.online_policy,
            self.online.decided(),
            self.requested_cycles,
            self.aborted_cycles,
            if self.cancelled { " (cancelled)" } else { "" }
        )?;
        write_distribution(f, &self.online)?;
        for replay in &self.replays {
            writeln!(f, "replay [{}]:", replay.policy)?;
            write_distribution(f, &replay.distribution)?;
            if replay.distribution.failed() > 0 {
                writeln!(f, "  no valid candidate: {}", replay.distribution.failed())?;
            }
        }
        Ok(())
    }
}

/// Runs the online phase on a worker pool and replays the result.
pub struct BatchHarness {
    engine: Arc<DecisionEngine>,
    bootstrap: Arc<dyn Bootstrap>,
    config: BatchConfig,
    cancel: CancelToken,
}

impl BatchHarness {
    #[must_use]
    pub fn new(engine: DecisionEngine, bootstrap: impl Bootstrap + 'static, config: BatchConfig) -> Self {
        Self {
            engine: Arc::new(engine),
            bootstrap: Arc::new(bootstrap),
            config,
            cancel: CancelToken::new(),
        }
    }

    #[must_use]
    pub const fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Token that stops this harness before its next cycle.
    #[must_use]
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Runs `config.cycles` independent cycles from fresh bootstrapped
    /// states under `arbitrator`.
    ///
    /// Failed cycles are recorded in the corpus, not returned as errors.
    ///
    /// # Errors
    ///
    /// `Internal` if a worker could not be spawned or panicked.
    pub fn run_online(&self, arbitrator: Arc<dyn Arbitrator>) -> ArbiterResult<Corpus> {
        let workers = self.config.workers.max(1);
        let cycles = self.config.cycles;
        let policy = arbitrator.name().to_string();

        tracing::info!(policy = %policy, cycles, workers, seed = self.config.seed, "batch started");

        let (job_tx, job_rx) = bounded::<usize>(self.config.queue_capacity.max(1));
        let (result_tx, result_rx) = unbounded::<(usize, ArbiterResult<EpisodeStep>)>();

        let mut handles = Vec::with_capacity(workers);
        for idx in 0..workers {
            let rx: Receiver<usize> = job_rx.clone();
            let tx: Sender<(usize, ArbiterResult<EpisodeStep>)> = result_tx.clone();
            let engine = Arc::clone(&self.engine);
            let bootstrap = Arc::clone(&self.bootstrap);
            let arbitrator = Arc::clone(&arbitrator);
            let cancel = self.cancel.clone();
            let seed = self.config.seed;

            let handle = thread::Builder::new()
                .name(format!("kyro-arbiter-cycle-{idx}"))
                .spawn(move || {
                    for cycle in rx {
                        if cancel.is_cancelled() {
                            break;
                        }
                        let mut rng = StdRng::seed_from_u64(cycle_seed(seed, cycle));
                        let result = engine
                            .run_once(bootstrap.as_ref(), arbitrator.as_ref(), &mut rng)
                            .map(|outcome| outcome.step);
                        if tx.send((cycle, result)).is_err() {
                            break;
                        }
                    }
                })
                .map_err(|e| ArbiterError::internal(format!("failed to spawn batch worker: {e}")))?;
            handles.push(handle);
        }
        drop(job_rx);
        drop(result_tx);

        for cycle in 0..cycles {
            if self.cancel.is_cancelled() || job_tx.send(cycle).is_err() {
                break;
            }
        }
        drop(job_tx);

        for handle in handles {
            handle
                .join()
                .map_err(|_| ArbiterError::internal("batch worker panicked"))?;
        }

        let mut results: Vec<(usize, ArbiterResult<EpisodeStep>)> = result_rx.iter().collect();
        results.sort_by_key(|(cycle, _)| *cycle);

        let mut corpus = Corpus {
            policy,
            cancelled: self.cancel.is_cancelled(),
            ..Corpus::default()
        };
        for (cycle, result) in results {
            match result {
                Ok(step) => corpus.episodes.push(Episode::from(vec![step])),
                Err(error) => {
                    tracing::warn!(cycle, error = %error, "cycle aborted");
                    corpus.failures.push(CycleFailure { cycle, error });
                }
            }
        }

        tracing::info!(
            policy = %corpus.policy,
            recorded = corpus.episodes.len(),
            aborted = corpus.failures.len(),
            cancelled = corpus.cancelled,
            "batch finished"
        );
        Ok(corpus)
    }

    /// Online phase under `online`, then a replay of the corpus under each
    /// of `replays`.
    ///
    /// # Errors
    ///
    /// See [`BatchHarness::run_online`] and [`replay_corpus`].
    pub fn run(&self, online: Arc<dyn Arbitrator>, replays: &[&dyn Arbitrator]) -> ArbiterResult<BatchReport> {
        let corpus = self.run_online(online)?;
        let replays = replay_corpus(&corpus, replays)?;
        Ok(BatchReport {
            online_policy: corpus.policy().to_string(),
            requested_cycles: self.config.cycles,
            aborted_cycles: corpus.failures().len(),
            cancelled: corpus.cancelled(),
            online: corpus.distribution(),
            replays,
        })
    }
}

impl fmt::Debug for BatchHarness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchHarness")
            .field("engine", &self.engine)
            .field("config", &self.config)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}
