use crate::{
    CallSequence, Counterexample, CoverageMap, OperationCatalog, SequenceExecutor,
    SequenceGenerator, SequencePolicy, ShrinkOutcome, Shrinker, TrialOutcome, Violation,
};
use alloy_primitives::U256;
use chainprop_config::FuzzConfig;
use chainprop_node::TestNode;
use eyre::Result;
use proptest::{
    prelude::Rng,
    test_runner::{RngAlgorithm, TestRng, TestRunner},
};
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

/// Shared flag asking a running campaign to stop at the next trial or shrink step.
#[derive(Clone, Debug, Default)]
pub struct EarlyExit {
    inner: Arc<AtomicBool>,
}

impl EarlyExit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn should_stop(&self) -> bool {
        self.inner.load(Ordering::Relaxed)
    }

    pub fn stop(&self) {
        self.inner.store(true, Ordering::Relaxed);
    }
}

/// Counters collected while a campaign runs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CampaignStats {
    pub trials: u64,
    /// Calls and invariant checks skipped because of transient node errors.
    pub transient_skips: u64,
    /// Distinct program points observed with coverage guidance.
    pub program_points: usize,
    pub shrink_executions: u64,
}

/// How a campaign ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CampaignOutcome {
    /// Every trial ran without breaking an invariant.
    Passed,
    Violated(Counterexample),
    /// Stopped through [`EarlyExit`] before the trial budget was spent.
    Interrupted,
}

/// A fuzzing campaign over a fixed catalog of operations and invariants.
pub struct Campaign<'a, N: ?Sized> {
    executor: SequenceExecutor<'a, N>,
    generator: SequenceGenerator<'a>,
    runner: TestRunner,
    coverage: CoverageMap,
    config: FuzzConfig,
    early_exit: EarlyExit,
    stats: CampaignStats,
}

impl<'a, N: TestNode + ?Sized> Campaign<'a, N> {
    /// Creates a campaign over the state the node is currently in.
    pub fn new(node: &'a N, catalog: &'a OperationCatalog, config: &FuzzConfig) -> Self {
        Self {
            executor: SequenceExecutor::new(node, catalog, config.coverage_guidance),
            generator: SequenceGenerator::new(catalog, SequencePolicy::from(config)),
            runner: fuzzer(config.seed),
            coverage: CoverageMap::new(),
            config: config.clone(),
            early_exit: EarlyExit::new(),
            stats: CampaignStats::default(),
        }
    }

    pub fn with_early_exit(mut self, early_exit: EarlyExit) -> Self {
        self.early_exit = early_exit;
        self
    }

    pub fn stats(&self) -> CampaignStats {
        self.stats
    }

    pub fn coverage(&self) -> &CoverageMap {
        &self.coverage
    }

    /// Runs the campaign until an invariant breaks, the trial budget is spent or it is
    /// interrupted.
    pub fn run(&mut self) -> Result<CampaignOutcome> {
        let outcome = self.run_trials();
        self.stats.transient_skips = self.executor.transient_skips();
        self.stats.program_points = self.coverage.len();
        info!(
            target: "chainprop::fuzz",
            trials = self.stats.trials,
            transient_skips = self.stats.transient_skips,
            program_points = self.stats.program_points,
            shrink_executions = self.stats.shrink_executions,
            "campaign finished"
        );
        outcome
    }

    fn run_trials(&mut self) -> Result<CampaignOutcome> {
        if let Some(violation) = self.executor.check_initial()? {
            return self.violated(Vec::new(), violation);
        }
        if self.executor.catalog().is_empty() {
            warn!(target: "chainprop::fuzz", "no operations to fuzz");
            return Ok(CampaignOutcome::Passed);
        }

        // Sequence with the highest targeting score so far.
        let mut best: Option<(u64, CallSequence)> = None;
        for trial in 1..=u64::from(self.config.fuzz_runs) {
            if self.early_exit.should_stop() {
                info!(target: "chainprop::fuzz", trial, "campaign interrupted");
                return Ok(CampaignOutcome::Interrupted);
            }

            let calls = match &best {
                Some((_, base)) if self.runner.rng().random_ratio(1, 2) => {
                    self.generator.mutate(&mut self.runner, base)?
                }
                _ => self.generator.generate(&mut self.runner)?,
            };
            self.stats.trials += 1;

            match self.executor.run(&calls)? {
                TrialOutcome::Passed { coverage } => {
                    if !self.config.coverage_guidance {
                        continue;
                    }
                    let Some(score) = self.coverage.record(trial, &coverage) else { continue };
                    debug!(
                        target: "chainprop::coverage",
                        trial,
                        score,
                        points = self.coverage.len(),
                        "trial scored"
                    );
                    if best.as_ref().is_none_or(|(best, _)| score >= *best) {
                        best = Some((score, calls));
                    }
                }
                TrialOutcome::Violated(violation) => {
                    debug!(
                        target: "chainprop::fuzz",
                        trial,
                        len = calls.len(),
                        "trial broke an invariant"
                    );
                    return self.violated(calls, violation);
                }
            }
        }
        Ok(CampaignOutcome::Passed)
    }

    fn violated(&mut self, calls: CallSequence, violation: Violation) -> Result<CampaignOutcome> {
        let shrink = self.config.shrinking && !calls.is_empty();
        let outcome = if shrink {
            Shrinker::new(self.config.shrink_run_limit, self.early_exit.clone()).shrink(
                &mut self.executor,
                calls,
                violation,
            )?
        } else {
            ShrinkOutcome::unshrunk(calls, violation)
        };
        self.stats.shrink_executions = outcome.executions;
        let counterexample = Counterexample::new(self.executor.catalog(), &outcome, shrink)?;
        Ok(CampaignOutcome::Violated(counterexample))
    }
}

/// Builds the runner driving generation, seeded if `seed` is set.
fn fuzzer(seed: Option<u64>) -> TestRunner {
    let config = proptest::test_runner::Config {
        failure_persistence: None,
        // Sequences are shrunk by replaying them on the node, not by proptest.
        max_shrink_iters: 0,
        ..Default::default()
    };

    if let Some(seed) = seed {
        trace!(target: "chainprop::fuzz", seed, "building deterministic fuzzer");
        let rng = TestRng::from_seed(RngAlgorithm::ChaCha, &U256::from(seed).to_be_bytes::<32>());
        TestRunner::new_with_rng(config, rng)
    } else {
        trace!(target: "chainprop::fuzz", "building stochastic fuzzer");
        TestRunner::new(config)
    }
}
