use crate::OperationCatalog;
use alloy_dyn_abi::DynSolValue;
use alloy_primitives::U256;
use chainprop_config::FuzzConfig;
use eyre::{Result, eyre};
use proptest::{
    prelude::Rng,
    strategy::{Strategy, ValueTree},
    test_runner::{RngAlgorithm, TestRng, TestRunner},
};
use std::fmt;

/// Arguments of one call.
pub enum CallArgs {
    /// Freshly generated value, still shrinkable. `seed` regenerates the same tree.
    Tree { seed: u64, tree: Box<dyn ValueTree<Value = DynSolValue>> },
    /// A value copied from a [`CallArgs::Tree`], with the seed the tree was drawn from.
    Seeded { seed: u64, value: DynSolValue },
    /// A settled value, already shrunk.
    Fixed(DynSolValue),
}

impl CallArgs {
    pub fn current(&self) -> DynSolValue {
        match self {
            Self::Tree { tree, .. } => tree.current(),
            Self::Seeded { value, .. } | Self::Fixed(value) => value.clone(),
        }
    }

    /// The seed of the value tree these arguments come from, if any.
    pub fn seed(&self) -> Option<u64> {
        match self {
            Self::Tree { seed, .. } | Self::Seeded { seed, .. } => Some(*seed),
            Self::Fixed(_) => None,
        }
    }

    pub fn is_shrinkable(&self) -> bool {
        matches!(self, Self::Tree { .. })
    }

    pub fn simplify(&mut self) -> bool {
        match self {
            Self::Tree { tree, .. } => tree.simplify(),
            Self::Seeded { .. } | Self::Fixed(_) => false,
        }
    }

    pub fn complicate(&mut self) -> bool {
        match self {
            Self::Tree { tree, .. } => tree.complicate(),
            Self::Seeded { .. } | Self::Fixed(_) => false,
        }
    }
}

impl Clone for CallArgs {
    /// Clones the current value. The copy cannot be shrunk until its tree is regenerated by
    /// [`SequenceGenerator::mutate`].
    fn clone(&self) -> Self {
        match self {
            Self::Tree { seed, tree } => Self::Seeded { seed: *seed, value: tree.current() },
            Self::Seeded { seed, value } => Self::Seeded { seed: *seed, value: value.clone() },
            Self::Fixed(value) => Self::Fixed(value.clone()),
        }
    }
}

impl fmt::Debug for CallArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tree { seed, tree } => {
                f.debug_struct("Tree").field("seed", seed).field("value", &tree.current()).finish()
            }
            Self::Seeded { seed, value } => {
                f.debug_struct("Seeded").field("seed", seed).field("value", value).finish()
            }
            Self::Fixed(value) => f.debug_tuple("Fixed").field(value).finish(),
        }
    }
}

/// One call of a sequence: an index into the [`OperationCatalog`] and its arguments.
#[derive(Clone, Debug)]
pub struct Call {
    pub operation: usize,
    pub args: CallArgs,
}

/// The unit replayed per trial.
pub type CallSequence = Vec<Call>;

/// How a trial's sequence is drawn.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SequencePolicy {
    /// Maximum number of calls.
    pub seq_len: usize,
    /// Restrict every trial to a random non-empty subset of the operations.
    pub swarm_testing: bool,
    /// Draw the minimum length uniformly in `1..=seq_len` instead of using 1.
    pub favor_long_sequence: bool,
}

impl From<&FuzzConfig> for SequencePolicy {
    fn from(config: &FuzzConfig) -> Self {
        Self {
            seq_len: config.max_sequence_len().max(1),
            swarm_testing: config.swarm_testing,
            favor_long_sequence: config.favor_long_sequence,
        }
    }
}

/// Draws call sequences from the operation catalog.
#[derive(Debug)]
pub struct SequenceGenerator<'a> {
    catalog: &'a OperationCatalog,
    policy: SequencePolicy,
}

impl<'a> SequenceGenerator<'a> {
    pub fn new(catalog: &'a OperationCatalog, policy: SequencePolicy) -> Self {
        Self { catalog, policy }
    }

    pub fn policy(&self) -> &SequencePolicy {
        &self.policy
    }

    /// Draws the operations available to one trial.
    ///
    /// With swarm testing, the subset size is uniform in `1..=N` and the members are distinct.
    /// Otherwise every operation is available.
    pub fn pool(&self, runner: &mut TestRunner) -> Vec<usize> {
        let len = self.catalog.len();
        if !self.policy.swarm_testing || len <= 1 {
            return (0..len).collect();
        }
        let rng = runner.rng();
        let size = rng.random_range(1..=len);
        let mut pool = rand::seq::index::sample(rng, len, size).into_vec();
        pool.sort_unstable();
        pool
    }

    /// Draws the minimum sequence length of one trial.
    pub fn min_len(&self, runner: &mut TestRunner) -> usize {
        if self.policy.favor_long_sequence {
            runner.rng().random_range(1..=self.policy.seq_len)
        } else {
            1
        }
    }

    /// Generates a fresh sequence.
    pub fn generate(&self, runner: &mut TestRunner) -> Result<CallSequence> {
        let pool = self.pool(runner);
        let min_len = self.min_len(runner);
        let len = runner.rng().random_range(min_len..=self.policy.seq_len);
        trace!(target: "chainprop::fuzz", pool = pool.len(), len, "generating sequence");
        self.extend(runner, &pool, Vec::with_capacity(len), len)
    }

    /// Derives a sequence from `base`: keeps a random prefix of it and regenerates the rest
    /// from a freshly drawn pool.
    ///
    /// Kept calls get their value trees back, so the prefix stays shrinkable.
    pub fn mutate(&self, runner: &mut TestRunner, base: &[Call]) -> Result<CallSequence> {
        let pool = self.pool(runner);
        let min_len = self.min_len(runner);
        let keep = runner.rng().random_range(0..=base.len().min(self.policy.seq_len));
        let len = runner.rng().random_range(min_len.max(keep).max(1)..=self.policy.seq_len);
        trace!(target: "chainprop::fuzz", keep, len, "mutating sequence");
        let mut prefix = Vec::with_capacity(len);
        for call in &base[..keep] {
            prefix.push(self.revive(runner, call)?);
        }
        self.extend(runner, &pool, prefix, len)
    }

    /// Copies `call`, regenerating its value tree if the copied value is still the one the tree
    /// started from.
    fn revive(&self, runner: &TestRunner, call: &Call) -> Result<Call> {
        let Some(seed) = call.args.seed() else { return Ok(call.clone()) };
        let tree = self.seeded_tree(runner, call.operation, seed)?;
        let args = if tree.current() == call.args.current() {
            CallArgs::Tree { seed, tree }
        } else {
            call.args.clone()
        };
        Ok(Call { operation: call.operation, args })
    }

    /// Draws the value tree of `operation` from an RNG seeded with `seed`.
    fn seeded_tree(
        &self,
        runner: &TestRunner,
        operation: usize,
        seed: u64,
    ) -> Result<Box<dyn ValueTree<Value = DynSolValue>>> {
        let strategy = self
            .catalog
            .get(operation)
            .ok_or_else(|| eyre!("operation {operation} is not in the catalog"))?
            .strategy();
        let rng = TestRng::from_seed(RngAlgorithm::ChaCha, &U256::from(seed).to_be_bytes::<32>());
        let mut runner = TestRunner::new_with_rng(runner.config().clone(), rng);
        strategy.new_tree(&mut runner).map_err(|reason| eyre!("{reason}"))
    }

    fn extend(
        &self,
        runner: &mut TestRunner,
        pool: &[usize],
        mut calls: CallSequence,
        len: usize,
    ) -> Result<CallSequence> {
        if pool.is_empty() {
            return Ok(calls);
        }
        while calls.len() < len {
            let operation = pool[runner.rng().random_range(0..pool.len())];
            let seed: u64 = runner.rng().random();
            let tree = self.seeded_tree(runner, operation, seed)?;
            calls.push(Call { operation, args: CallArgs::Tree { seed, tree } });
        }
        Ok(calls)
    }
}
