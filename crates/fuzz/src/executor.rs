use crate::{Call, OperationCatalog, coverage::ProgramPoint};
use chainprop_node::{NodeError, SnapshotId, TestNode};
use eyre::{Result, WrapErr, eyre};
use std::{collections::BTreeSet, fmt};

/// Result of submitting one call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallOutcome {
    /// The transaction was mined, successfully or as a revert.
    Executed,
    /// The node lagged behind its own state; the call is treated as a no-op.
    TransientSkip,
}

/// Why an invariant did not hold.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ViolationReason {
    ReturnedFalse,
    /// The invariant call reverted or returned undecodable data.
    Failed(String),
}

impl fmt::Display for ViolationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReturnedFalse => f.write_str("returned false"),
            Self::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// A broken invariant.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Violation {
    /// Index into [`OperationCatalog::invariants`].
    pub invariant: usize,
    pub reason: ViolationReason,
    /// Position of the call after which the check failed, `None` for the initial state.
    pub call_index: Option<usize>,
}

/// Result of replaying one sequence.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TrialOutcome {
    /// Every invariant held after every call.
    Passed {
        /// Top-level program points executed, empty without coverage guidance.
        coverage: BTreeSet<ProgramPoint>,
    },
    Violated(Violation),
}

/// Replays call sequences against the node, each one from the same snapshot.
pub struct SequenceExecutor<'a, N: ?Sized> {
    node: &'a N,
    catalog: &'a OperationCatalog,
    /// Trace every executed call.
    coverage: bool,
    /// Snapshot every replay starts from. Taken lazily by the first [`Self::reset`].
    snapshot: Option<SnapshotId>,
    transient_skips: u64,
    executions: u64,
}

impl<N: ?Sized> fmt::Debug for SequenceExecutor<'_, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SequenceExecutor")
            .field("coverage", &self.coverage)
            .field("snapshot", &self.snapshot)
            .field("transient_skips", &self.transient_skips)
            .field("executions", &self.executions)
            .finish_non_exhaustive()
    }
}

impl<'a, N: TestNode + ?Sized> SequenceExecutor<'a, N> {
    pub fn new(node: &'a N, catalog: &'a OperationCatalog, coverage: bool) -> Self {
        Self { node, catalog, coverage, snapshot: None, transient_skips: 0, executions: 0 }
    }

    pub fn catalog(&self) -> &'a OperationCatalog {
        self.catalog
    }

    /// Number of calls and invariant checks skipped because of transient node errors.
    pub fn transient_skips(&self) -> u64 {
        self.transient_skips
    }

    /// Number of sequences replayed so far.
    pub fn executions(&self) -> u64 {
        self.executions
    }

    /// Restores the state of the previous snapshot, if any, and checkpoints it again.
    ///
    /// The node consumes a snapshot on revert, so a fresh one is taken every time.
    pub fn reset(&mut self) -> Result<()> {
        if let Some(id) = self.snapshot.take() {
            let reverted = self.node.revert(id).wrap_err("failed to revert the node")?;
            if !reverted {
                eyre::bail!("node refused to revert to snapshot {id}");
            }
        }
        let id = self.node.snapshot().wrap_err("failed to snapshot the node")?;
        trace!(target: "chainprop::fuzz", %id, "took snapshot");
        self.snapshot = Some(id);
        Ok(())
    }

    /// Checks every invariant against the deployed state, before any call.
    pub fn check_initial(&mut self) -> Result<Option<Violation>> {
        self.reset()?;
        self.check_invariants(None)
    }

    /// Replays `calls` from the snapshot, checking every invariant after each call.
    ///
    /// Calls after the first violation are not executed.
    pub fn run<'c>(&mut self, calls: impl IntoIterator<Item = &'c Call>) -> Result<TrialOutcome> {
        self.reset()?;
        self.executions += 1;

        let mut coverage = BTreeSet::new();
        for (index, call) in calls.into_iter().enumerate() {
            self.execute_call(call, &mut coverage)?;
            if let Some(violation) = self.check_invariants(Some(index))? {
                return Ok(TrialOutcome::Violated(violation));
            }
        }
        Ok(TrialOutcome::Passed { coverage })
    }

    /// Submits one call from the node's account and folds its top-level program points into
    /// `coverage`.
    pub fn execute_call(
        &mut self,
        call: &Call,
        coverage: &mut BTreeSet<ProgramPoint>,
    ) -> Result<CallOutcome> {
        let operation = self
            .catalog
            .get(call.operation)
            .ok_or_else(|| eyre!("operation {} is not in the catalog", call.operation))?;
        let args = call.args.current();
        let calldata = operation.calldata(&args)?;

        let tx = match self.node.transact(operation.address, calldata) {
            Ok(tx) => tx,
            Err(err) if err.is_transient() => {
                self.transient_skips += 1;
                warn!(target: "chainprop::fuzz", call = %operation.describe(&args), %err, "skipping call");
                return Ok(CallOutcome::TransientSkip);
            }
            Err(err) if err.is_revert() => {
                trace!(target: "chainprop::fuzz", call = %operation.describe(&args), %err, "call reverted");
                return Ok(CallOutcome::Executed);
            }
            Err(err) => {
                return Err(err)
                    .wrap_err_with(|| format!("failed to execute {}", operation.describe(&args)));
            }
        };
        trace!(target: "chainprop::fuzz", call = %operation.describe(&args), %tx, "executed call");

        if self.coverage {
            match self.node.trace(tx) {
                Ok(logs) => coverage.extend(
                    logs.iter().filter(|log| log.depth == 1).map(|log| (operation.address, log.pc)),
                ),
                Err(err) if err.is_transient() => {
                    self.transient_skips += 1;
                    warn!(target: "chainprop::coverage", %tx, %err, "trace not available");
                }
                Err(err) => return Err(err).wrap_err_with(|| format!("failed to trace {tx}")),
            }
        }
        Ok(CallOutcome::Executed)
    }

    /// Evaluates every invariant and returns the first one that does not hold.
    pub fn check_invariants(&mut self, call_index: Option<usize>) -> Result<Option<Violation>> {
        for (invariant, check) in self.catalog.invariants().iter().enumerate() {
            let reason = match self.node.call(check.address, check.calldata()) {
                Ok(output) => match check.decode(&output) {
                    Ok(true) => continue,
                    Ok(false) => ViolationReason::ReturnedFalse,
                    Err(err) => ViolationReason::Failed(format!("{err:#}")),
                },
                Err(err) if err.is_transient() => {
                    self.transient_skips += 1;
                    warn!(target: "chainprop::fuzz", %check, %err, "skipping invariant check");
                    continue;
                }
                Err(err @ NodeError::Rpc { .. }) => ViolationReason::Failed(err.to_string()),
                Err(err) => return Err(err).wrap_err_with(|| format!("failed to call {check}")),
            };
            debug!(target: "chainprop::fuzz", %check, %reason, ?call_index, "invariant broken");
            return Ok(Some(Violation { invariant, reason, call_index }));
        }
        Ok(None)
    }
}
