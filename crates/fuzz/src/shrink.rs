use crate::{Call, CallArgs, CallSequence, EarlyExit, SequenceExecutor, TrialOutcome, Violation};
use chainprop_node::TestNode;
use eyre::Result;
use proptest::bits::{BitSetLike, VarBitSet};

/// A failing sequence after minimization.
#[derive(Clone, Debug)]
pub struct ShrinkOutcome {
    /// Calls up to and including the one after which the invariant broke.
    pub calls: CallSequence,
    pub violation: Violation,
    /// Length of the sequence before shrinking.
    pub original_len: usize,
    /// Replays spent on shrinking.
    pub executions: u64,
}

impl ShrinkOutcome {
    /// Reports `calls` as found, dropping the calls that were never executed.
    pub fn unshrunk(mut calls: CallSequence, violation: Violation) -> Self {
        let original_len = calls.len();
        calls.truncate(violation.call_index.map_or(0, |index| index + 1));
        Self { calls, violation, original_len, executions: 0 }
    }
}

/// Minimizes a failing call sequence by re-executing candidates on the node.
///
/// Calls are removed one at a time, keeping every removal after which the same invariant still
/// breaks. The arguments of the remaining calls are then shrunk through their value trees. Each
/// candidate costs one replay, bounded by the run limit.
#[derive(Clone, Debug)]
pub struct Shrinker {
    run_limit: u32,
    early_exit: EarlyExit,
}

impl Shrinker {
    pub fn new(run_limit: u32, early_exit: EarlyExit) -> Self {
        Self { run_limit, early_exit }
    }

    pub fn shrink<N: TestNode + ?Sized>(
        &self,
        executor: &mut SequenceExecutor<'_, N>,
        calls: CallSequence,
        violation: Violation,
    ) -> Result<ShrinkOutcome> {
        let start = executor.executions();
        let unshrunk = ShrinkOutcome::unshrunk(calls, violation);
        if unshrunk.calls.is_empty() {
            return Ok(unshrunk);
        }
        trace!(target: "chainprop::shrink", len = unshrunk.calls.len(), "shrinking sequence");

        let original = unshrunk.calls.clone();
        let mut runs = 0u32;
        let (calls, violation) =
            self.remove_calls(executor, unshrunk.calls, unshrunk.violation.clone(), &mut runs)?;
        let (calls, violation) = self.shrink_args(executor, calls, violation, &mut runs)?;

        // Replay the result once more so only a reproducible failure is reported.
        let target = violation.invariant;
        let outcome = match replay(executor, calls.iter(), target)? {
            Some(violation) => ShrinkOutcome {
                calls,
                violation,
                original_len: unshrunk.original_len,
                executions: 0,
            },
            None => {
                warn!(target: "chainprop::shrink", "shrunk sequence does not reproduce");
                ShrinkOutcome {
                    calls: original,
                    violation: unshrunk.violation,
                    original_len: unshrunk.original_len,
                    executions: 0,
                }
            }
        };
        let executions = executor.executions() - start;
        debug!(
            target: "chainprop::shrink",
            from = outcome.original_len,
            to = outcome.calls.len(),
            executions,
            "shrinking finished"
        );
        Ok(ShrinkOutcome { executions, ..outcome })
    }

    fn exhausted(&self, runs: u32) -> bool {
        runs >= self.run_limit || self.early_exit.should_stop()
    }

    /// Removes calls one by one, cycling over the sequence until a full pass removes nothing.
    fn remove_calls<N: TestNode + ?Sized>(
        &self,
        executor: &mut SequenceExecutor<'_, N>,
        calls: CallSequence,
        mut violation: Violation,
        runs: &mut u32,
    ) -> Result<(CallSequence, Violation)> {
        let len = calls.len();
        let mut included = VarBitSet::saturated(len);
        let mut call_idx = 0;
        let mut without_removal = 0;

        while without_removal < len && included.count() > 1 && !self.exhausted(*runs) {
            if included.test(call_idx) {
                included.clear(call_idx);
                *runs += 1;

                let candidate = kept(&included, len);
                match replay(executor, candidate.iter().map(|&i| &calls[i]), violation.invariant)? {
                    Some(found) => {
                        // Calls after the new failure point no longer matter.
                        let failed_at = found.call_index.map_or(0, |index| index + 1);
                        for &i in candidate.iter().skip(failed_at) {
                            included.clear(i);
                        }
                        trace!(
                            target: "chainprop::shrink",
                            removed = call_idx,
                            len = included.count(),
                            "kept removal"
                        );
                        violation = found;
                        without_removal = 0;
                    }
                    None => {
                        included.set(call_idx);
                        without_removal += 1;
                    }
                }
            } else {
                without_removal += 1;
            }
            call_idx = (call_idx + 1) % len;
        }

        let calls = calls
            .into_iter()
            .enumerate()
            .filter_map(|(i, call)| included.test(i).then_some(call))
            .collect();
        Ok((calls, violation))
    }

    /// Shrinks every call's arguments, keeping the simplest values that still fail.
    fn shrink_args<N: TestNode + ?Sized>(
        &self,
        executor: &mut SequenceExecutor<'_, N>,
        mut calls: CallSequence,
        mut violation: Violation,
        runs: &mut u32,
    ) -> Result<(CallSequence, Violation)> {
        let mut index = 0;
        while index < calls.len() {
            if !calls[index].args.is_shrinkable() {
                index += 1;
                continue;
            }

            let mut last_failing = calls[index].args.current();
            let mut moved = calls[index].args.simplify();
            while moved && !self.exhausted(*runs) {
                *runs += 1;
                match replay(executor, calls.iter(), violation.invariant)? {
                    Some(found) => {
                        last_failing = calls[index].args.current();
                        // Earlier calls are unchanged, so the failure is never before `index`.
                        calls.truncate(found.call_index.map_or(0, |i| i + 1).max(index + 1));
                        violation = found;
                        moved = calls[index].args.simplify();
                    }
                    None => moved = calls[index].args.complicate(),
                }
            }
            calls[index].args = CallArgs::Fixed(last_failing);
            index += 1;
        }
        Ok((calls, violation))
    }
}

/// Indices of the calls still included.
fn kept(included: &VarBitSet, len: usize) -> Vec<usize> {
    (0..len).filter(|&i| included.test(i)).collect()
}

/// Replays `calls` and returns the violation if invariant `target` broke.
fn replay<'c, N: TestNode + ?Sized>(
    executor: &mut SequenceExecutor<'_, N>,
    calls: impl IntoIterator<Item = &'c Call>,
    target: usize,
) -> Result<Option<Violation>> {
    Ok(match executor.run(calls)? {
        TrialOutcome::Violated(violation) if violation.invariant == target => Some(violation),
        _ => None,
    })
}
