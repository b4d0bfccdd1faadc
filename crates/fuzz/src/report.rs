use crate::{OperationCatalog, ShrinkOutcome, ViolationReason};
use eyre::{Result, eyre};
use itertools::Itertools;
use std::fmt;

/// A reportable invariant violation with the calls that reproduce it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Counterexample {
    /// The broken invariant as `Target.invariant_name`.
    pub invariant: String,
    pub reason: ViolationReason,
    /// Reproducing calls as `Target.function(arg, ...)`. Empty if the deployed state already
    /// breaks the invariant.
    pub calls: Vec<String>,
    pub original_len: usize,
    /// Replays spent on shrinking.
    pub executions: u64,
    pub shrunk: bool,
}

impl Counterexample {
    pub fn new(catalog: &OperationCatalog, outcome: &ShrinkOutcome, shrunk: bool) -> Result<Self> {
        let invariant = catalog
            .invariants()
            .get(outcome.violation.invariant)
            .ok_or_else(|| eyre!("invariant {} is not in the catalog", outcome.violation.invariant))?
            .to_string();
        let calls = outcome
            .calls
            .iter()
            .map(|call| {
                let operation = catalog
                    .get(call.operation)
                    .ok_or_else(|| eyre!("operation {} is not in the catalog", call.operation))?;
                Ok(operation.describe(&call.args.current()))
            })
            .collect::<Result<_>>()?;
        Ok(Self {
            invariant,
            reason: outcome.violation.reason.clone(),
            calls,
            original_len: outcome.original_len,
            executions: outcome.executions,
            shrunk,
        })
    }

    /// Returns `true` if the invariant was broken before any call.
    pub fn is_initial_state(&self) -> bool {
        self.calls.is_empty()
    }
}

impl fmt::Display for Counterexample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} {}", self.invariant, self.reason)?;
        if self.is_initial_state() {
            return write!(f, "  broken in the deployed state, before any call");
        }

        let plural = if self.calls.len() == 1 { "" } else { "s" };
        write!(f, "  sequence of {} call{plural}", self.calls.len())?;
        if self.shrunk {
            write!(f, " (shrunk from {} in {} runs)", self.original_len, self.executions)?;
        }
        writeln!(f, ":")?;
        write!(f, "{}", self.calls.iter().map(|call| format!("    {call}")).join("\n"))
    }
}
