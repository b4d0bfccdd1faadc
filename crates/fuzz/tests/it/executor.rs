use crate::{deploy, fixtures, node::ScriptedNode};
use alloy_dyn_abi::DynSolValue;
use alloy_primitives::{Address, U256};
use chainprop_fuzz::{
    Call, CallArgs, CallOutcome, SequenceExecutor, TrialOutcome, Violation, ViolationReason,
};
use std::collections::BTreeSet;

fn call(operation: usize, value: U256, bits: usize) -> Call {
    Call { operation, args: CallArgs::Fixed(DynSolValue::Uint(value, bits)) }
}

#[test]
fn replays_start_from_the_same_state() {
    let node = ScriptedNode::new().with_script(&[0xc1], fixtures::COUNTER);
    let catalog = deploy(&node, &[fixtures::counter()]);
    let mut executor = SequenceExecutor::new(&node, &catalog, false);

    let calls = [call(0, U256::from(600), 256), call(0, U256::from(600), 256)];
    let expected = TrialOutcome::Violated(Violation {
        invariant: 0,
        reason: ViolationReason::ReturnedFalse,
        call_index: Some(1),
    });
    // Without the revert, the second replay would fail after its first call.
    assert_eq!(executor.run(&calls).unwrap(), expected);
    assert_eq!(executor.run(&calls).unwrap(), expected);
    assert_eq!(executor.run(&calls).unwrap(), expected);
    assert_eq!(executor.executions(), 3);
    // The first replay runs from the deployed state, every later one reverts first.
    assert_eq!(node.count("evm_revert"), 2);
}

#[test]
fn reverted_calls_do_not_change_state() {
    let node = ScriptedNode::new().with_script(&[0xc1], fixtures::COUNTER);
    let catalog = deploy(&node, &[fixtures::counter()]);
    let mut executor = SequenceExecutor::new(&node, &catalog, false);

    let calls = [call(0, U256::from(1), 256), call(0, U256::MAX, 256), call(0, U256::from(2), 256)];
    let outcome = executor.run(&calls).unwrap();
    assert_eq!(outcome, TrialOutcome::Passed { coverage: BTreeSet::new() });
    assert_eq!(node.chain().load(Address::with_last_byte(1), "total"), U256::from(3));
}

#[test]
fn collects_top_level_coverage() {
    let node = ScriptedNode::new().with_script(&[0xa1], fixtures::ALWAYS_TRUE);
    let catalog = deploy(&node, &[fixtures::always_true()]);
    let target = Address::with_last_byte(1);
    assert_eq!(catalog.operations()[0].function.name, "dec");

    let mut executor = SequenceExecutor::new(&node, &catalog, true);
    let outcome = executor.run(&[call(0, U256::from(10), 8)]).unwrap();
    assert_eq!(outcome, TrialOutcome::Passed { coverage: BTreeSet::from([(target, 3), (target, 4)]) });

    let mut executor = SequenceExecutor::new(&node, &catalog, false);
    let outcome = executor.run(&[call(0, U256::from(10), 8)]).unwrap();
    assert_eq!(outcome, TrialOutcome::Passed { coverage: BTreeSet::new() });
    assert_eq!(node.count("debug_traceTransaction"), 1);
}

#[test]
fn transient_errors_skip_the_call() {
    let node = ScriptedNode::new().with_script(&[0xc1], fixtures::COUNTER);
    let catalog = deploy(&node, &[fixtures::counter()]);
    let mut executor = SequenceExecutor::new(&node, &catalog, false);
    executor.reset().unwrap();

    node.fail_transacts(1);
    let mut coverage = BTreeSet::new();
    let skipped = executor.execute_call(&call(0, U256::from(5), 256), &mut coverage).unwrap();
    assert_eq!(skipped, CallOutcome::TransientSkip);
    let executed = executor.execute_call(&call(0, U256::from(5), 256), &mut coverage).unwrap();
    assert_eq!(executed, CallOutcome::Executed);

    assert_eq!(executor.transient_skips(), 1);
    assert_eq!(node.chain().load(Address::with_last_byte(1), "total"), U256::from(5));
    assert_eq!(executor.check_invariants(Some(1)).unwrap(), None);
}
