use crate::NodeError;
use alloy_primitives::{Address, Bytes, TxHash, U256};
use alloy_rpc_types_trace::geth::StructLog;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier returned by `evm_snapshot`. Valid for a single revert.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SnapshotId(pub U256);

impl fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Blocking operations of an isolated EVM test node.
///
/// All calls are issued from [`TestNode::account`]. The node holds one mutable global state, so
/// callers must not interleave requests from concurrent trials.
pub trait TestNode {
    /// The funded account every transaction and call is sent from.
    fn account(&self) -> Address;

    /// Deploys `bytecode` with a signed contract-creation transaction and returns the address
    /// of the new contract.
    fn deploy(&self, bytecode: &Bytes) -> Result<Address, NodeError>;

    /// Submits a state-changing transaction and returns its hash once mined. A reverting
    /// transaction is mined as failed; it is not an error.
    fn transact(&self, to: Address, input: Bytes) -> Result<TxHash, NodeError>;

    /// Executes a read-only call against the latest state and returns the raw output.
    fn call(&self, to: Address, input: Bytes) -> Result<Bytes, NodeError>;

    /// Checkpoints the whole chain state.
    fn snapshot(&self) -> Result<SnapshotId, NodeError>;

    /// Restores the state captured by `id`. The snapshot is consumed.
    fn revert(&self, id: SnapshotId) -> Result<bool, NodeError>;

    /// Returns the per-instruction trace of a mined transaction. Depth starts at 1 for the
    /// transaction's target.
    fn trace(&self, tx: TxHash) -> Result<Vec<StructLog>, NodeError>;

    /// Returns `true` if the node answers requests.
    fn is_alive(&self) -> bool;
}
