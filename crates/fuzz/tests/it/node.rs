//! An in-memory node running scripted contracts.
//!
//! Contracts are plain functions over a cloneable [`Chain`] value, so snapshots are copies of it.
//! Bytecode only selects which scripted contract a deployment creates.

use alloy_primitives::{Address, B256, Bytes, TxHash, U256, keccak256};
use chainprop_node::{DEFAULT_ACCOUNT, NodeError, SnapshotId, StructLog, TestNode};
use std::{
    cell::{Cell, RefCell},
    collections::{BTreeMap, HashMap},
};

/// Executes a transaction. Returns the executed program counters, or the revert reason.
pub type TransactFn = fn(&mut Chain, Address, &[u8]) -> Result<Vec<u64>, String>;

/// Executes a read-only call. Returns the ABI-encoded output, or the revert reason.
pub type CallFn = fn(&Chain, Address, &[u8]) -> Result<Vec<u8>, String>;

#[derive(Clone, Copy)]
pub struct Script {
    pub transact: TransactFn,
    pub call: CallFn,
}

/// The whole simulated chain state.
#[derive(Clone, Default)]
pub struct Chain {
    slots: BTreeMap<(Address, &'static str), U256>,
    code: BTreeMap<Address, Script>,
    next_address: u8,
}

impl Chain {
    pub fn load(&self, address: Address, slot: &'static str) -> U256 {
        self.slots.get(&(address, slot)).copied().unwrap_or_default()
    }

    pub fn store(&mut self, address: Address, slot: &'static str, value: U256) {
        self.slots.insert((address, slot), value);
    }

    /// Creates a contract running `script` and returns its address.
    pub fn create(&mut self, script: Script) -> Address {
        self.next_address += 1;
        let address = Address::with_last_byte(self.next_address);
        self.code.insert(address, script);
        address
    }
}

/// First four bytes of the hash of `signature`.
pub fn selector(signature: &str) -> [u8; 4] {
    keccak256(signature.as_bytes())[..4].try_into().unwrap()
}

/// Splits calldata into selector and arguments.
pub fn split(input: &[u8]) -> ([u8; 4], &[u8]) {
    (input[..4].try_into().unwrap(), &input[4..])
}

/// Reads the `index`-th argument word.
pub fn word(args: &[u8], index: usize) -> U256 {
    U256::from_be_slice(&args[index * 32..(index + 1) * 32])
}

pub fn encode_bool(value: bool) -> Vec<u8> {
    U256::from(value as u8).to_be_bytes::<32>().to_vec()
}

pub fn encode_address(address: Address) -> Vec<u8> {
    address.into_word().to_vec()
}

/// A top-level `JUMPDEST` step at `pc`.
fn struct_log(pc: u64) -> StructLog {
    serde_json::from_value(serde_json::json!({
        "pc": pc,
        "op": "JUMPDEST",
        "gas": 0,
        "gasCost": 0,
        "depth": 1
    }))
    .unwrap()
}

pub struct ScriptedNode {
    chain: RefCell<Chain>,
    scripts: HashMap<Bytes, Script>,
    snapshots: RefCell<HashMap<U256, Chain>>,
    next_snapshot: Cell<u64>,
    traces: RefCell<HashMap<TxHash, Vec<u64>>>,
    next_tx: Cell<u64>,
    /// Requests received, by RPC method name.
    requests: RefCell<Vec<&'static str>>,
    failing_deploys: Cell<usize>,
    failing_transacts: Cell<usize>,
}

impl ScriptedNode {
    pub fn new() -> Self {
        Self {
            chain: Default::default(),
            scripts: HashMap::new(),
            snapshots: Default::default(),
            next_snapshot: Cell::new(0),
            traces: Default::default(),
            next_tx: Cell::new(0),
            requests: Default::default(),
            failing_deploys: Cell::new(0),
            failing_transacts: Cell::new(0),
        }
    }

    /// Deploying `bytecode` creates a contract running `script`.
    pub fn with_script(mut self, bytecode: &[u8], script: Script) -> Self {
        self.scripts.insert(Bytes::copy_from_slice(bytecode), script);
        self
    }

    /// The next `count` deployments fail as if the transaction was not visible yet.
    pub fn fail_deploys(&self, count: usize) {
        self.failing_deploys.set(count);
    }

    /// The next `count` transactions fail as if the block was not found.
    pub fn fail_transacts(&self, count: usize) {
        self.failing_transacts.set(count);
    }

    pub fn requests(&self) -> Vec<&'static str> {
        self.requests.borrow().clone()
    }

    pub fn count(&self, method: &str) -> usize {
        self.requests.borrow().iter().filter(|m| **m == method).count()
    }

    pub fn chain(&self) -> Chain {
        self.chain.borrow().clone()
    }

    fn log(&self, method: &'static str) {
        self.requests.borrow_mut().push(method);
    }

    fn next_hash(&self) -> TxHash {
        let id = self.next_tx.get() + 1;
        self.next_tx.set(id);
        B256::from(U256::from(id))
    }

    fn take_failure(counter: &Cell<usize>) -> bool {
        let remaining = counter.get();
        if remaining > 0 {
            counter.set(remaining - 1);
        }
        remaining > 0
    }
}

fn revert(reason: String) -> NodeError {
    NodeError::Rpc { code: 3, message: format!("execution reverted: {reason}") }
}

impl TestNode for ScriptedNode {
    fn account(&self) -> Address {
        DEFAULT_ACCOUNT
    }

    fn deploy(&self, bytecode: &Bytes) -> Result<Address, NodeError> {
        self.log("eth_sendRawTransaction");
        if Self::take_failure(&self.failing_deploys) {
            return Err(NodeError::TransactionNotFound(self.next_hash()));
        }
        let script = self.scripts.get(bytecode).copied().ok_or_else(|| NodeError::Rpc {
            code: -32000,
            message: format!("no script for bytecode {bytecode}"),
        })?;
        Ok(self.chain.borrow_mut().create(script))
    }

    fn transact(&self, to: Address, input: Bytes) -> Result<TxHash, NodeError> {
        self.log("eth_sendTransaction");
        if Self::take_failure(&self.failing_transacts) {
            return Err(NodeError::BlockNotFound);
        }
        let script = self.chain.borrow().code.get(&to).copied();
        let hash = self.next_hash();
        let Some(script) = script else {
            self.traces.borrow_mut().insert(hash, Vec::new());
            return Ok(hash);
        };

        // State changes are committed only if the transaction succeeds.
        let mut chain = self.chain.borrow().clone();
        let pcs = (script.transact)(&mut chain, to, &input).map_err(revert)?;
        *self.chain.borrow_mut() = chain;
        self.traces.borrow_mut().insert(hash, pcs);
        Ok(hash)
    }

    fn call(&self, to: Address, input: Bytes) -> Result<Bytes, NodeError> {
        self.log("eth_call");
        let chain = self.chain.borrow();
        let Some(script) = chain.code.get(&to) else { return Ok(Bytes::new()) };
        (script.call)(&chain, to, &input).map(Bytes::from).map_err(revert)
    }

    fn snapshot(&self) -> Result<SnapshotId, NodeError> {
        self.log("evm_snapshot");
        let id = U256::from(self.next_snapshot.get());
        self.next_snapshot.set(self.next_snapshot.get() + 1);
        self.snapshots.borrow_mut().insert(id, self.chain.borrow().clone());
        Ok(SnapshotId(id))
    }

    fn revert(&self, id: SnapshotId) -> Result<bool, NodeError> {
        self.log("evm_revert");
        let Some(chain) = self.snapshots.borrow_mut().remove(&id.0) else { return Ok(false) };
        *self.chain.borrow_mut() = chain;
        Ok(true)
    }

    fn trace(&self, tx: TxHash) -> Result<Vec<StructLog>, NodeError> {
        self.log("debug_traceTransaction");
        let pcs = self.traces.borrow().get(&tx).cloned().ok_or(NodeError::TransactionNotFound(tx))?;
        Ok(pcs.into_iter().map(struct_log).collect())
    }

    fn is_alive(&self) -> bool {
        self.log("web3_clientVersion");
        true
    }
}
