use crate::{NodeError, RpcClient, SnapshotId, TestNode};
use alloy_consensus::{SignableTransaction, TxEip1559, TxEnvelope};
use alloy_eips::eip2718::Encodable2718;
use alloy_primitives::{Address, Bytes, TxHash, TxKind, U64, U256, address};
use alloy_rpc_types_eth::{TransactionInput, TransactionReceipt, TransactionRequest};
use alloy_rpc_types_trace::geth::{
    DefaultFrame, GethDebugTracingOptions, GethDefaultTracingOptions, StructLog,
};
use alloy_signer::SignerSync;
use alloy_signer_local::PrivateKeySigner;

/// First default account of an anvil node.
pub const DEFAULT_ACCOUNT: Address = address!("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266");

/// Private key of [`DEFAULT_ACCOUNT`].
pub const DEFAULT_PRIVATE_KEY: &str =
    "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

/// Fee and gas parameters of the transactions sent to the node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TxParams {
    pub chain_id: u64,
    pub max_fee_per_gas: u128,
    pub max_priority_fee_per_gas: u128,
    pub gas_limit: u64,
}

impl Default for TxParams {
    fn default() -> Self {
        Self {
            chain_id: 1,
            max_fee_per_gas: 20_000_000_000,
            max_priority_fee_per_gas: 1,
            gas_limit: 15_000_000,
        }
    }
}

/// Struct logger options: only program counters and depths are read from the trace.
fn trace_options() -> GethDebugTracingOptions {
    let config = GethDefaultTracingOptions {
        disable_storage: Some(true),
        disable_stack: Some(true),
        ..Default::default()
    };
    GethDebugTracingOptions { config, ..Default::default() }
}

/// [`TestNode`] backed by a JSON-RPC endpoint.
///
/// Deployments are signed locally; every other transaction is sent through the node's unlocked
/// copy of the same account.
#[derive(Debug)]
pub struct RpcNode {
    rpc: RpcClient,
    signer: PrivateKeySigner,
    params: TxParams,
}

impl RpcNode {
    /// Connects to `url` using the node's first default account.
    pub fn new(url: impl Into<String>, params: TxParams) -> Result<Self, NodeError> {
        let signer: PrivateKeySigner = DEFAULT_PRIVATE_KEY
            .parse()
            .map_err(|e| NodeError::Signer(alloy_signer::Error::other(e)))?;
        Ok(Self { rpc: RpcClient::new(url)?, signer, params })
    }

    /// Replaces the signing key. The node must have the matching account unlocked.
    pub fn with_signer(mut self, signer: PrivateKeySigner) -> Self {
        self.signer = signer;
        self
    }

    /// The underlying RPC client.
    pub fn rpc(&self) -> &RpcClient {
        &self.rpc
    }

    /// Returns the node's client version string.
    pub fn client_version(&self) -> Result<String, NodeError> {
        self.rpc.request("web3_clientVersion", ())
    }

    fn nonce(&self) -> Result<u64, NodeError> {
        let nonce: U64 =
            self.rpc.request("eth_getTransactionCount", (self.account(), "pending"))?;
        Ok(nonce.to())
    }

    fn receipt(&self, hash: TxHash) -> Result<TransactionReceipt, NodeError> {
        let receipt: Option<TransactionReceipt> =
            self.rpc.request("eth_getTransactionReceipt", (hash,))?;
        receipt.ok_or(NodeError::TransactionNotFound(hash))
    }

    /// A call from the node's account to `to`.
    fn request(&self, to: Address, input: Bytes) -> TransactionRequest {
        TransactionRequest::default()
            .from(self.account())
            .to(to)
            .input(TransactionInput::new(input))
    }

    fn sign_create(&self, bytecode: &Bytes, nonce: u64) -> Result<Bytes, NodeError> {
        let tx = TxEip1559 {
            chain_id: self.params.chain_id,
            nonce,
            gas_limit: self.params.gas_limit,
            max_fee_per_gas: self.params.max_fee_per_gas,
            max_priority_fee_per_gas: self.params.max_priority_fee_per_gas,
            to: TxKind::Create,
            value: U256::ZERO,
            access_list: Default::default(),
            input: bytecode.clone(),
        };
        let signature = self.signer.sign_hash_sync(&tx.signature_hash())?;
        let envelope = TxEnvelope::from(tx.into_signed(signature));
        Ok(envelope.encoded_2718().into())
    }
}

impl TestNode for RpcNode {
    fn account(&self) -> Address {
        self.signer.address()
    }

    fn deploy(&self, bytecode: &Bytes) -> Result<Address, NodeError> {
        let raw = self.sign_create(bytecode, self.nonce()?)?;
        let hash: TxHash = self.rpc.request("eth_sendRawTransaction", (raw,))?;
        let address = self.receipt(hash)?.contract_address;
        let address = address.ok_or(NodeError::MissingContractAddress(hash))?;
        debug!(target: "chainprop::node", %hash, %address, "deployed contract");
        Ok(address)
    }

    fn transact(&self, to: Address, input: Bytes) -> Result<TxHash, NodeError> {
        let request = self.request(to, input).gas_limit(self.params.gas_limit);
        self.rpc.request("eth_sendTransaction", (request,))
    }

    fn call(&self, to: Address, input: Bytes) -> Result<Bytes, NodeError> {
        self.rpc.request("eth_call", (self.request(to, input), "latest"))
    }

    fn snapshot(&self) -> Result<SnapshotId, NodeError> {
        self.rpc.request("evm_snapshot", ())
    }

    fn revert(&self, id: SnapshotId) -> Result<bool, NodeError> {
        self.rpc.request("evm_revert", (id,))
    }

    fn trace(&self, tx: TxHash) -> Result<Vec<StructLog>, NodeError> {
        let trace: DefaultFrame =
            self.rpc.request("debug_traceTransaction", (tx, trace_options()))?;
        Ok(trace.struct_logs)
    }

    fn is_alive(&self) -> bool {
        match self.client_version() {
            Ok(version) => {
                trace!(target: "chainprop::node", %version, "node is alive");
                true
            }
            Err(err) => {
                debug!(target: "chainprop::node", %err, "liveness check failed");
                false
            }
        }
    }
}
