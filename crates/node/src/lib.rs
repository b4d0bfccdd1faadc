//! # chainprop-node
//!
//! The subset of the local EVM test node the fuzzing engine depends on: deploy, transact, call,
//! snapshot, revert and per-instruction traces, all as blocking request/response calls.

#![cfg_attr(not(test), warn(unused_crate_dependencies))]

#[macro_use]
extern crate tracing;

mod anvil;
pub use anvil::{ANVIL_STARTUP_TIMEOUT, AnvilInstance, AnvilSettings};

mod client;
pub use client::{DEFAULT_ACCOUNT, DEFAULT_PRIVATE_KEY, RpcNode, TxParams};

mod error;
pub use error::NodeError;

mod retry;
pub use retry::Retry;

mod rpc;
pub use rpc::RpcClient;

mod node;
pub use node::{SnapshotId, TestNode};

pub use alloy_rpc_types_trace::geth::StructLog;
