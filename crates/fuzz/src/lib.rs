//! # chainprop-fuzz
//!
//! Stateful invariant fuzzing against contracts deployed on a test node.
//!
//! A campaign deploys the contract graph once, then runs trials: every trial reverts the node to
//! a fresh snapshot, replays a generated call sequence and checks every invariant after each
//! call. The first violation is shrunk and reported as a [`Counterexample`].

#![cfg_attr(not(test), warn(unused_crate_dependencies))]

#[macro_use]
extern crate tracing;

pub mod strategies;

mod campaign;
pub use campaign::{Campaign, CampaignOutcome, CampaignStats, EarlyExit};

mod coverage;
pub use coverage::{CoverageMap, ProgramPoint};

mod deploy;
pub use deploy::{DeployError, DeployedTarget, DeploymentResolver};

mod executor;
pub use executor::{CallOutcome, SequenceExecutor, TrialOutcome, Violation, ViolationReason};

mod fmt;
pub use fmt::format_value;

mod operation;
pub use operation::{InvariantCheck, Operation, OperationCatalog};

mod report;
pub use report::Counterexample;

mod sequence;
pub use sequence::{Call, CallArgs, CallSequence, SequenceGenerator, SequencePolicy};

mod shrink;
pub use shrink::{ShrinkOutcome, Shrinker};
