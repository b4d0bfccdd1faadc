//! # chainprop-abi
//!
//! Reads the compiler's standard export document and classifies every contract function as an
//! invariant, the fixture entry point, a fuzzable mutating call or a read-only getter.

#![cfg_attr(not(test), warn(unused_crate_dependencies))]

#[macro_use]
extern crate tracing;

mod artifact;
pub use artifact::{CompilationUnit, CompilerOutput, ContractArtifact};

mod catalog;
pub use catalog::{
    ContractSpec, FunctionKind, FunctionSpec, INVARIANT_PREFIX, InterfaceCatalog, SETUP_FUNCTION,
};

mod error;
pub use error::InterfaceError;
