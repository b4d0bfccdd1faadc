//! The standard export document written by the contract compiler.
//!
//! ```text
//! { "compilation_units": { "<unit>": { "contracts": { "<unit>": { "<Name>": { "abi": [..], "bin": ".." } } } } } }
//! ```

use crate::InterfaceError;
use alloy_json_abi::JsonAbi;
use indexmap::IndexMap;
use serde::Deserialize;
use std::path::Path;

/// Compiler output, keyed by compilation unit. Document order is preserved.
#[derive(Clone, Debug, Deserialize)]
pub struct CompilerOutput {
    pub compilation_units: IndexMap<String, CompilationUnit>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct CompilationUnit {
    /// Contracts grouped by the source file that declares them.
    #[serde(default)]
    pub contracts: IndexMap<String, IndexMap<String, ContractArtifact>>,
}

/// A single compiled contract.
#[derive(Clone, Debug, Deserialize)]
pub struct ContractArtifact {
    pub abi: JsonAbi,
    /// Creation bytecode, hex encoded, with or without `0x` prefix.
    #[serde(default)]
    pub bin: String,
}

impl CompilerOutput {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, InterfaceError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Reads the export document at `path`.
    pub fn read(path: impl AsRef<Path>) -> Result<Self, InterfaceError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)
            .map_err(|source| InterfaceError::Io { path: path.to_path_buf(), source })?;
        Self::from_slice(&bytes)
    }

    /// Returns the contracts of the first compilation unit, in document order.
    ///
    /// The unit's contracts are normally grouped under a key equal to the unit name; the first
    /// group is used otherwise.
    pub fn first_unit_contracts(&self) -> Result<&IndexMap<String, ContractArtifact>, InterfaceError> {
        let (unit_name, unit) =
            self.compilation_units.first().ok_or(InterfaceError::NoCompilationUnit)?;
        unit.contracts
            .get(unit_name)
            .or_else(|| unit.contracts.first().map(|(_, contracts)| contracts))
            .ok_or_else(|| InterfaceError::NoContracts(unit_name.clone()))
    }
}
