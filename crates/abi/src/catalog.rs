use crate::{CompilerOutput, InterfaceError};
use alloy_json_abi::{Function, InternalType, JsonAbi, StateMutability};
use alloy_primitives::{Bytes, hex};
use indexmap::IndexMap;
use std::path::Path;

/// Functions whose name starts with this prefix are invariants.
pub const INVARIANT_PREFIX: &str = "invariant";

/// Fixture entry point, called once after deployment and never fuzzed.
pub const SETUP_FUNCTION: &str = "setUp";

/// Role of a contract function during a campaign.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FunctionKind {
    /// Zero-argument boolean property checked after every call.
    Invariant,
    /// The `setUp` fixture.
    Setup,
    /// Non-view, non-pure function: a fuzz candidate.
    Mutating,
    /// View or pure function. Only used to discover dependent contracts.
    ReadOnly,
}

impl FunctionKind {
    /// Classifies `function` declared by `contract`.
    ///
    /// Invariants are recognized by name regardless of their declared mutability.
    pub fn classify(contract: &str, function: &Function) -> Result<Self, InterfaceError> {
        if function.name.starts_with(INVARIANT_PREFIX) {
            let malformed = |reason| InterfaceError::MalformedInvariant {
                contract: contract.to_string(),
                function: function.name.clone(),
                reason,
            };
            if function.outputs.len() != 1 || function.outputs[0].ty != "bool" {
                return Err(malformed("should have one boolean return value"));
            }
            if !function.inputs.is_empty() {
                return Err(malformed("should take no arguments"));
            }
            return Ok(Self::Invariant);
        }
        if function.name == SETUP_FUNCTION {
            return Ok(Self::Setup);
        }
        Ok(match function.state_mutability {
            StateMutability::View | StateMutability::Pure => Self::ReadOnly,
            StateMutability::NonPayable | StateMutability::Payable => Self::Mutating,
        })
    }
}

/// A classified contract function.
#[derive(Clone, Debug)]
pub struct FunctionSpec {
    pub function: Function,
    pub kind: FunctionKind,
}

impl FunctionSpec {
    pub fn name(&self) -> &str {
        &self.function.name
    }

    /// Mutating functions with at least one argument. Zero-argument functions have nothing to
    /// generate and are never fuzzed.
    pub fn is_fuzzable(&self) -> bool {
        self.kind == FunctionKind::Mutating && !self.function.inputs.is_empty()
    }

    /// Output positions whose declared internal type names a contract, with that contract name.
    pub fn returned_contracts(&self) -> impl Iterator<Item = (usize, &str)> {
        self.function.outputs.iter().enumerate().filter_map(|(idx, output)| {
            match &output.internal_type {
                Some(InternalType::Contract(name)) => Some((idx, name.as_str())),
                _ => None,
            }
        })
    }
}

/// A compiled contract and its classified functions.
#[derive(Clone, Debug)]
pub struct ContractSpec {
    pub name: String,
    pub abi: JsonAbi,
    /// Creation bytecode. Empty for interfaces and abstract contracts.
    pub bytecode: Bytes,
    pub functions: Vec<FunctionSpec>,
}

impl ContractSpec {
    pub fn new(name: String, abi: JsonAbi, bytecode: Bytes) -> Result<Self, InterfaceError> {
        let functions = abi
            .functions()
            .map(|function| {
                Ok(FunctionSpec {
                    kind: FunctionKind::classify(&name, function)?,
                    function: function.clone(),
                })
            })
            .collect::<Result<Vec<_>, InterfaceError>>()?;
        Ok(Self { name, abi, bytecode, functions })
    }

    /// Returns `true` if the contract exposes a zero-argument `setUp`.
    pub fn has_setup(&self) -> bool {
        self.setup().is_some()
    }

    pub fn setup(&self) -> Option<&Function> {
        self.functions
            .iter()
            .find(|f| f.kind == FunctionKind::Setup && f.function.inputs.is_empty())
            .map(|f| &f.function)
    }

    pub fn invariants(&self) -> impl Iterator<Item = &FunctionSpec> {
        self.functions.iter().filter(|f| f.kind == FunctionKind::Invariant)
    }

    pub fn fuzzable(&self) -> impl Iterator<Item = &FunctionSpec> {
        self.functions.iter().filter(|f| f.is_fuzzable())
    }

    pub fn read_only(&self) -> impl Iterator<Item = &FunctionSpec> {
        self.functions.iter().filter(|f| f.kind == FunctionKind::ReadOnly)
    }
}

/// Every contract of the first compilation unit, by name, in compiler order.
#[derive(Clone, Debug, Default)]
pub struct InterfaceCatalog {
    contracts: IndexMap<String, ContractSpec>,
}

impl InterfaceCatalog {
    /// Builds the catalog, failing on the first malformed invariant.
    pub fn from_output(output: &CompilerOutput) -> Result<Self, InterfaceError> {
        let mut contracts = IndexMap::new();
        for (name, artifact) in output.first_unit_contracts()? {
            let bytecode = hex::decode(artifact.bin.trim())
                .map_err(|source| InterfaceError::Bytecode { contract: name.clone(), source })?;
            let spec = ContractSpec::new(name.clone(), artifact.abi.clone(), bytecode.into())?;
            trace!(
                target: "chainprop::abi",
                contract = %name,
                functions = spec.functions.len(),
                "loaded contract interface"
            );
            contracts.insert(name.clone(), spec);
        }
        debug!(target: "chainprop::abi", contracts = contracts.len(), "interface catalog loaded");
        Ok(Self { contracts })
    }

    /// Reads the export document at `path` and builds the catalog.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, InterfaceError> {
        Self::from_output(&CompilerOutput::read(path)?)
    }

    pub fn get(&self, name: &str) -> Option<&ContractSpec> {
        self.contracts.get(name)
    }

    /// Like [`Self::get`], failing with [`InterfaceError::UnknownContract`].
    pub fn resolve(&self, name: &str) -> Result<&ContractSpec, InterfaceError> {
        self.get(name).ok_or_else(|| InterfaceError::UnknownContract(name.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &ContractSpec> {
        self.contracts.values()
    }

    pub fn len(&self) -> usize {
        self.contracts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contracts.is_empty()
    }
}

impl FromIterator<ContractSpec> for InterfaceCatalog {
    fn from_iter<T: IntoIterator<Item = ContractSpec>>(iter: T) -> Self {
        Self { contracts: iter.into_iter().map(|spec| (spec.name.clone(), spec)).collect() }
    }
}
