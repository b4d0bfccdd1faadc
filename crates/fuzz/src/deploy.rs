use alloy_dyn_abi::{DynSolValue, FunctionExt};
use alloy_primitives::{Address, Bytes};
use chainprop_abi::{ContractSpec, InterfaceCatalog, InterfaceError};
use chainprop_node::{NodeError, Retry, TestNode};
use itertools::Itertools;
use std::time::Duration;

/// Pause between two deployment attempts.
const RETRY_DELAY: Duration = Duration::from_millis(50);

/// A contract deployed on the node and fuzzed during the campaign.
#[derive(Clone, Debug)]
pub struct DeployedTarget {
    pub address: Address,
    pub spec: ContractSpec,
}

impl DeployedTarget {
    pub fn name(&self) -> &str {
        &self.spec.name
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    #[error(transparent)]
    Node(#[from] NodeError),
    #[error(transparent)]
    Interface(#[from] InterfaceError),
    #[error("could not decode {contract}.{function} output: {source}")]
    Decode {
        contract: String,
        function: String,
        #[source]
        source: alloy_dyn_abi::Error,
    },
    #[error("{contract}.{function} returned {value:?} at position {index}, expected an address")]
    NotAnAddress { contract: String, function: String, index: usize, value: Option<DynSolValue> },
}

/// Deploys every test harness of the catalog and discovers the contracts they expose.
///
/// For each contract in compiler order:
/// 1. the creation bytecode is deployed, unless it is empty
/// 2. contracts without a zero-argument `setUp` are not harnesses: they stay deployed but are
///    neither set up nor fuzzed
/// 3. `setUp` is called once
/// 4. every zero-argument read-only function returning a contract type is called, and each
///    returned address becomes a target bound to the interface of that contract name
/// 5. the harness itself is added after its dependents
///
/// Discovery is one level deep: contracts exposed by a discovered contract are not followed.
pub struct DeploymentResolver<'a, N: ?Sized> {
    node: &'a N,
    catalog: &'a InterfaceCatalog,
    retries: u32,
}

impl<'a, N: TestNode + ?Sized> DeploymentResolver<'a, N> {
    pub fn new(node: &'a N, catalog: &'a InterfaceCatalog) -> Self {
        Self { node, catalog, retries: 100 }
    }

    /// Total number of resolution attempts.
    pub fn attempts(mut self, attempts: u32) -> Self {
        self.retries = attempts.max(1);
        self
    }

    /// Resolves the target set.
    ///
    /// Every attempt starts from a checkpoint of the node state and restores it on failure, so
    /// a retried attempt never sees contracts left over by the previous one. Node errors are
    /// retried; interface errors, such as a getter naming an unknown contract, are fatal.
    pub fn resolve(&self) -> Result<Vec<DeployedTarget>, DeployError> {
        let targets = Retry::new(self.retries - 1, Some(RETRY_DELAY)).run(
            |err| matches!(err, DeployError::Node(_)),
            || {
                let checkpoint = self.node.snapshot()?;
                self.resolve_once().inspect_err(|_| {
                    if let Err(err) = self.node.revert(checkpoint) {
                        warn!(target: "chainprop::deploy", %err, "failed to roll back deployment");
                    }
                })
            },
        )?;
        info!(
            target: "chainprop::deploy",
            targets = targets.len(),
            "deployment resolved: {}",
            targets.iter().map(|t| format!("{}@{}", t.name(), t.address)).join(", ")
        );
        Ok(targets)
    }

    fn resolve_once(&self) -> Result<Vec<DeployedTarget>, DeployError> {
        let mut targets = Vec::new();
        for spec in self.catalog.iter() {
            if spec.bytecode.is_empty() {
                trace!(target: "chainprop::deploy", contract = %spec.name, "no bytecode, skipping");
                continue;
            }

            let address = self.node.deploy(&spec.bytecode)?;
            let Some(setup) = spec.setup() else {
                trace!(
                    target: "chainprop::deploy",
                    contract = %spec.name,
                    %address,
                    "no setUp, skipping"
                );
                continue;
            };
            debug!(target: "chainprop::deploy", contract = %spec.name, %address, "deployed harness");
            self.node.transact(address, Bytes::copy_from_slice(setup.selector().as_slice()))?;

            targets.extend(self.discover(spec, address)?);
            targets.push(DeployedTarget { address, spec: spec.clone() });
        }
        Ok(targets)
    }

    /// Calls the zero-argument getters of `spec` that return contracts.
    fn discover(
        &self,
        spec: &ContractSpec,
        address: Address,
    ) -> Result<Vec<DeployedTarget>, DeployError> {
        let mut found = Vec::new();
        for getter in spec.read_only().filter(|f| f.function.inputs.is_empty()) {
            let returned: Vec<_> = getter.returned_contracts().collect();
            if returned.is_empty() {
                continue;
            }

            let calldata = Bytes::copy_from_slice(getter.function.selector().as_slice());
            let output = self.node.call(address, calldata)?;
            let values = getter.function.abi_decode_output(&output).map_err(|source| {
                DeployError::Decode {
                    contract: spec.name.clone(),
                    function: getter.name().to_string(),
                    source,
                }
            })?;

            for (index, name) in returned {
                let Some(DynSolValue::Address(dependent)) = values.get(index) else {
                    return Err(DeployError::NotAnAddress {
                        contract: spec.name.clone(),
                        function: getter.name().to_string(),
                        index,
                        value: values.get(index).cloned(),
                    });
                };
                let dependent_spec = self.catalog.resolve(name)?;
                debug!(
                    target: "chainprop::deploy",
                    contract = %name,
                    address = %dependent,
                    via = %format_args!("{}.{}", spec.name, getter.name()),
                    "discovered contract"
                );
                found.push(DeployedTarget { address: *dependent, spec: dependent_spec.clone() });
            }
        }
        Ok(found)
    }
}
