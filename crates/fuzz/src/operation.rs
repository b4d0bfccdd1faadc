use crate::{
    DeployedTarget,
    fmt::format_call_args,
    strategies::{Generator, MinedConstants, ValueLimits},
};
use alloy_dyn_abi::{DynSolType, DynSolValue, FunctionExt, JsonAbiExt, Specifier};
use alloy_json_abi::Function;
use alloy_primitives::{Address, Bytes};
use chainprop_abi::InterfaceError;
use eyre::{Result, WrapErr};
use proptest::strategy::BoxedStrategy;
use std::fmt;

/// A fuzzable function bound to one deployed target, with its argument generator.
pub struct Operation {
    pub contract: String,
    pub address: Address,
    pub function: Function,
    pub generator: Generator,
    strategy: BoxedStrategy<DynSolValue>,
}

impl fmt::Debug for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operation")
            .field("contract", &self.contract)
            .field("address", &self.address)
            .field("function", &self.function.signature())
            .field("generator", &self.generator)
            .finish_non_exhaustive()
    }
}

impl Operation {
    /// Binds `function` of `target`, resolving its argument types into a generator.
    pub fn new(
        target: &DeployedTarget,
        function: &Function,
        limits: &ValueLimits,
        constants: Option<&MinedConstants>,
    ) -> Result<Self, InterfaceError> {
        let unsupported = |ty: &str, reason: String| InterfaceError::UnsupportedType {
            contract: target.name().to_string(),
            function: function.name.clone(),
            ty: ty.to_string(),
            reason,
        };
        let types = function
            .inputs
            .iter()
            .map(|param| param.resolve().map_err(|err| unsupported(&param.ty, err.to_string())))
            .collect::<Result<Vec<DynSolType>, _>>()?;
        let mut generator = Generator::for_inputs(&types)
            .ok_or_else(|| unsupported(&function.signature(), "cannot be generated".into()))?;
        if let Some(constants) = constants {
            generator = constants.augment(generator);
        }
        let strategy = generator.strategy(limits);
        Ok(Self {
            contract: target.name().to_string(),
            address: target.address,
            function: function.clone(),
            generator,
            strategy,
        })
    }

    /// The strategy producing this operation's arguments.
    pub fn strategy(&self) -> &BoxedStrategy<DynSolValue> {
        &self.strategy
    }

    pub fn arity(&self) -> usize {
        self.function.inputs.len()
    }

    /// ABI-encodes the call with generated `args`.
    pub fn calldata(&self, args: &DynSolValue) -> Result<Bytes> {
        let encoded = match args {
            DynSolValue::Tuple(values) if self.arity() != 1 => {
                self.function.abi_encode_input(values)
            }
            single => self.function.abi_encode_input(std::slice::from_ref(single)),
        };
        let encoded = encoded.wrap_err_with(|| format!("failed to encode {}", self.describe(args)))?;
        Ok(encoded.into())
    }

    /// Formats the call as `Target.function(arg, ...)`.
    pub fn describe(&self, args: &DynSolValue) -> String {
        format!("{}.{}({})", self.contract, self.function.name, format_call_args(args, self.arity()))
    }
}

/// A zero-argument boolean property of one deployed target.
#[derive(Clone, Debug)]
pub struct InvariantCheck {
    pub contract: String,
    pub address: Address,
    pub function: Function,
}

impl InvariantCheck {
    pub fn new(target: &DeployedTarget, function: &Function) -> Self {
        Self { contract: target.name().to_string(), address: target.address, function: function.clone() }
    }

    pub fn calldata(&self) -> Bytes {
        Bytes::copy_from_slice(self.function.selector().as_slice())
    }

    /// Decodes the raw call output into the property's truth value.
    pub fn decode(&self, output: &[u8]) -> Result<bool> {
        let values = self
            .function
            .abi_decode_output(output)
            .wrap_err_with(|| format!("could not decode {self} output"))?;
        match values.as_slice() {
            [DynSolValue::Bool(holds)] => Ok(*holds),
            other => eyre::bail!("{self} returned {other:?} instead of a bool"),
        }
    }
}

impl fmt::Display for InvariantCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.contract, self.function.name)
    }
}

/// The operations and invariants of a campaign. Fixed before the first trial.
#[derive(Debug, Default)]
pub struct OperationCatalog {
    operations: Vec<Operation>,
    invariants: Vec<InvariantCheck>,
}

impl OperationCatalog {
    /// Registers one operation per fuzzable function of every target and one check per
    /// invariant.
    ///
    /// A function name declared by several targets yields one operation per target.
    pub fn build(
        targets: &[DeployedTarget],
        limits: &ValueLimits,
        constants: Option<&MinedConstants>,
    ) -> Result<Self, InterfaceError> {
        let mut catalog = Self::default();
        for target in targets {
            for spec in target.spec.fuzzable() {
                let operation = Operation::new(target, &spec.function, limits, constants)?;
                trace!(
                    target: "chainprop::fuzz",
                    operation = %format_args!("{}.{}", operation.contract, operation.function.signature()),
                    generator = ?operation.generator,
                    "registered operation"
                );
                catalog.operations.push(operation);
            }
            catalog
                .invariants
                .extend(target.spec.invariants().map(|spec| InvariantCheck::new(target, &spec.function)));
        }
        info!(
            target: "chainprop::fuzz",
            operations = catalog.operations.len(),
            invariants = catalog.invariants.len(),
            "operation catalog built"
        );
        Ok(catalog)
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn invariants(&self) -> &[InvariantCheck] {
        &self.invariants
    }

    pub fn get(&self, index: usize) -> Option<&Operation> {
        self.operations.get(index)
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}
