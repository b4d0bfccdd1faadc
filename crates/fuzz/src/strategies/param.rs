use super::IntStrategy;
use alloy_dyn_abi::{DynSolType, DynSolValue};
use alloy_primitives::{Address, B256, Function};
use proptest::prelude::*;

/// Caps for generated dynamic values.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ValueLimits {
    /// Maximum length of `bytes` and `string` values.
    pub max_dynamic_len: usize,
    /// Maximum length of dynamic arrays.
    pub max_array_len: usize,
}

impl Default for ValueLimits {
    fn default() -> Self {
        Self { max_dynamic_len: 64, max_array_len: 16 }
    }
}

impl From<&chainprop_config::FuzzConfig> for ValueLimits {
    fn from(config: &chainprop_config::FuzzConfig) -> Self {
        Self { max_dynamic_len: config.max_dynamic_len, max_array_len: config.max_array_len }
    }
}

/// Value generator for one ABI type, or for a whole argument list.
///
/// Built once per operation before the campaign starts; [`Generator::strategy`] turns it into a
/// shrinkable proptest strategy.
#[derive(Clone, Debug, PartialEq)]
pub enum Generator {
    Uint(usize),
    Int(usize),
    Address,
    Bool,
    FixedBytes(usize),
    Function,
    Bytes,
    String,
    Array(Box<Self>),
    FixedArray(Box<Self>, usize),
    Tuple(Vec<Self>),
    /// Samples from mined constants half of the time, from `fallback` otherwise.
    Mined { pool: Vec<DynSolValue>, fallback: Box<Self> },
}

impl Generator {
    /// Returns the generator for `ty`, or `None` if the type cannot be generated.
    pub fn from_type(ty: &DynSolType) -> Option<Self> {
        Some(match ty {
            DynSolType::Bool => Self::Bool,
            DynSolType::Int(bits) => Self::Int(*bits),
            DynSolType::Uint(bits) => Self::Uint(*bits),
            DynSolType::FixedBytes(size) => Self::FixedBytes(*size),
            DynSolType::Address => Self::Address,
            DynSolType::Function => Self::Function,
            DynSolType::Bytes => Self::Bytes,
            DynSolType::String => Self::String,
            DynSolType::Array(inner) => Self::Array(Box::new(Self::from_type(inner)?)),
            DynSolType::FixedArray(inner, len) => {
                Self::FixedArray(Box::new(Self::from_type(inner)?), *len)
            }
            DynSolType::Tuple(inner) => {
                Self::Tuple(inner.iter().map(Self::from_type).collect::<Option<_>>()?)
            }
            #[allow(unreachable_patterns)]
            _ => return None,
        })
    }

    /// Returns the generator of a function's arguments: the argument's own generator when there
    /// is exactly one, a tuple of one generator per argument otherwise.
    pub fn for_inputs(inputs: &[DynSolType]) -> Option<Self> {
        match inputs {
            [single] => Self::from_type(single),
            _ => inputs.iter().map(Self::from_type).collect::<Option<_>>().map(Self::Tuple),
        }
    }

    /// Returns `true` if this generator samples from a constants pool anywhere in its tree.
    pub fn is_mined(&self) -> bool {
        match self {
            Self::Mined { .. } => true,
            Self::Array(inner) | Self::FixedArray(inner, _) => inner.is_mined(),
            Self::Tuple(inner) => inner.iter().any(Self::is_mined),
            _ => false,
        }
    }

    /// Builds the strategy generating values of this type.
    pub fn strategy(&self, limits: &ValueLimits) -> BoxedStrategy<DynSolValue> {
        match self {
            Self::Uint(bits) => IntStrategy::unsigned(*bits).boxed(),
            Self::Int(bits) => IntStrategy::signed(*bits).boxed(),
            Self::Address => any::<[u8; 20]>()
                .prop_map(|bytes| DynSolValue::Address(Address::from(bytes)))
                .boxed(),
            Self::Bool => any::<bool>().prop_map(DynSolValue::Bool).boxed(),
            Self::FixedBytes(size) => {
                let size = *size;
                proptest::collection::vec(any::<u8>(), size)
                    .prop_map(move |bytes| {
                        let mut word = B256::ZERO;
                        word[..size].copy_from_slice(&bytes);
                        DynSolValue::FixedBytes(word, size)
                    })
                    .boxed()
            }
            Self::Function => any::<[u8; 24]>()
                .prop_map(|bytes| DynSolValue::Function(Function::from(bytes)))
                .boxed(),
            Self::Bytes => proptest::collection::vec(any::<u8>(), 0..=limits.max_dynamic_len)
                .prop_map(DynSolValue::Bytes)
                .boxed(),
            Self::String => proptest::collection::vec(any::<char>(), 0..=limits.max_dynamic_len)
                .prop_map(|chars| DynSolValue::String(chars.into_iter().collect()))
                .boxed(),
            Self::Array(inner) => {
                proptest::collection::vec(inner.strategy(limits), 0..=limits.max_array_len)
                    .prop_map(DynSolValue::Array)
                    .boxed()
            }
            Self::FixedArray(inner, len) => proptest::collection::vec(inner.strategy(limits), *len)
                .prop_map(DynSolValue::FixedArray)
                .boxed(),
            Self::Tuple(inner) => inner
                .iter()
                .map(|generator| generator.strategy(limits))
                .collect::<Vec<_>>()
                .prop_map(DynSolValue::Tuple)
                .boxed(),
            Self::Mined { pool, fallback } => {
                prop_oneof![proptest::sample::select(pool.clone()), fallback.strategy(limits)]
                    .boxed()
            }
        }
    }
}
