use alloy_dyn_abi::DynSolValue;
use alloy_primitives::hex;
use itertools::Itertools;
use std::fmt;

/// Displays a [`DynSolValue`] as a Solidity literal.
#[derive(Clone, Copy, Debug)]
struct Literal<'a>(&'a DynSolValue);

impl fmt::Display for Literal<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            DynSolValue::Bool(inner) => write!(f, "{inner}"),
            DynSolValue::Uint(inner, _) => write!(f, "{inner}"),
            DynSolValue::Int(inner, _) => write!(f, "{inner}"),
            // checksummed
            DynSolValue::Address(inner) => write!(f, "{inner}"),
            DynSolValue::Function(inner) => write!(f, "{inner}"),
            DynSolValue::FixedBytes(word, size) => {
                f.write_str(&hex::encode_prefixed(&word[..*size]))
            }
            DynSolValue::Bytes(inner) => f.write_str(&hex::encode_prefixed(inner)),
            DynSolValue::String(inner) => write!(f, "{inner:?}"),
            DynSolValue::Array(values) | DynSolValue::FixedArray(values) => {
                write!(f, "[{}]", literals(values))
            }
            DynSolValue::Tuple(values) => write!(f, "({})", literals(values)),
            #[allow(unreachable_patterns)]
            other => write!(f, "{other:?}"),
        }
    }
}

fn literals(values: &[DynSolValue]) -> impl fmt::Display + '_ {
    values.iter().map(Literal).format(", ")
}

/// Displays the generated arguments of a call with `arity` parameters, without the parentheses
/// of their tuple.
struct ArgList<'a> {
    args: &'a DynSolValue,
    arity: usize,
}

impl fmt::Display for ArgList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.args {
            DynSolValue::Tuple(values) if self.arity != 1 => {
                fmt::Display::fmt(&literals(values), f)
            }
            single => fmt::Display::fmt(&Literal(single), f),
        }
    }
}

/// Pretty-prints the given value for user output.
pub fn format_value(value: &DynSolValue) -> String {
    Literal(value).to_string()
}

pub(crate) fn format_call_args(args: &DynSolValue, arity: usize) -> String {
    ArgList { args, arity }.to_string()
}
