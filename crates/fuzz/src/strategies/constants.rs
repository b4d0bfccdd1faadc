use super::{Generator, IntStrategy};
use alloy_dyn_abi::DynSolValue;
use alloy_primitives::{Address, Sign, U256};
use serde::Deserialize;
use std::{collections::BTreeSet, str::FromStr};

/// An integer literal, kept as sign and magnitude so that both `int256` and `uint256` extremes
/// are representable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MinedInt {
    pub negative: bool,
    pub abs: U256,
}

impl MinedInt {
    fn sign(&self) -> Sign {
        if self.negative { Sign::Negative } else { Sign::Positive }
    }
}

impl FromStr for MinedInt {
    type Err = alloy_primitives::ruint::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (negative, digits) = match s.strip_prefix('-') {
            Some(digits) => (true, digits),
            None => (false, s),
        };
        let abs = U256::from_str(digits)?;
        Ok(Self { negative: negative && !abs.is_zero(), abs })
    }
}

#[derive(Deserialize)]
struct Literal {
    value: serde_json::Value,
    #[serde(rename = "type")]
    ty: String,
}

/// Literal constants extracted from the contract source by the static miner, grouped by the
/// generator category they seed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MinedConstants {
    pub ints: BTreeSet<MinedInt>,
    pub addresses: BTreeSet<Address>,
    pub strings: BTreeSet<String>,
}

impl MinedConstants {
    /// Parses the miner's JSON report.
    ///
    /// Accepts either the printer payload itself (an object with `constants_used`) or the full
    /// report wrapping it in `results.printers[*].description`.
    pub fn from_json(report: &serde_json::Value) -> Result<Self, serde_json::Error> {
        let mut constants = Self::default();
        if let Some(used) = report.get("constants_used") {
            constants.extend_from_used(used)?;
        }
        let printers = report
            .pointer("/results/printers")
            .and_then(|printers| printers.as_array())
            .into_iter()
            .flatten();
        for printer in printers {
            let Some(description) = printer.get("description").and_then(|d| d.as_str()) else {
                continue;
            };
            let payload: serde_json::Value = serde_json::from_str(description)?;
            if let Some(used) = payload.get("constants_used") {
                constants.extend_from_used(used)?;
            }
        }
        debug!(
            target: "chainprop::fuzz",
            ints = constants.ints.len(),
            addresses = constants.addresses.len(),
            strings = constants.strings.len(),
            "mined constants"
        );
        Ok(constants)
    }

    /// Folds a `contract -> function -> [[literal]]` mapping into the pools.
    fn extend_from_used(&mut self, used: &serde_json::Value) -> Result<(), serde_json::Error> {
        type ConstantsUsed = serde_json::Map<String, serde_json::Value>;
        let contracts = ConstantsUsed::deserialize(used)?;
        for functions in contracts.values() {
            let functions = ConstantsUsed::deserialize(functions)?;
            for groups in functions.values() {
                let groups = Vec::<Vec<Literal>>::deserialize(groups)?;
                for literal in groups.into_iter().flatten() {
                    self.insert(literal);
                }
            }
        }
        Ok(())
    }

    fn insert(&mut self, literal: Literal) {
        let text = match &literal.value {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        if literal.ty == "address" {
            // Address literals are reported as integers.
            match text.parse::<MinedInt>() {
                Ok(int) if !int.negative && int.abs.bit_len() <= 160 => {
                    let word = int.abs.to_be_bytes::<32>();
                    self.addresses.insert(Address::from_slice(&word[12..]));
                }
                _ => debug!(target: "chainprop::fuzz", %text, "skipping address literal"),
            }
        } else if literal.ty.contains("int") {
            match text.parse::<MinedInt>() {
                Ok(int) => {
                    self.ints.insert(int);
                }
                Err(err) => debug!(target: "chainprop::fuzz", %text, %err, "skipping int literal"),
            }
        } else if literal.ty == "string" {
            self.strings.insert(text);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.ints.is_empty() && self.addresses.is_empty() && self.strings.is_empty()
    }

    /// Returns `generator` with every integer, address and string leaf replaced by a uniform
    /// choice between the matching constants pool and the original generator.
    ///
    /// Integer pools are filtered to the leaf type's range. Tuples are augmented element-wise;
    /// arrays, booleans and byte types are returned unchanged. A leaf whose pool is empty is
    /// also left unchanged.
    pub fn augment(&self, generator: Generator) -> Generator {
        let pool: Vec<DynSolValue> = match generator {
            Generator::Tuple(inner) => {
                return Generator::Tuple(inner.into_iter().map(|g| self.augment(g)).collect());
            }
            Generator::Uint(bits) => self.int_pool(IntStrategy::unsigned(bits)),
            Generator::Int(bits) => self.int_pool(IntStrategy::signed(bits)),
            Generator::Address => self.addresses.iter().copied().map(DynSolValue::Address).collect(),
            Generator::String => self.strings.iter().cloned().map(DynSolValue::String).collect(),
            _ => return generator,
        };
        if pool.is_empty() {
            return generator;
        }
        Generator::Mined { pool, fallback: Box::new(generator) }
    }

    fn int_pool(&self, strategy: IntStrategy) -> Vec<DynSolValue> {
        self.ints
            .iter()
            .filter(|int| strategy.contains(int.sign(), int.abs))
            .map(|int| strategy.value(int.sign(), int.abs))
            .collect()
    }
}
