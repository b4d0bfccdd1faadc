use alloy_dyn_abi::DynSolValue;
use alloy_primitives::{I256, Sign, U256};
use proptest::{
    prelude::*,
    strategy::{NewTree, ValueTree},
    test_runner::TestRunner,
};

/// Value tree for integers.
///
/// Shrinks the magnitude toward zero with a binary search, keeping the sign. For a failure that
/// holds for every magnitude above some threshold, this settles on the threshold itself.
#[derive(Clone, Debug)]
pub struct IntValueTree {
    bits: usize,
    signed: bool,
    negative: bool,
    /// Smallest magnitude not yet rejected.
    lo: U256,
    /// Current magnitude.
    curr: U256,
    /// Smallest magnitude known to still fail.
    hi: U256,
}

impl IntValueTree {
    fn new(bits: usize, signed: bool, negative: bool, abs: U256) -> Self {
        Self { bits, signed, negative, lo: U256::ZERO, curr: abs, hi: abs }
    }

    fn reposition(&mut self) -> bool {
        let interval = self.hi - self.lo;
        let new_mid = self.lo + interval / U256::from(2);

        if new_mid == self.curr {
            false
        } else {
            self.curr = new_mid;
            true
        }
    }
}

impl ValueTree for IntValueTree {
    type Value = DynSolValue;

    fn current(&self) -> DynSolValue {
        if self.signed {
            let sign = if self.negative { Sign::Negative } else { Sign::Positive };
            // The magnitude never exceeds 2^(bits - 1), which always fits.
            let (value, _) = I256::overflowing_from_sign_and_abs(sign, self.curr);
            DynSolValue::Int(value, self.bits)
        } else {
            DynSolValue::Uint(self.curr, self.bits)
        }
    }

    fn simplify(&mut self) -> bool {
        if self.hi <= self.lo {
            return false;
        }
        self.hi = self.curr;
        self.reposition()
    }

    fn complicate(&mut self) -> bool {
        if self.hi <= self.lo {
            return false;
        }
        self.lo = self.curr + U256::from(1);
        self.reposition()
    }
}

/// Strategy for `uintN` and `intN` values.
///
/// Generates one of:
/// - an edge value of the type's range, 20% of the time
/// - a value whose magnitude has a random bit length, 80% of the time
///
/// The second case is log-uniform rather than uniform, so small magnitudes get generated as
/// often as large ones.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IntStrategy {
    bits: usize,
    signed: bool,
}

impl IntStrategy {
    /// Strategy for `uint{bits}`.
    pub fn unsigned(bits: usize) -> Self {
        Self { bits: bits.clamp(8, 256), signed: false }
    }

    /// Strategy for `int{bits}`.
    pub fn signed(bits: usize) -> Self {
        Self { bits: bits.clamp(8, 256), signed: true }
    }

    pub fn bits(&self) -> usize {
        self.bits
    }

    pub fn is_signed(&self) -> bool {
        self.signed
    }

    /// Largest positive magnitude of the type.
    fn max_abs(&self) -> U256 {
        let value_bits = if self.signed { self.bits - 1 } else { self.bits };
        if value_bits == 256 { U256::MAX } else { (U256::from(1) << value_bits) - U256::from(1) }
    }

    /// Magnitude of the most negative value. Zero for unsigned types.
    fn min_abs(&self) -> U256 {
        if self.signed { U256::from(1) << (self.bits - 1) } else { U256::ZERO }
    }

    /// Returns `true` if `value` lies in the range of the type.
    pub fn contains(&self, sign: Sign, abs: U256) -> bool {
        if abs.is_zero() {
            return true;
        }
        match sign {
            Sign::Positive => abs <= self.max_abs(),
            Sign::Negative => self.signed && abs <= self.min_abs(),
        }
    }

    /// Returns `(sign, magnitude)` as a value of this type.
    pub fn value(&self, sign: Sign, abs: U256) -> DynSolValue {
        IntValueTree::new(self.bits, self.signed, sign.is_negative(), abs).current()
    }

    fn generate_edge(&self, runner: &mut TestRunner) -> (bool, U256) {
        let max = self.max_abs();
        let one = U256::from(1);
        if self.signed {
            match runner.rng().random_range(0..7) {
                0 => (false, U256::ZERO),
                1 => (false, one),
                2 => (true, one),
                3 => (false, max),
                4 => (false, max - one),
                5 => (true, self.min_abs()),
                _ => (true, self.min_abs() - one),
            }
        } else {
            let abs = match runner.rng().random_range(0..5) {
                0 => U256::ZERO,
                1 => one,
                2 => U256::from(2),
                3 => max - one,
                _ => max,
            };
            (false, abs)
        }
    }

    fn generate_random(&self, runner: &mut TestRunner) -> (bool, U256) {
        let rng = runner.rng();
        let value_bits = if self.signed { self.bits - 1 } else { self.bits };
        let len = rng.random_range(1..=value_bits);
        let raw = U256::from_be_bytes(rng.random::<[u8; 32]>());
        let abs = if len == 256 { raw } else { raw & ((U256::from(1) << len) - U256::from(1)) };
        let negative = self.signed && rng.random::<bool>();
        (negative, abs)
    }
}

impl Strategy for IntStrategy {
    type Tree = IntValueTree;
    type Value = DynSolValue;

    fn new_tree(&self, runner: &mut TestRunner) -> NewTree<Self> {
        let (negative, abs) = if runner.rng().random_ratio(1, 5) {
            self.generate_edge(runner)
        } else {
            self.generate_random(runner)
        };
        Ok(IntValueTree::new(self.bits, self.signed, negative, abs))
    }
}
