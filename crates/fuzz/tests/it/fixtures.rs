//! Scripted test contracts and their compiler output.

use crate::node::{Chain, Script, encode_address, encode_bool, selector, split, word};
use alloy_primitives::{Address, U256};
use chainprop_abi::{CompilerOutput, InterfaceCatalog, InterfaceError};
use serde_json::{Value, json};

/// A contract as the compiler would export it.
pub struct Contract {
    pub name: &'static str,
    pub bin: &'static str,
    pub abi: Vec<Value>,
}

fn param(ty: &str) -> Value {
    match ty.strip_prefix("contract ") {
        Some(_) => json!({ "name": "", "type": "address", "internalType": ty }),
        None => json!({ "name": "", "type": ty, "internalType": ty }),
    }
}

fn function(name: &str, inputs: &[&str], outputs: &[&str], mutability: &str) -> Value {
    json!({
        "type": "function",
        "name": name,
        "inputs": inputs.iter().map(|ty| param(ty)).collect::<Vec<_>>(),
        "outputs": outputs.iter().map(|ty| param(ty)).collect::<Vec<_>>(),
        "stateMutability": mutability,
    })
}

fn setup() -> Value {
    function("setUp", &[], &[], "nonpayable")
}

fn invariant(name: &str) -> Value {
    function(name, &[], &["bool"], "view")
}

/// Builds the compiler output of `contracts`, preserving their order.
pub fn output(contracts: &[Contract]) -> CompilerOutput {
    let entries = contracts
        .iter()
        .map(|c| format!(r#""{}":{{"abi":{},"bin":"{}"}}"#, c.name, Value::from(c.abi.clone()), c.bin))
        .collect::<Vec<_>>()
        .join(",");
    let document = format!(
        r#"{{"compilation_units":{{"test.sol":{{"contracts":{{"test.sol":{{{entries}}}}}}}}}}}"#
    );
    CompilerOutput::from_slice(document.as_bytes()).unwrap()
}

pub fn catalog(contracts: &[Contract]) -> Result<InterfaceCatalog, InterfaceError> {
    InterfaceCatalog::from_output(&output(contracts))
}

fn unknown(selector: [u8; 4]) -> String {
    format!("unknown selector {}", alloy_primitives::hex::encode(selector))
}

/// Scenario A: two functions and an invariant that always holds.
pub fn always_true() -> Contract {
    Contract {
        name: "AlwaysTrue",
        bin: "a1",
        abi: vec![
            setup(),
            function("inc", &["uint256"], &[], "nonpayable"),
            function("dec", &["uint8"], &[], "nonpayable"),
            invariant("invariant_alwaysTrue"),
        ],
    }
}

pub const ALWAYS_TRUE: Script = Script {
    transact: |chain, this, input| {
        let (sel, args) = split(input);
        if sel == selector("setUp()") {
            Ok(vec![0])
        } else if sel == selector("inc(uint256)") {
            let value = chain.load(this, "value").wrapping_add(word(args, 0));
            chain.store(this, "value", value);
            Ok(vec![1, 2])
        } else if sel == selector("dec(uint8)") {
            let x = word(args, 0);
            let value = chain.load(this, "value").wrapping_sub(x);
            chain.store(this, "value", value);
            Ok(if x > U256::from(5) { vec![3, 4] } else { vec![3, 5] })
        } else {
            Err(unknown(sel))
        }
    },
    call: |_, _, input| {
        let (sel, _) = split(input);
        if sel == selector("invariant_alwaysTrue()") { Ok(encode_bool(true)) } else { Err(unknown(sel)) }
    },
};

/// The argument above which [`threshold`] breaks its invariant.
pub const THRESHOLD: u64 = 100;

/// Scenario B: `poke` with an argument above [`THRESHOLD`] breaks the invariant.
pub fn threshold() -> Contract {
    Contract {
        name: "Threshold",
        bin: "b1",
        abi: vec![
            setup(),
            function("poke", &["uint256"], &[], "nonpayable"),
            function("note", &["bool"], &[], "nonpayable"),
            invariant("invariant_belowThreshold"),
        ],
    }
}

pub const THRESHOLD_SCRIPT: Script = Script {
    transact: |chain, this, input| {
        let (sel, args) = split(input);
        if sel == selector("setUp()") {
            Ok(vec![0])
        } else if sel == selector("poke(uint256)") {
            if word(args, 0) > U256::from(THRESHOLD) {
                chain.store(this, "broken", U256::from(1));
                return Ok(vec![10, 11]);
            }
            Ok(vec![10, 12])
        } else if sel == selector("note(bool)") {
            let notes = chain.load(this, "notes") + U256::from(1);
            chain.store(this, "notes", notes);
            Ok(vec![20])
        } else {
            Err(unknown(sel))
        }
    },
    call: |chain, this, input| {
        let (sel, _) = split(input);
        if sel == selector("invariant_belowThreshold()") {
            Ok(encode_bool(chain.load(this, "broken").is_zero()))
        } else {
            Err(unknown(sel))
        }
    },
};

/// `arm` above this value opens the [`gate`].
pub const ARM_THRESHOLD: u64 = 50;

/// `fire` above this value breaks the invariant of an open [`gate`].
pub const FIRE_THRESHOLD: u64 = 10;

/// Scenario D: only `arm` followed by `fire`, both with large enough arguments, breaks the
/// invariant.
pub fn gate() -> Contract {
    Contract {
        name: "Gate",
        bin: "6a",
        abi: vec![
            setup(),
            function("arm", &["uint256"], &[], "nonpayable"),
            function("fire", &["uint256"], &[], "nonpayable"),
            invariant("invariant_closed"),
        ],
    }
}

pub const GATE: Script = Script {
    transact: |chain, this, input| {
        let (sel, args) = split(input);
        if sel == selector("setUp()") {
            Ok(vec![0])
        } else if sel == selector("arm(uint256)") {
            if word(args, 0) > U256::from(ARM_THRESHOLD) {
                chain.store(this, "armed", U256::from(1));
                return Ok(vec![30, 31]);
            }
            Ok(vec![30, 32])
        } else if sel == selector("fire(uint256)") {
            if chain.load(this, "armed").is_zero() {
                return Ok(vec![40, 42]);
            }
            if word(args, 0) > U256::from(FIRE_THRESHOLD) {
                chain.store(this, "broken", U256::from(1));
                return Ok(vec![40, 41]);
            }
            Ok(vec![40, 43])
        } else {
            Err(unknown(sel))
        }
    },
    call: |chain, this, input| {
        let (sel, _) = split(input);
        if sel == selector("invariant_closed()") {
            Ok(encode_bool(chain.load(this, "broken").is_zero()))
        } else {
            Err(unknown(sel))
        }
    },
};

/// The running total of [`counter`] must stay below this bound.
pub const COUNTER_BOUND: u64 = 1000;

/// Accumulates its arguments. Overflowing additions revert.
pub fn counter() -> Contract {
    Contract {
        name: "Counter",
        bin: "c1",
        abi: vec![
            setup(),
            function("add", &["uint256"], &[], "nonpayable"),
            invariant("invariant_bounded"),
        ],
    }
}

pub const COUNTER: Script = Script {
    transact: |chain, this, input| {
        let (sel, args) = split(input);
        if sel == selector("setUp()") {
            Ok(vec![0])
        } else if sel == selector("add(uint256)") {
            let total = chain
                .load(this, "total")
                .checked_add(word(args, 0))
                .ok_or_else(|| "overflow".to_string())?;
            chain.store(this, "total", total);
            Ok(vec![1])
        } else {
            Err(unknown(sel))
        }
    },
    call: |chain, this, input| {
        let (sel, _) = split(input);
        if sel == selector("invariant_bounded()") {
            Ok(encode_bool(chain.load(this, "total") < U256::from(COUNTER_BOUND)))
        } else {
            Err(unknown(sel))
        }
    },
};

/// Invariants that fail without any call: one returns false, the other reverts.
pub fn broken(name: &'static str, bin: &'static str, invariant_name: &str) -> Contract {
    Contract {
        name,
        bin,
        abi: vec![setup(), function("touch", &["uint256"], &[], "nonpayable"), invariant(invariant_name)],
    }
}

pub const NEVER_HOLDS: Script = Script {
    transact: |_, _, _| Ok(vec![0]),
    call: |_, _, _| Ok(encode_bool(false)),
};

pub const REVERTS: Script = Script {
    transact: |_, _, _| Ok(vec![0]),
    call: |_, _, _| Err("boom".to_string()),
};

/// A harness whose `setUp` creates a [`token`] and exposes it through a getter.
pub fn harness() -> Contract {
    Contract {
        name: "Harness",
        bin: "f1",
        abi: vec![
            setup(),
            function("token", &[], &["contract Token"], "view"),
            function("owner", &[], &["address"], "view"),
            invariant("invariant_supplyCapped"),
        ],
    }
}

pub fn token() -> Contract {
    Contract {
        name: "Token",
        bin: "f2",
        abi: vec![
            function("mint", &["uint256"], &[], "nonpayable"),
            function("supply", &[], &["uint256"], "view"),
        ],
    }
}

pub const HARNESS: Script = Script {
    transact: |chain, this, input| {
        let (sel, _) = split(input);
        if sel == selector("setUp()") {
            let token = chain.create(TOKEN);
            chain.store(this, "token", U256::from_be_slice(token.as_slice()));
            Ok(vec![0])
        } else {
            Err(unknown(sel))
        }
    },
    call: |chain, this, input| {
        let (sel, _) = split(input);
        let token = Address::from_slice(&chain.load(this, "token").to_be_bytes::<32>()[12..]);
        if sel == selector("token()") {
            Ok(encode_address(token))
        } else if sel == selector("owner()") {
            Ok(encode_address(Address::ZERO))
        } else if sel == selector("invariant_supplyCapped()") {
            Ok(encode_bool(chain.load(token, "supply") <= U256::from(u128::MAX)))
        } else {
            Err(unknown(sel))
        }
    },
};

pub const TOKEN: Script = Script {
    transact: |chain, this, input| {
        let (sel, args) = split(input);
        if sel == selector("mint(uint256)") {
            let supply = chain.load(this, "supply").saturating_add(word(args, 0));
            chain.store(this, "supply", supply);
            Ok(vec![7])
        } else {
            Err(unknown(sel))
        }
    },
    call: |chain: &Chain, this, input| {
        let (sel, _) = split(input);
        if sel == selector("supply()") {
            Ok(chain.load(this, "supply").to_be_bytes::<32>().to_vec())
        } else {
            Err(unknown(sel))
        }
    },
};

/// Scenario C: an invariant with two return values.
pub fn malformed() -> Contract {
    Contract {
        name: "Malformed",
        bin: "99",
        abi: vec![setup(), function("invariant_two", &[], &["bool", "bool"], "view")],
    }
}
