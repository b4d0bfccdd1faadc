use chainprop_config::DEFAULT_CONFIG_FILE;
use clap::Parser;
use std::path::PathBuf;

/// Stateful invariant fuzzer for smart contracts.
///
/// Compiles the contract file, deploys every harness exposing `setUp` on a fresh anvil node and
/// calls random sequences of their functions, checking every `invariant*` function after each
/// call.
#[derive(Clone, Debug, Parser)]
#[command(name = "chainprop", version, about, long_about = None)]
pub struct Args {
    /// Solidity file declaring the test harnesses.
    #[arg(value_name = "CONTRACT")]
    pub contract: PathBuf,

    /// YAML configuration file.
    #[arg(value_name = "CONFIG", default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Path to the anvil binary, instead of the one found in PATH.
    #[arg(long, value_name = "PATH", env = "CHAINPROP_ANVIL")]
    pub anvil: Option<PathBuf>,
}
