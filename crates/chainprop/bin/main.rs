//! The `chainprop` CLI: stateful invariant fuzzing of smart contracts on a local anvil node.

use clap::Parser;
use std::process::ExitCode;
use yansi::Paint;

fn main() -> ExitCode {
    chainprop::handler::install();
    chainprop::subscriber();

    let args = chainprop::Args::parse();
    match chainprop::run(args) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{} {err:?}", "Error:".red().bold());
            ExitCode::FAILURE
        }
    }
}
