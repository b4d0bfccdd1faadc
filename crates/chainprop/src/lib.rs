//! # chainprop
//!
//! Command line entry point: compiles the contract file, starts an anvil node, deploys the
//! harnesses and runs the fuzzing campaign.

#![cfg_attr(not(test), warn(unused_crate_dependencies))]

#[macro_use]
extern crate tracing;

use chainprop_config::FuzzConfig;
use chainprop_fuzz::{
    Campaign, CampaignOutcome, DeploymentResolver, EarlyExit, OperationCatalog,
    strategies::ValueLimits,
};
use chainprop_node::{AnvilSettings, RpcNode, TestNode, TxParams};
use eyre::{Result, WrapErr};
use std::process::ExitCode;
use yansi::Paint;

mod args;
pub use args::Args;

pub mod handler;
pub mod tools;

/// Exit code of an interrupted campaign.
pub const INTERRUPTED_EXIT_CODE: u8 = 130;

/// Installs the global tracing subscriber. Filters are read from `RUST_LOG`, defaulting to
/// warnings.
pub fn subscriber() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    let _ = tracing_subscriber::FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Runs a whole campaign as described by `args`.
///
/// The node process is owned by this function and released on every return path.
pub fn run(args: Args) -> Result<ExitCode> {
    let config = FuzzConfig::load(&args.config)?;

    // A malformed harness is rejected before the node is started.
    let interfaces = tools::compile(&args.contract)
        .wrap_err_with(|| format!("failed to compile {}", args.contract.display()))?;
    let constants = if config.constants_mining {
        Some(tools::mine_constants(&args.contract).wrap_err("failed to mine constants")?)
    } else {
        None
    };

    let settings = AnvilSettings {
        program: args.anvil.clone(),
        port: config.anvil_port,
        chain_id: config.chain_id,
        ..Default::default()
    };
    let instance = settings.spawn()?;
    info!(target: "chainprop", endpoint = %instance.endpoint(), pid = instance.child().id(), "node started");

    let params = TxParams { chain_id: config.chain_id, ..Default::default() };
    let node = RpcNode::new(instance.endpoint(), params)?;
    if !node.is_alive() {
        eyre::bail!("node at {} does not answer", instance.endpoint());
    }

    let early_exit = EarlyExit::new();
    let handle = early_exit.clone();
    ctrlc::set_handler(move || handle.stop()).wrap_err("failed to install the interrupt handler")?;

    let targets = DeploymentResolver::new(&node, &interfaces)
        .attempts(config.deploy_retries)
        .resolve()
        .wrap_err("failed to deploy the test contracts")?;
    let catalog =
        OperationCatalog::build(&targets, &ValueLimits::from(&config), constants.as_ref())?;

    let outcome = Campaign::new(&node, &catalog, &config).with_early_exit(early_exit).run()?;
    println!("{}", summary(&outcome));
    Ok(ExitCode::from(exit_code(&outcome)))
}

/// User-facing description of `outcome`.
pub fn summary(outcome: &CampaignOutcome) -> String {
    match outcome {
        CampaignOutcome::Passed => {
            "No problem found, no invariant was broken".green().to_string()
        }
        CampaignOutcome::Violated(counterexample) => {
            format!("{}\n{counterexample}", "Invariant broken".red().bold())
        }
        CampaignOutcome::Interrupted => {
            "Interrupted, no invariant was broken so far".yellow().to_string()
        }
    }
}

pub fn exit_code(outcome: &CampaignOutcome) -> u8 {
    match outcome {
        CampaignOutcome::Passed => 0,
        CampaignOutcome::Violated(_) => 1,
        CampaignOutcome::Interrupted => INTERRUPTED_EXIT_CODE,
    }
}
