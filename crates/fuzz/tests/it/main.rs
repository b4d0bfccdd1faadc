mod executor;
mod fixtures;
mod node;

use chainprop_fuzz::{DeploymentResolver, OperationCatalog, strategies::ValueLimits};
use fixtures::Contract;
use node::ScriptedNode;

/// Initializes tracing for tests.
pub fn init_tracing() {
    let _ = tracing_subscriber::FmtSubscriber::builder()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

/// Deploys `contracts` on `node` and builds their operation catalog.
pub fn deploy(node: &ScriptedNode, contracts: &[Contract]) -> OperationCatalog {
    init_tracing();
    let interfaces = fixtures::catalog(contracts).unwrap();
    let targets = DeploymentResolver::new(node, &interfaces).resolve().unwrap();
    OperationCatalog::build(&targets, &ValueLimits::default(), None).unwrap()
}
