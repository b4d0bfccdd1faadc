use crate::NodeError;
use alloy_node_bindings::Anvil;
use std::{
    io::{self, BufRead, BufReader},
    path::PathBuf,
    time::Duration,
};

pub use alloy_node_bindings::AnvilInstance;

/// How long we will wait for anvil to indicate that it is ready.
pub const ANVIL_STARTUP_TIMEOUT: Duration = Duration::from_secs(10);

/// Settings of the anvil node a campaign runs against.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnvilSettings {
    /// Binary to run instead of the `anvil` found in `PATH`.
    pub program: Option<PathBuf>,
    pub port: u16,
    pub chain_id: u64,
    /// Number of funded dev accounts.
    pub accounts: u32,
    /// Balance of every dev account, in ether.
    pub balance: u64,
    /// Records per-instruction steps so `debug_traceTransaction` returns struct logs.
    pub steps_tracing: bool,
    /// How long to wait for the node to start listening.
    pub timeout: Duration,
}

impl Default for AnvilSettings {
    fn default() -> Self {
        Self {
            program: None,
            port: 8545,
            chain_id: 1,
            accounts: 3,
            balance: 1_000_000,
            steps_tracing: true,
            timeout: ANVIL_STARTUP_TIMEOUT,
        }
    }
}

impl AnvilSettings {
    /// Command line arguments not covered by the [`Anvil`] builder.
    pub fn args(&self) -> Vec<String> {
        let mut args = vec![
            "--accounts".to_string(),
            self.accounts.to_string(),
            "--balance".to_string(),
            self.balance.to_string(),
        ];
        if self.steps_tracing {
            args.push("--steps-tracing".to_string());
        }
        args
    }

    fn program_name(&self) -> String {
        self.program.as_ref().map_or_else(|| "anvil".to_string(), |p| p.display().to_string())
    }

    /// Spawns anvil and waits until it listens. The process is killed when the returned
    /// instance is dropped.
    pub fn spawn(&self) -> Result<AnvilInstance, NodeError> {
        let mut anvil = Anvil::new()
            .port(self.port)
            .chain_id(self.chain_id)
            .args(self.args())
            .timeout(self.timeout.as_millis() as u64)
            .keep_stdout();
        if let Some(program) = &self.program {
            anvil = anvil.path(program.clone());
        }
        trace!(target: "chainprop::node", settings = ?self, "spawning anvil");

        let mut instance = anvil.try_spawn().map_err(|err| match err {
            alloy_node_bindings::NodeError::SpawnError(ref e)
                if e.kind() == io::ErrorKind::NotFound =>
            {
                NodeError::NotFound(self.program_name())
            }
            err => NodeError::Anvil(err),
        })?;

        // Keep draining the pipe so the node never blocks on a full stdout buffer.
        if let Some(stdout) = instance.child_mut().stdout.take() {
            std::thread::spawn(move || {
                for line in BufReader::new(stdout).lines().map_while(Result::ok) {
                    trace!(target: "anvil", %line);
                }
            });
        }

        info!(
            target: "chainprop::node",
            port = instance.port(),
            pid = instance.child().id(),
            "anvil is listening"
        );
        Ok(instance)
    }
}
