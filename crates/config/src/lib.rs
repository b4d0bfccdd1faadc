//! # chainprop-config
//!
//! Campaign configuration.
//!
//! Values are layered through [`figment`]: built-in defaults, then the YAML configuration file,
//! then `CHAINPROP_*` environment variables.

#![cfg_attr(not(test), warn(unused_crate_dependencies))]

#[macro_use]
extern crate tracing;

use figment::{
    Figment, Provider,
    providers::{Env, Format, Serialized, Yaml},
};
use serde::{Deserialize, Serialize};
use std::path::Path;

mod error;
pub use error::ConfigError;

/// Default configuration file name, resolved against the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";

/// Prefix of the environment variables overriding file values.
pub const ENV_PREFIX: &str = "CHAINPROP_";

/// Options of a fuzzing campaign.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FuzzConfig {
    /// Number of trials (generated call sequences) to execute.
    pub fuzz_runs: u32,
    /// Maximum number of calls in a sequence.
    pub seq_len: u32,
    /// Minimize the failing sequence before reporting it.
    pub shrinking: bool,
    /// Restrict each trial to a random subset of the operations.
    pub swarm_testing: bool,
    /// Seed scalar generators with literals mined from the contract source.
    pub constants_mining: bool,
    /// Trace every call and bias the search toward recently discovered program points.
    pub coverage_guidance: bool,
    /// Draw a per-trial minimum sequence length instead of always allowing a single call.
    pub favor_long_sequence: bool,
    /// Port the test node listens on.
    pub anvil_port: u16,
    /// Chain id the test node runs with and deployment transactions are signed for.
    pub chain_id: u64,
    /// Optional seed for the campaign RNG.
    pub seed: Option<u64>,
    /// Maximum number of sequence re-executions spent on shrinking.
    pub shrink_run_limit: u32,
    /// Attempts at resolving the deployment before giving up.
    pub deploy_retries: u32,
    /// Maximum length of generated `bytes` and `string` values.
    pub max_dynamic_len: usize,
    /// Maximum length of generated dynamic arrays.
    pub max_array_len: usize,
}

impl Default for FuzzConfig {
    fn default() -> Self {
        Self {
            fuzz_runs: 100,
            seq_len: 10,
            shrinking: true,
            swarm_testing: false,
            constants_mining: false,
            coverage_guidance: false,
            favor_long_sequence: false,
            anvil_port: 8545,
            chain_id: 1,
            seed: None,
            shrink_run_limit: 5000,
            deploy_retries: 100,
            max_dynamic_len: 64,
            max_array_len: 16,
        }
    }
}

impl FuzzConfig {
    /// Returns the layered [`Figment`] for the configuration file at `path`.
    ///
    /// A missing file contributes nothing; defaults and environment still apply.
    pub fn figment(path: impl AsRef<Path>) -> Figment {
        Figment::from(Serialized::defaults(Self::default()))
            .merge(Yaml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX))
    }

    /// Loads and validates the configuration from `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            warn!(target: "chainprop::config", ?path, "configuration file not found, using defaults");
        }
        Self::try_from(Self::figment(path))
    }

    /// Extracts a configuration from any figment `provider`, then validates it.
    pub fn try_from<T: Provider>(provider: T) -> Result<Self, ConfigError> {
        let config: Self = Figment::from(provider).extract().map_err(ConfigError::Extract)?;
        config.validate()?;
        trace!(target: "chainprop::config", ?config, "loaded configuration");
        Ok(config)
    }

    /// Rejects values that leave nothing to run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |field, reason| Err(ConfigError::Invalid { field, reason });
        if self.fuzz_runs == 0 {
            return invalid("fuzz_runs", "must be at least 1");
        }
        if self.seq_len == 0 {
            return invalid("seq_len", "must be at least 1");
        }
        if self.max_dynamic_len == 0 {
            return invalid("max_dynamic_len", "must be at least 1");
        }
        if self.deploy_retries == 0 {
            return invalid("deploy_retries", "must be at least 1");
        }
        Ok(())
    }

    /// Maximum sequence length as a `usize`.
    pub fn max_sequence_len(&self) -> usize {
        self.seq_len as usize
    }
}
