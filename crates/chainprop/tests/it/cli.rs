use chainprop::{Args, tools};
use clap::Parser;
use std::{ffi::OsStr, fs};

const EXPORT: &str = r#"{
  "compilation_units": {
    "Vault.sol": {
      "contracts": {
        "Vault.sol": {
          "Vault": {
            "abi": [
              {"type":"function","name":"setUp","inputs":[],"outputs":[],"stateMutability":"nonpayable"},
              {"type":"function","name":"deposit","inputs":[{"name":"amount","type":"uint256","internalType":"uint256"}],"outputs":[],"stateMutability":"nonpayable"},
              {"type":"function","name":"invariant_solvent","inputs":[],"outputs":[{"name":"","type":"bool","internalType":"bool"}],"stateMutability":"view"}
            ],
            "bin": "6080"
          }
        }
      }
    }
  }
}"#;

#[test]
fn compiler_export_is_removed_after_loading() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("Vault.sol.json");
    fs::write(&path, EXPORT).unwrap();

    let catalog = tools::read_export(&path).unwrap();
    assert_eq!(catalog.len(), 1);
    assert!(catalog.get("Vault").unwrap().has_setup());
    assert!(!path.exists());
}

#[test]
fn malformed_export_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("Vault.sol.json");
    fs::write(&path, "{\"compilation_units\": 3}").unwrap();
    assert!(tools::read_export(&path).is_err());
    assert!(!path.exists());
}

#[test]
fn invalid_config_stops_before_compiling() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.yaml");
    fs::write(&config, "fuzz_runs: 0\n").unwrap();

    let contract = dir.path().join("Vault.sol");
    let args = Args::try_parse_from([
        OsStr::new("chainprop"),
        contract.as_os_str(),
        config.as_os_str(),
    ])
    .unwrap();
    let err = chainprop::run(args).unwrap_err();
    similar_asserts::assert_eq!(
        err.to_string(),
        "invalid configuration value for `fuzz_runs`: must be at least 1"
    );
}
