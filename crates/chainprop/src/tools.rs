//! External analysis tools: the compiler front-end and the constant miner.

use chainprop_abi::InterfaceCatalog;
use chainprop_fuzz::strategies::MinedConstants;
use eyre::{Result, WrapErr, eyre};
use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    process::{Command, Output},
};

/// Directory `crytic-compile` writes its exports to, relative to the working directory.
pub const EXPORT_DIR: &str = "crytic-export";

/// Compiles `contract` with `crytic-compile` and loads its interfaces.
pub fn compile(contract: &Path) -> Result<InterfaceCatalog> {
    let mut cmd = Command::new("crytic-compile");
    cmd.arg(contract).args(["--export-format", "standard"]);
    let output = run_tool(&mut cmd, "crytic-compile", "pip install crytic-compile")?;
    if !output.status.success() {
        eyre::bail!(
            "crytic-compile failed with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    read_export(&export_path(contract)?)
}

/// Path of the standard export written for `contract`.
pub fn export_path(contract: &Path) -> Result<PathBuf> {
    let name = contract
        .file_name()
        .ok_or_else(|| eyre!("{} does not name a file", contract.display()))?;
    let mut file = name.to_os_string();
    file.push(".json");
    Ok(Path::new(EXPORT_DIR).join(file))
}

/// Loads the export at `path`, then removes it.
pub fn read_export(path: &Path) -> Result<InterfaceCatalog> {
    let catalog = InterfaceCatalog::load(path);
    if let Err(err) = fs::remove_file(path) {
        debug!(target: "chainprop::abi", ?path, %err, "could not remove compiler export");
    }
    Ok(catalog?)
}

/// Extracts the literal constants of `contract` with slither's echidna printer.
pub fn mine_constants(contract: &Path) -> Result<MinedConstants> {
    let mut cmd = Command::new("slither");
    cmd.arg(contract).args(["--print", "echidna", "--json", "-"]);
    let output = run_tool(&mut cmd, "slither", "pip install slither-analyzer")?;
    // slither may exit with a non-zero status and still print a complete report.
    if output.stdout.is_empty() {
        eyre::bail!(
            "slither failed with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    parse_report(&output.stdout)
}

/// Parses slither's JSON report into constant pools.
pub fn parse_report(stdout: &[u8]) -> Result<MinedConstants> {
    let report: serde_json::Value =
        serde_json::from_slice(stdout).wrap_err("slither printed an invalid JSON report")?;
    MinedConstants::from_json(&report).wrap_err("invalid echidna printer output")
}

fn run_tool(cmd: &mut Command, name: &str, install: &str) -> Result<Output> {
    trace!(target: "chainprop", ?cmd, "running tool");
    match cmd.output() {
        Ok(output) => Ok(output),
        Err(err) if err.kind() == ErrorKind::NotFound => {
            Err(eyre!("`{name}` was not found in PATH, install it with `{install}`"))
        }
        Err(err) => Err(err).wrap_err_with(|| format!("failed to run `{name}`")),
    }
}
