use std::path::PathBuf;

/// Errors raised while loading and classifying the contract interfaces.
#[derive(Debug, thiserror::Error)]
pub enum InterfaceError {
    /// A function named `invariant*` does not have the shape of an invariant. This aborts the
    /// whole run: the test contract itself is broken.
    #[error("{contract}.{function} {reason}")]
    MalformedInvariant { contract: String, function: String, reason: &'static str },
    #[error("no contract named `{0}` in the compiler output")]
    UnknownContract(String),
    #[error("compiler output contains no compilation unit")]
    NoCompilationUnit,
    #[error("compilation unit `{0}` contains no contracts")]
    NoContracts(String),
    #[error("invalid creation bytecode for `{contract}`: {source}")]
    Bytecode {
        contract: String,
        #[source]
        source: alloy_primitives::hex::FromHexError,
    },
    #[error("failed to read compiler output {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("unsupported parameter type `{ty}` in {contract}.{function}: {reason}")]
    UnsupportedType { contract: String, function: String, ty: String, reason: String },
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
