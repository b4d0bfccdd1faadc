/// Errors returned by the test node or while managing its process.
#[derive(Debug, thiserror::Error)]
pub enum NodeError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("node returned error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("invalid response to `{method}`: {source}")]
    Decode {
        method: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("transaction {0} not found")]
    TransactionNotFound(alloy_primitives::TxHash),
    #[error("block not found")]
    BlockNotFound,
    #[error("receipt of {0} carries no contract address")]
    MissingContractAddress(alloy_primitives::TxHash),
    #[error("failed to sign transaction: {0}")]
    Signer(#[from] alloy_signer::Error),
    #[error("`{0}` was not found in PATH, install it from https://github.com/foundry-rs/foundry")]
    NotFound(String),
    #[error("could not start anvil: {0}")]
    Anvil(#[source] alloy_node_bindings::NodeError),
}

impl NodeError {
    /// Returns `true` for errors caused by the node lagging behind its own state, such as a
    /// transaction or block that is not visible yet. These are retried or tolerated, never
    /// reported.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::TransactionNotFound(_) | Self::BlockNotFound => true,
            Self::Rpc { message, .. } => {
                let message = message.to_lowercase();
                message.contains("not found")
                    && ["block", "header", "transaction"].iter().any(|kind| message.contains(kind))
            }
            _ => false,
        }
    }

    /// Returns `true` if the node rejected a call or transaction because execution reverted.
    pub fn is_revert(&self) -> bool {
        matches!(self, Self::Rpc { message, .. } if message.to_lowercase().contains("revert"))
    }

    /// Returns `true` for errors about the node process itself rather than a request.
    pub fn is_resource(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::Anvil(_))
    }
}
