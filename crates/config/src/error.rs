//! Configuration errors.

/// Represents a failed attempt to build a [`FuzzConfig`](crate::FuzzConfig).
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// The layered figment could not be deserialized.
    #[error("failed to extract configuration: {0}")]
    Extract(#[source] figment::Error),
    /// A value deserialized fine but cannot drive a campaign.
    #[error("invalid configuration value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: &'static str },
}
