//! Error types for mcast-relay.

use thiserror::Error;

/// Errors that can occur while setting up or running a forwarder.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Network I/O error.
    #[error("network error: {0}")]
    Network(#[from] std::io::Error),

    /// Interface not found or carries no usable IPv4 address.
    #[error("interface not found: {0}")]
    InterfaceNotFound(String),

    /// Failed to parse a DNS message.
    #[error("failed to parse DNS message: {0}")]
    Parse(String),

    /// YAML parsing error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Result type alias for mcast-relay operations.
pub type Result<T> = std::result::Result<T, Error>;
