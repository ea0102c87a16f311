//! Error types for yarals-core.
//!
//! This module defines the canonical error type for the library. Protocol
//! failures that are answered on the wire are modelled separately as
//! [`JsonRpcError`](crate::rpc::JsonRpcError) values; this type covers
//! everything that travels through `?`.

use std::path::PathBuf;

/// The main error type for yarals-core operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed message framing (bad header, short payload).
    ///
    /// Fatal to the connection it occurred on.
    #[error("framing error: {0}")]
    Framing(String),

    /// A URI could not be turned into a filesystem path.
    #[error("invalid URI: {0}")]
    InvalidUri(String),

    /// A compiler result line did not have the `line <N>: <message>` shape.
    #[error("malformed compiler result: {0}")]
    ResultParse(String),

    /// An external capability is not installed or configured.
    #[error("capability unavailable: {0}")]
    CapabilityUnavailable(String),

    /// An external capability failed while serving a request.
    #[error("capability failed: {0}")]
    Delegate(String),

    /// The rule compiler did not finish in time.
    #[error("compiler timed out after {0} seconds")]
    Timeout(u64),

    /// The rule compiler process could not be started.
    #[error("failed to spawn compiler '{command}': {source}")]
    CompilerSpawnFailed {
        /// Command that failed to spawn.
        command: String,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The listener could not bind its endpoint.
    #[error("failed to bind {address}: {source}")]
    Bind {
        /// Endpoint that was requested.
        address: String,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Configuration file not found.
    #[error("configuration file not found: {0}")]
    ConfigNotFound(PathBuf),

    /// Invalid configuration values.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing error.
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization error.
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

/// A specialized Result type for yarals-core operations.
pub type Result<T> = std::result::Result<T, Error>;
