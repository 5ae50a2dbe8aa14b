//! Error types for treewatch.

use thiserror::Error;

/// Errors a host adapter can report while producing the root list.
///
/// None of these ever reach a caller of `NodeRegistry::scan`: a failed scan
/// leaves the registry empty and logs the error instead.
#[derive(Debug, Error)]
pub enum HostAdapterError {
    /// Reading the backing resource failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The host description could not be parsed.
    #[error("Failed to parse host tree: {0}")]
    Parse(#[from] serde_json::Error),

    /// The host returned structurally invalid data (empty or duplicate ids).
    #[error("Malformed host tree: {0}")]
    Malformed(String),

    /// The adapter panicked while producing the root list.
    #[error("Host adapter panicked: {0}")]
    Panicked(String),

    /// The producing side of a channel-backed host went away.
    #[error("Host disconnected: {0}")]
    Disconnected(String),
}

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration sources could not be read or deserialized.
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    /// A value was present but out of range.
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level error type for fallible treewatch operations.
#[derive(Debug, Error)]
pub enum TreewatchError {
    #[error(transparent)]
    Host(#[from] HostAdapterError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Export serialization failed.
    #[error("Failed to serialize export: {0}")]
    Export(serde_json::Error),

    /// An export document could not be parsed.
    #[error("Failed to parse export: {0}")]
    Import(serde_json::Error),

    /// An export document was written by an incompatible format version.
    #[error("Unsupported export version {found} (this build reads {supported}.x)")]
    IncompatibleVersion {
        found: treewatch_types::SchemaVersion,
        supported: u32,
    },
}

/// Result alias used across the crate.
pub type Result<T, E = TreewatchError> = std::result::Result<T, E>;
