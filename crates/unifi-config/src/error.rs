//! Configuration error types.

use thiserror::Error;

/// Result type alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors that can occur while resolving stack parameters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A parameter without a default was absent from every source.
    #[error("missing required parameter `{key}` (set it in the stack file or via {env})")]
    MissingRequired { key: String, env: String },

    /// A downstream consumer asked for a key that was never resolved.
    #[error("parameter `{0}` is not part of the resolved configuration")]
    Unresolved(String),

    #[error("invalid duration `{value}` for `{field}`")]
    InvalidDuration { field: String, value: String },

    #[error("invalid override `{0}`, expected key=value")]
    InvalidOverride(String),
}
