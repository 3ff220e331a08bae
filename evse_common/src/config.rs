//! Configuration error type shared by the workspace loaders.

use thiserror::Error;

/// Error type for configuration loading operations.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Config file could not be read.
    #[error("config file not found: {0}")]
    FileNotFound(String),

    /// TOML syntax error.
    #[error("config parse error: {0}")]
    Parse(String),

    /// Semantic validation failed.
    #[error("config validation: {0}")]
    Validation(String),
}
