//! Error types for tradeguard-core

use thiserror::Error;

/// Result type alias for tradeguard-core
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for agent, tool and routing operations
#[derive(Error, Debug)]
pub enum Error {
    /// Generic error message
    #[error("{0}")]
    Generic(String),

    /// Component initialization failed
    #[error("Initialization failed: {0}")]
    InitializationFailed(String),

    /// Agent processing failed
    #[error("Agent processing failed: {0}")]
    ProcessingFailed(String),

    /// No tool registered under this name
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// Tool arguments could not be decoded
    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),

    /// The routing decision mechanism failed
    #[error("Routing failed: {0}")]
    Routing(String),

    /// Invalid configuration value
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::InvalidArguments(err.to_string())
    }
}
