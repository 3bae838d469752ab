//! Error types for guardrail construction

use thiserror::Error;
use tradeguard_utils::ConfigError;

/// Result type alias for guardrail construction
pub type Result<T> = std::result::Result<T, GuardrailError>;

/// Errors raised while building guardrails
///
/// Checking content never fails; only loading rule tables or configuration
/// can.
#[derive(Debug, Error)]
pub enum GuardrailError {
    /// A rule pattern does not compile
    #[error("Invalid rule {id}: {source}")]
    InvalidRule {
        id: String,
        #[source]
        source: regex::Error,
    },

    /// Invalid guardrail configuration
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl From<GuardrailError> for tradeguard_core::Error {
    fn from(err: GuardrailError) -> Self {
        tradeguard_core::Error::InitializationFailed(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion() {
        let err = GuardrailError::Config(ConfigError::Invalid("max_orders must be > 0".to_string()));
        let core: tradeguard_core::Error = err.into();
        assert!(matches!(core, tradeguard_core::Error::InitializationFailed(msg) if msg.contains("max_orders")));
    }
}
