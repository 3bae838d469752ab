//! Supervisor configuration

use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::time::Duration;
use tradeguard_utils::ConfigError;
use tradeguard_utils::config::env_parse;

/// Allowed values for `max_hops`
pub const MAX_HOPS_RANGE: RangeInclusive<u32> = 1..=10;

/// Reply used when the input guardrail rejects a message
pub const DEFAULT_REJECTION_MESSAGE: &str =
    "I apologize, but I cannot provide that response due to security policies.";

/// Reply used when a turn cannot produce an answer
pub const DEFAULT_FALLBACK_MESSAGE: &str =
    "I apologize, but I couldn't generate a response. Please try rephrasing your question.";

/// Turn limits and user-facing fallback texts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupervisorConfig {
    /// Agent invocations allowed per turn
    pub max_hops: u32,

    /// Deadline for the agent/tool loop of one turn
    pub turn_timeout: Duration,

    pub rejection_message: String,

    pub fallback_message: String,

    /// Idle time after which `evict_idle` drops a session
    pub session_ttl: Duration,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            max_hops: 5,
            turn_timeout: Duration::from_secs(30),
            rejection_message: DEFAULT_REJECTION_MESSAGE.to_string(),
            fallback_message: DEFAULT_FALLBACK_MESSAGE.to_string(),
            session_ttl: Duration::from_secs(3600),
        }
    }
}

impl SupervisorConfig {
    /// Create a new configuration builder
    pub fn builder() -> SupervisorConfigBuilder {
        SupervisorConfigBuilder::default()
    }

    /// Defaults overridden by `TRADEGUARD_*` environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut builder = Self::builder();
        if let Some(hops) = env_parse("TRADEGUARD_MAX_HOPS")? {
            builder = builder.max_hops(hops);
        }
        if let Some(secs) = env_parse("TRADEGUARD_TURN_TIMEOUT_SECS")? {
            builder = builder.turn_timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = env_parse("TRADEGUARD_SESSION_TTL_SECS")? {
            builder = builder.session_ttl(Duration::from_secs(secs));
        }
        builder.build()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !MAX_HOPS_RANGE.contains(&self.max_hops) {
            return Err(ConfigError::Invalid(format!(
                "max_hops must be between {} and {}, got {}",
                MAX_HOPS_RANGE.start(),
                MAX_HOPS_RANGE.end(),
                self.max_hops
            )));
        }
        if self.turn_timeout.is_zero() {
            return Err(ConfigError::Invalid(
                "turn_timeout must be greater than 0".to_string(),
            ));
        }
        if self.rejection_message.trim().is_empty() || self.fallback_message.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "fallback texts must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for SupervisorConfig
#[derive(Debug, Default)]
pub struct SupervisorConfigBuilder {
    max_hops: Option<u32>,
    turn_timeout: Option<Duration>,
    rejection_message: Option<String>,
    fallback_message: Option<String>,
    session_ttl: Option<Duration>,
}

impl SupervisorConfigBuilder {
    pub fn max_hops(mut self, max_hops: u32) -> Self {
        self.max_hops = Some(max_hops);
        self
    }

    pub fn turn_timeout(mut self, timeout: Duration) -> Self {
        self.turn_timeout = Some(timeout);
        self
    }

    pub fn rejection_message(mut self, message: impl Into<String>) -> Self {
        self.rejection_message = Some(message.into());
        self
    }

    pub fn fallback_message(mut self, message: impl Into<String>) -> Self {
        self.fallback_message = Some(message.into());
        self
    }

    pub fn session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = Some(ttl);
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<SupervisorConfig, ConfigError> {
        let defaults = SupervisorConfig::default();

        let config = SupervisorConfig {
            max_hops: self.max_hops.unwrap_or(defaults.max_hops),
            turn_timeout: self.turn_timeout.unwrap_or(defaults.turn_timeout),
            rejection_message: self
                .rejection_message
                .unwrap_or(defaults.rejection_message),
            fallback_message: self.fallback_message.unwrap_or(defaults.fallback_message),
            session_ttl: self.session_ttl.unwrap_or(defaults.session_ttl),
        };

        config.validate()?;
        Ok(config)
    }
}
