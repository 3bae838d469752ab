//! Configuration for the guardrail pipeline

use crate::error::Result;
use serde::{Deserialize, Serialize};
use tradeguard_utils::ConfigError;
use tradeguard_utils::config::env_parse;

/// Tools that place orders and count against the session limit
pub const DEFAULT_ORDER_TOOLS: &[&str] =
    &["place_order", "buy_stock", "sell_stock", "buy_options", "sell_options"];

/// Order tools that trade option contracts
pub const DEFAULT_OPTIONS_TOOLS: &[&str] = &["buy_options", "sell_options"];

/// Guardrail limits and tool classification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardrailConfig {
    /// Smallest quantity an order may carry
    pub min_quantity: i64,

    /// Largest quantity an order may carry
    pub max_quantity: i64,

    /// Orders a single session may place
    pub max_orders_per_session: u32,

    /// Longest accepted user input, in characters
    pub max_input_chars: usize,

    /// Tool names that place orders
    pub order_tools: Vec<String>,

    /// Subset of `order_tools` that require an option type
    pub options_tools: Vec<String>,
}

impl Default for GuardrailConfig {
    fn default() -> Self {
        Self {
            min_quantity: 1,
            max_quantity: 10_000,
            max_orders_per_session: 10,
            max_input_chars: 4_000,
            order_tools: DEFAULT_ORDER_TOOLS.iter().map(|s| (*s).to_string()).collect(),
            options_tools: DEFAULT_OPTIONS_TOOLS.iter().map(|s| (*s).to_string()).collect(),
        }
    }
}

impl GuardrailConfig {
    /// Create a new configuration builder
    pub fn builder() -> GuardrailConfigBuilder {
        GuardrailConfigBuilder::default()
    }

    /// Defaults overridden by `TRADEGUARD_*` environment variables
    pub fn from_env() -> Result<Self> {
        let mut builder = Self::builder();
        if let Some(max) = env_parse("TRADEGUARD_MAX_QUANTITY")? {
            builder = builder.max_quantity(max);
        }
        if let Some(max) = env_parse("TRADEGUARD_MAX_ORDERS_PER_SESSION")? {
            builder = builder.max_orders_per_session(max);
        }
        if let Some(max) = env_parse("TRADEGUARD_MAX_INPUT_CHARS")? {
            builder = builder.max_input_chars(max);
        }
        builder.build()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.min_quantity < 1 {
            return Err(ConfigError::Invalid("min_quantity must be at least 1".to_string()).into());
        }
        if self.max_quantity < self.min_quantity {
            return Err(ConfigError::Invalid(
                "max_quantity must not be below min_quantity".to_string(),
            )
            .into());
        }
        if self.max_orders_per_session == 0 {
            return Err(ConfigError::Invalid(
                "max_orders_per_session must be greater than 0".to_string(),
            )
            .into());
        }
        if let Some(tool) = self
            .options_tools
            .iter()
            .find(|t| !self.order_tools.contains(t))
        {
            return Err(ConfigError::Invalid(format!(
                "options tool {tool} is not an order tool"
            ))
            .into());
        }
        Ok(())
    }

    pub fn is_order_tool(&self, tool: &str) -> bool {
        self.order_tools.iter().any(|t| t == tool)
    }

    pub fn is_options_tool(&self, tool: &str) -> bool {
        self.options_tools.iter().any(|t| t == tool)
    }
}

/// Builder for GuardrailConfig
#[derive(Debug, Default)]
pub struct GuardrailConfigBuilder {
    min_quantity: Option<i64>,
    max_quantity: Option<i64>,
    max_orders_per_session: Option<u32>,
    max_input_chars: Option<usize>,
    order_tools: Option<Vec<String>>,
    options_tools: Option<Vec<String>>,
}

impl GuardrailConfigBuilder {
    pub fn min_quantity(mut self, min: i64) -> Self {
        self.min_quantity = Some(min);
        self
    }

    pub fn max_quantity(mut self, max: i64) -> Self {
        self.max_quantity = Some(max);
        self
    }

    pub fn max_orders_per_session(mut self, max: u32) -> Self {
        self.max_orders_per_session = Some(max);
        self
    }

    pub fn max_input_chars(mut self, max: usize) -> Self {
        self.max_input_chars = Some(max);
        self
    }

    /// Replace the list of order-placing tools
    pub fn order_tools<I, S>(mut self, tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.order_tools = Some(tools.into_iter().map(Into::into).collect());
        self
    }

    /// Replace the list of options tools
    pub fn options_tools<I, S>(mut self, tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options_tools = Some(tools.into_iter().map(Into::into).collect());
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<GuardrailConfig> {
        let defaults = GuardrailConfig::default();

        let config = GuardrailConfig {
            min_quantity: self.min_quantity.unwrap_or(defaults.min_quantity),
            max_quantity: self.max_quantity.unwrap_or(defaults.max_quantity),
            max_orders_per_session: self
                .max_orders_per_session
                .unwrap_or(defaults.max_orders_per_session),
            max_input_chars: self.max_input_chars.unwrap_or(defaults.max_input_chars),
            order_tools: self.order_tools.unwrap_or(defaults.order_tools),
            options_tools: self.options_tools.unwrap_or(defaults.options_tools),
        };

        config.validate()?;
        Ok(config)
    }
}
