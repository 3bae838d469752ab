//! The contract every order and quote tool implements

use async_trait::async_trait;
use serde_json::Value;
use tradeguard_core::Result;

/// An action the trading assistant can take on a user's behalf
///
/// Implementors place orders or look up prices. They are registered in a
/// [`ToolRegistry`](crate::ToolRegistry) and only ever run after the tool
/// guardrail has allowed the call, so `execute` receives arguments that
/// are already normalized: symbol upper-cased, `order_type` lower-cased
/// and defaulted to `market` for order tools.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Carry out the call and report what happened
    ///
    /// Order tools answer with a confirmation object carrying a `message`
    /// such as `Order placed: Buy 50 shares of AAPL (market order)`. Quote
    /// tools answer with the symbol and its last price. Arguments that do
    /// not fit [`input_schema`](Tool::input_schema) fail with
    /// `Error::InvalidArguments`.
    async fn execute(&self, params: Value) -> Result<Value>;

    /// Name agents use to call the tool, e.g. `buy_stock` or `get_quote`
    ///
    /// Guardrail configuration and agent tool lists refer to this name, so
    /// it must be unique within a registry.
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON Schema of the accepted arguments
    fn input_schema(&self) -> Value;
}
