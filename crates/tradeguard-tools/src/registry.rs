//! Tool registry for managing and executing available tools

use crate::Tool;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;
use tradeguard_core::{Error, Result};

/// Registry for managing tools
///
/// The registry is the execution side of the tool boundary: it looks a
/// tool up by name and runs it. Callers are expected to have validated the
/// invocation first.
pub struct ToolRegistry {
    tools: RwLock<HashMap<String, Arc<dyn Tool>>>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self {
            tools: RwLock::new(HashMap::new()),
        }
    }
}

impl ToolRegistry {
    /// Create a new tool registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool, replacing any tool with the same name
    pub fn register(&self, tool: Arc<dyn Tool>) {
        let mut tools = self.tools.write().unwrap_or_else(PoisonError::into_inner);
        tools.insert(tool.name().to_string(), tool);
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        let tools = self.tools.read().unwrap_or_else(PoisonError::into_inner);
        tools.get(name).cloned()
    }

    /// Execute a tool by name
    pub async fn execute(&self, name: &str, params: Value) -> Result<Value> {
        let tool = self
            .get(name)
            .ok_or_else(|| Error::ToolNotFound(name.to_string()))?;

        debug!(tool = name, "Executing tool");
        tool.execute(params).await
    }

    /// Names of all registered tools, sorted
    pub fn names(&self) -> Vec<String> {
        let tools = self.tools.read().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<String> = tools.keys().cloned().collect();
        names.sort();
        names
    }

    /// Get the number of registered tools
    pub fn len(&self) -> usize {
        let tools = self.tools.read().unwrap_or_else(PoisonError::into_inner);
        tools.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        let tools = self.tools.read().unwrap_or_else(PoisonError::into_inner);
        tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Instrument, OrderTool, QuoteTool, Side};
    use serde_json::json;

    fn registry() -> ToolRegistry {
        let registry = ToolRegistry::new();
        registry.register(Arc::new(OrderTool::new(Side::Buy, Instrument::Stock)));
        registry.register(Arc::new(QuoteTool::new([("AAPL", 189.5)])));
        registry
    }

    #[test]
    fn test_register_and_list() {
        let registry = registry();
        assert_eq!(registry.len(), 2);
        assert!(!registry.is_empty());
        assert_eq!(registry.names(), vec!["buy_stock", "get_quote"]);
        assert!(registry.get("buy_stock").is_some());
        assert!(registry.get("sell_stock").is_none());
    }

    #[tokio::test]
    async fn test_execute_by_name() {
        let registry = registry();
        let quote = registry
            .execute("get_quote", json!({"symbol": "AAPL"}))
            .await
            .unwrap();
        assert_eq!(quote["price"], 189.5);
    }

    #[test]
    fn test_execute_unknown_tool() {
        let registry = registry();
        let result = tokio_test::block_on(registry.execute("wire_transfer", json!({})));
        assert!(matches!(result, Err(Error::ToolNotFound(name)) if name == "wire_transfer"));
    }
}
