//! Agent descriptors

use serde::{Deserialize, Serialize};

pub const FAQ_AGENT: &str = "faq_agent";
pub const TASK_AGENT: &str = "task_agent";
pub const MARKET_INSIGHTS_AGENT: &str = "market_insights_agent";

/// What the supervisor knows about an agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentDescriptor {
    pub name: String,
    /// Tools this agent may call; anything else is rejected
    pub allowed_tools: Vec<String>,
    /// One-line description shown to routers
    pub routing_hint: String,
    /// Lower-case keywords used by the keyword router
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl AgentDescriptor {
    pub fn new(name: impl Into<String>, routing_hint: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            allowed_tools: Vec::new(),
            routing_hint: routing_hint.into(),
            keywords: Vec::new(),
        }
    }

    pub fn with_tools<I, S>(mut self, tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_tools.extend(tools.into_iter().map(Into::into));
        self
    }

    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords
            .extend(keywords.into_iter().map(|k| k.into().to_lowercase()));
        self
    }

    pub fn allows(&self, tool: &str) -> bool {
        self.allowed_tools.iter().any(|t| t == tool)
    }
}

/// Ordered set of agent descriptors, unique by name
#[derive(Debug, Clone, Default)]
pub struct AgentRegistry {
    descriptors: Vec<AgentDescriptor>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a descriptor, replacing any existing one with the same name
    pub fn register(&mut self, descriptor: AgentDescriptor) {
        match self.descriptors.iter_mut().find(|d| d.name == descriptor.name) {
            Some(existing) => *existing = descriptor,
            None => self.descriptors.push(descriptor),
        }
    }

    pub fn get(&self, name: &str) -> Option<&AgentDescriptor> {
        self.descriptors.iter().find(|d| d.name == name)
    }

    pub fn descriptors(&self) -> &[AgentDescriptor] {
        &self.descriptors
    }

    pub fn names(&self) -> Vec<&str> {
        self.descriptors.iter().map(|d| d.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// The three agents of the trading assistant
    pub fn standard() -> Self {
        let mut registry = Self::new();

        registry.register(
            AgentDescriptor::new(
                FAQ_AGENT,
                "Answers questions about the platform: accounts, fees, funding, order types and policies",
            )
            .with_tools(["faq_search"])
            .with_keywords([
                "how do i", "how to", "account", "fee", "fees", "deposit", "withdraw", "password",
                "margin", "support", "policy", "what is a", "commission", "funding",
            ]),
        );

        registry.register(
            AgentDescriptor::new(
                TASK_AGENT,
                "Places buy and sell orders for stocks and options",
            )
            .with_tools([
                "place_order",
                "buy_stock",
                "sell_stock",
                "buy_options",
                "sell_options",
                "get_quote",
            ])
            .with_keywords([
                "buy", "sell", "order", "shares", "purchase", "options", "call", "put",
                "contracts", "place",
            ]),
        );

        registry.register(
            AgentDescriptor::new(
                MARKET_INSIGHTS_AGENT,
                "Provides market analysis, prices, trends and news for stocks",
            )
            .with_tools(["get_quote", "market_search"])
            .with_keywords([
                "price", "quote", "market", "trend", "news", "analysis", "outlook", "earnings",
                "performance", "sector", "forecast",
            ]),
        );

        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_registry() {
        let registry = AgentRegistry::standard();
        assert_eq!(
            registry.names(),
            vec![FAQ_AGENT, TASK_AGENT, MARKET_INSIGHTS_AGENT]
        );
        let task = registry.get(TASK_AGENT).unwrap();
        assert!(task.allows("buy_stock"));
        assert!(task.allows("place_order"));
        assert!(!task.allows("faq_search"));
    }

    #[test]
    fn test_register_replaces() {
        let mut registry = AgentRegistry::new();
        registry.register(AgentDescriptor::new("a", "first"));
        registry.register(AgentDescriptor::new("a", "second").with_keywords(["HELLO"]));
        assert_eq!(registry.len(), 1);
        let a = registry.get("a").unwrap();
        assert_eq!(a.routing_hint, "second");
        assert_eq!(a.keywords, vec!["hello".to_string()]);
    }
}
