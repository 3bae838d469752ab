//! Rule-based demo agents for the three standard roles
//!
//! They answer from fixed tables and simple patterns so the CLI runs
//! without a model backend. All tool use goes through the invoker the
//! supervisor hands them.

use async_trait::async_trait;
use regex::Regex;
use serde_json::json;
use tradeguard_core::{Agent, AgentReply, Context, Error, Result, ToolInvoker, ToolOutcome};
use tradeguard_supervisor::{FAQ_AGENT, MARKET_INSIGHTS_AGENT, TASK_AGENT};

const ORDER_PATTERN: &str =
    r"(?i)\b(buy|sell)\s+(\d+)\s+(?:shares?|contracts?)?\s*(?:of\s+)?\$?([a-z]{1,5})\b";
const TICKER_PATTERN: &str = r"\$?\b([A-Z]{2,5})\b";
const TRADE_INTENT_PATTERN: &str = r"(?i)\b(?:buy|sell|purchase)\b";

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| Error::InitializationFailed(format!("Invalid agent pattern: {e}")))
}

/// Canned answers keyed by topic words
const FAQ_ENTRIES: &[(&[&str], &str)] = &[
    (
        &["fee", "fees", "commission"],
        "Stock and ETF trades are commission free. Options cost $0.65 per contract.",
    ),
    (
        &["deposit", "funding", "fund"],
        "You can fund your account by bank transfer; deposits usually settle in 1-3 business days.",
    ),
    (
        &["withdraw", "withdrawal"],
        "Withdrawals go back to your linked bank account and take 1-3 business days.",
    ),
    (
        &["margin"],
        "Margin accounts need a minimum balance of $2,000 and are subject to maintenance requirements.",
    ),
    (
        &["limit", "market", "order", "orders"],
        "A market order fills at the best available price; a limit order only fills at your price or better.",
    ),
    (
        &["account", "support", "policy"],
        "Account settings and support contacts are under Profile > Help in the app.",
    ),
];

/// Answers platform questions from a fixed table
#[derive(Debug)]
pub struct FaqAgent {
    trade_intent: Regex,
}

impl FaqAgent {
    pub fn new() -> Result<Self> {
        Ok(Self {
            trade_intent: compile(TRADE_INTENT_PATTERN)?,
        })
    }

    fn lookup(input: &str) -> Option<&'static str> {
        let words: Vec<String> = input
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .map(str::to_lowercase)
            .collect();
        FAQ_ENTRIES
            .iter()
            .find(|(topics, _)| words.iter().any(|w| topics.contains(&w.as_str())))
            .map(|(_, answer)| *answer)
    }
}

#[async_trait]
impl Agent for FaqAgent {
    async fn run(&self, input: &str, _context: &Context, _tools: &dyn ToolInvoker) -> Result<AgentReply> {
        if self.trade_intent.is_match(input) {
            return Ok(AgentReply::handoff(format!(
                "This is a trading request, passing it to {TASK_AGENT}."
            )));
        }
        Ok(match Self::lookup(input) {
            Some(answer) => AgentReply::final_answer(answer),
            None => AgentReply::final_answer(
                "I can help with fees, funding, margin, order types, placing orders and market prices.",
            ),
        })
    }

    fn name(&self) -> &str {
        FAQ_AGENT
    }
}

/// An order parsed from free text
#[derive(Debug, Clone, PartialEq, Eq)]
struct OrderRequest {
    tool: String,
    symbol: String,
    quantity: i64,
    order_type: &'static str,
    option_type: Option<&'static str>,
}

impl OrderRequest {
    fn parse(pattern: &Regex, input: &str) -> Option<Self> {
        let caps = pattern.captures(input)?;
        let side = caps[1].to_lowercase();
        let quantity = caps[2].parse().ok()?;
        let symbol = caps[3].to_uppercase();

        let lowered = input.to_lowercase();
        let option_type = if lowered.contains(" call") {
            Some("call")
        } else if lowered.contains(" put") {
            Some("put")
        } else {
            None
        };
        let instrument = if option_type.is_some() || lowered.contains("option") {
            "options"
        } else {
            "stock"
        };
        let order_type = if lowered.contains("limit") { "limit" } else { "market" };

        Some(Self {
            tool: format!("{side}_{instrument}"),
            symbol,
            quantity,
            order_type,
            option_type,
        })
    }

    fn arguments(&self) -> serde_json::Value {
        let mut args = json!({
            "symbol": self.symbol,
            "quantity": self.quantity,
            "order_type": self.order_type,
        });
        if let Some(option_type) = self.option_type {
            args["option_type"] = json!(option_type);
        }
        args
    }
}

/// Places orders described in plain text
#[derive(Debug)]
pub struct TaskAgent {
    order_pattern: Regex,
}

impl TaskAgent {
    pub fn new() -> Result<Self> {
        Ok(Self {
            order_pattern: compile(ORDER_PATTERN)?,
        })
    }
}

#[async_trait]
impl Agent for TaskAgent {
    async fn run(&self, input: &str, _context: &Context, tools: &dyn ToolInvoker) -> Result<AgentReply> {
        let Some(order) = OrderRequest::parse(&self.order_pattern, input) else {
            return Ok(AgentReply::final_answer(
                "Tell me the side, quantity and symbol, for example: Buy 10 shares of AAPL.",
            ));
        };

        let outcome = tools.invoke(&order.tool, order.arguments()).await;
        let draft = match &outcome {
            ToolOutcome::Success { output } => output["message"]
                .as_str()
                .map_or_else(|| output.to_string(), str::to_string),
            other => other.to_message(),
        };
        Ok(AgentReply::final_answer(draft))
    }

    fn name(&self) -> &str {
        TASK_AGENT
    }
}

/// Reports prices for tickers mentioned in the message
#[derive(Debug)]
pub struct MarketInsightsAgent {
    ticker: Regex,
}

impl MarketInsightsAgent {
    pub fn new() -> Result<Self> {
        Ok(Self {
            ticker: compile(TICKER_PATTERN)?,
        })
    }
}

#[async_trait]
impl Agent for MarketInsightsAgent {
    async fn run(&self, input: &str, _context: &Context, tools: &dyn ToolInvoker) -> Result<AgentReply> {
        let Some(symbol) = self.ticker.captures(input).map(|c| c[1].to_string()) else {
            return Ok(AgentReply::final_answer(
                "Which symbol are you interested in? Use the ticker, for example AAPL.",
            ));
        };

        let draft = match tools.invoke("get_quote", json!({ "symbol": symbol })).await {
            ToolOutcome::Success { output } => {
                let price = output["price"].as_f64().unwrap_or_default();
                format!("{symbol} last traded at ${price:.2}. This is market information, not investment advice.")
            }
            other => other.to_message(),
        };
        Ok(AgentReply::final_answer(draft))
    }

    fn name(&self) -> &str {
        MARKET_INSIGHTS_AGENT
    }
}
