//! Order-placing trading tools
//!
//! These tools stand in for a brokerage connection: they decode the order,
//! assign an order id and return a confirmation. `buy_stock`, `sell_stock`,
//! `buy_options` and `sell_options` are all instances of [`OrderTool`];
//! [`PlaceOrderTool`] is the generic `place_order` entry point that takes the
//! side as an argument.

use crate::Tool;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;
use tradeguard_core::{Error, Result};
use uuid::Uuid;

/// Direction of an order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    fn as_str(self) -> &'static str {
        match self {
            Self::Buy => "buy",
            Self::Sell => "sell",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "buy" => Some(Self::Buy),
            "sell" => Some(Self::Sell),
            _ => None,
        }
    }
}

/// What is being traded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instrument {
    Stock,
    Options,
}

impl Instrument {
    fn as_str(self) -> &'static str {
        match self {
            Self::Stock => "stock",
            Self::Options => "options",
        }
    }
}

#[derive(Debug, Deserialize)]
struct OrderParams {
    symbol: String,
    quantity: u32,
    #[serde(default, alias = "orderType")]
    order_type: Option<String>,
    #[serde(default)]
    option_type: Option<String>,
}

/// Tool that places a buy or sell order for stock or option contracts
pub struct OrderTool {
    side: Side,
    instrument: Instrument,
    name: String,
    description: String,
}

impl OrderTool {
    /// Create the tool for one side/instrument combination
    pub fn new(side: Side, instrument: Instrument) -> Self {
        let name = format!("{}_{}", side.as_str(), instrument.as_str());
        let description = match instrument {
            Instrument::Stock => format!("{} shares of a stock", capitalize(side.as_str())),
            Instrument::Options => format!(
                "{} call or put option contracts on a stock",
                capitalize(side.as_str())
            ),
        };
        Self {
            side,
            instrument,
            name,
            description,
        }
    }

    /// All four order tools
    pub fn all() -> Vec<Self> {
        vec![
            Self::new(Side::Buy, Instrument::Stock),
            Self::new(Side::Sell, Instrument::Stock),
            Self::new(Side::Buy, Instrument::Options),
            Self::new(Side::Sell, Instrument::Options),
        ]
    }

    fn confirmation(&self, params: &OrderParams) -> Value {
        let symbol = params.symbol.trim().to_uppercase();
        let order_type = params
            .order_type
            .as_deref()
            .map_or_else(|| "market".to_string(), |t| t.trim().to_lowercase());
        let verb = capitalize(self.side.as_str());

        let message = match self.instrument {
            Instrument::Stock => format!(
                "Order placed: {verb} {} shares of {symbol} ({order_type} order)",
                params.quantity
            ),
            Instrument::Options => format!(
                "Order placed: {verb} {} {} option contracts of {symbol} ({order_type} order)",
                params.quantity,
                params.option_type.as_deref().unwrap_or("call").to_lowercase()
            ),
        };

        json!({
            "order_id": Uuid::new_v4().to_string(),
            "status": "placed",
            "side": self.side.as_str(),
            "instrument": self.instrument.as_str(),
            "symbol": symbol,
            "quantity": params.quantity,
            "order_type": order_type,
            "message": message,
        })
    }
}

#[async_trait]
impl Tool for OrderTool {
    async fn execute(&self, params: Value) -> Result<Value> {
        let params: OrderParams = serde_json::from_value(params)
            .map_err(|e| Error::InvalidArguments(format!("{}: {e}", self.name)))?;

        let confirmation = self.confirmation(&params);
        info!(
            tool = %self.name,
            order_id = %confirmation["order_id"],
            "Order placed"
        );
        Ok(confirmation)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn input_schema(&self) -> Value {
        let mut schema = json!({
            "type": "object",
            "properties": {
                "symbol": { "type": "string", "description": "Ticker symbol, e.g. AAPL" },
                "quantity": { "type": "integer", "minimum": 1 },
                "order_type": { "type": "string", "enum": ["market", "limit"] }
            },
            "required": ["symbol", "quantity"]
        });
        if self.instrument == Instrument::Options {
            schema["properties"]["option_type"] = json!({ "type": "string", "enum": ["call", "put"] });
            schema["required"] = json!(["symbol", "quantity", "option_type"]);
        }
        schema
    }
}

#[derive(Debug, Deserialize)]
struct PlaceOrderParams {
    #[serde(default)]
    side: Option<String>,
    #[serde(flatten)]
    order: OrderParams,
}

/// Stock order tool named `place_order`, with the side given per call
///
/// `side` is `buy` or `sell` and defaults to `buy`.
#[derive(Debug, Default)]
pub struct PlaceOrderTool;

impl PlaceOrderTool {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Tool for PlaceOrderTool {
    async fn execute(&self, params: Value) -> Result<Value> {
        let params: PlaceOrderParams = serde_json::from_value(params)
            .map_err(|e| Error::InvalidArguments(format!("place_order: {e}")))?;
        let side = match params.side.as_deref() {
            None => Side::Buy,
            Some(raw) => Side::parse(raw)
                .ok_or_else(|| Error::InvalidArguments(format!("place_order: unknown side {raw}")))?,
        };

        let confirmation = OrderTool::new(side, Instrument::Stock).confirmation(&params.order);
        info!(tool = "place_order", order_id = %confirmation["order_id"], "Order placed");
        Ok(confirmation)
    }

    fn name(&self) -> &'static str {
        "place_order"
    }

    fn description(&self) -> &'static str {
        "Place a buy or sell order for shares of a stock"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "side": { "type": "string", "enum": ["buy", "sell"], "default": "buy" },
                "symbol": { "type": "string", "description": "Ticker symbol, e.g. AAPL" },
                "quantity": { "type": "integer", "minimum": 1 },
                "order_type": { "type": "string", "enum": ["market", "limit"] }
            },
            "required": ["symbol", "quantity"]
        })
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().collect::<String>() + chars.as_str()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_names() {
        let names: Vec<String> = OrderTool::all().iter().map(|t| t.name().to_string()).collect();
        assert_eq!(
            names,
            vec!["buy_stock", "sell_stock", "buy_options", "sell_options"]
        );
    }

    #[tokio::test]
    async fn test_stock_order_confirmation() {
        let tool = OrderTool::new(Side::Buy, Instrument::Stock);
        let result = tool
            .execute(json!({"symbol": "aapl", "quantity": 50, "order_type": "Market"}))
            .await
            .unwrap();

        assert_eq!(result["status"], "placed");
        assert_eq!(result["symbol"], "AAPL");
        assert_eq!(
            result["message"],
            "Order placed: Buy 50 shares of AAPL (market order)"
        );
        assert!(result["order_id"].as_str().is_some());
    }

    #[tokio::test]
    async fn test_options_order_confirmation() {
        let tool = OrderTool::new(Side::Sell, Instrument::Options);
        let result = tool
            .execute(json!({"symbol": "TSLA", "quantity": 2, "option_type": "put"}))
            .await
            .unwrap();

        assert_eq!(
            result["message"],
            "Order placed: Sell 2 put option contracts of TSLA (market order)"
        );
        assert_eq!(tool.input_schema()["required"][2], "option_type");
    }

    #[tokio::test]
    async fn test_place_order() {
        let tool = PlaceOrderTool::new();
        let result = tool
            .execute(json!({"symbol": "AAPL", "quantity": 50, "orderType": "market"}))
            .await
            .unwrap();
        assert_eq!(result["side"], "buy");
        assert_eq!(
            result["message"],
            "Order placed: Buy 50 shares of AAPL (market order)"
        );

        let result = tool
            .execute(json!({"side": "SELL", "symbol": "msft", "quantity": 5, "order_type": "limit"}))
            .await
            .unwrap();
        assert_eq!(result["message"], "Order placed: Sell 5 shares of MSFT (limit order)");

        let result = tool
            .execute(json!({"side": "short", "symbol": "MSFT", "quantity": 5}))
            .await;
        assert!(matches!(result, Err(Error::InvalidArguments(_))));
    }

    #[tokio::test]
    async fn test_undecodable_arguments() {
        let tool = OrderTool::new(Side::Buy, Instrument::Stock);
        let result = tool.execute(json!({"symbol": "AAPL"})).await;
        assert!(matches!(result, Err(Error::InvalidArguments(_))));
    }
}
