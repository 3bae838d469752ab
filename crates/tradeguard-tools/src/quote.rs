//! Price lookup tool

use crate::Tool;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use std::collections::HashMap;
use tradeguard_core::{Error, Result};

#[derive(Debug, Deserialize)]
struct QuoteParams {
    symbol: String,
}

/// Tool returning the last known price for a symbol from a fixed table
pub struct QuoteTool {
    prices: HashMap<String, f64>,
}

impl QuoteTool {
    /// Create a quote tool from `(symbol, price)` pairs
    pub fn new<I, S>(prices: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        Self {
            prices: prices
                .into_iter()
                .map(|(symbol, price)| (symbol.into().to_uppercase(), price))
                .collect(),
        }
    }
}

#[async_trait]
impl Tool for QuoteTool {
    async fn execute(&self, params: Value) -> Result<Value> {
        let params: QuoteParams = serde_json::from_value(params)?;
        let symbol = params.symbol.trim().to_uppercase();

        let price = self
            .prices
            .get(&symbol)
            .ok_or_else(|| Error::ProcessingFailed(format!("No quote available for {symbol}")))?;

        Ok(json!({ "symbol": symbol, "price": price }))
    }

    fn name(&self) -> &'static str {
        "get_quote"
    }

    fn description(&self) -> &'static str {
        "Get the latest price for a stock symbol"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "symbol": { "type": "string", "description": "Ticker symbol, e.g. AAPL" }
            },
            "required": ["symbol"]
        })
    }
}
