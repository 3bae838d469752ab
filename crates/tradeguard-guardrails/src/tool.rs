//! Tool call validation and session order limits

use crate::config::GuardrailConfig;
use crate::ledger::{Reservation, SessionLedger};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};
use tradeguard_core::{GuardrailVerdict, RejectReason};

const VALID_ORDER_TYPES: &[&str] = &["market", "limit"];
const VALID_OPTION_TYPES: &[&str] = &["call", "put"];
const DEFAULT_ORDER_TYPE: &str = "market";

/// Camel-case spelling of `order_type` some callers send
const ORDER_TYPE_ALIAS: &str = "orderType";

/// The order type argument under either spelling
fn order_type_field(arguments: &Value) -> Option<&Value> {
    arguments.get("order_type").or_else(|| arguments.get(ORDER_TYPE_ALIAS))
}

/// Validates tool arguments and enforces the per-session order cap
///
/// Runs synchronously right before a tool executes. A `reject` verdict means
/// the tool must not run; an `allow` verdict for an order tool has already
/// counted the order against the session.
#[derive(Debug, Clone)]
pub struct ToolGuardrail {
    config: GuardrailConfig,
    ledger: Arc<SessionLedger>,
}

impl ToolGuardrail {
    pub fn new(config: GuardrailConfig, ledger: Arc<SessionLedger>) -> Self {
        Self { config, ledger }
    }

    pub fn config(&self) -> &GuardrailConfig {
        &self.config
    }

    pub fn ledger(&self) -> &Arc<SessionLedger> {
        &self.ledger
    }

    /// Check a tool call for a session
    pub fn check_tool_call(&self, session_id: &str, tool: &str, arguments: &Value) -> GuardrailVerdict {
        let verdict = if self.config.is_order_tool(tool) {
            self.check_order(session_id, tool, arguments)
        } else {
            self.check_optional_fields(arguments)
        };

        match &verdict {
            GuardrailVerdict::Reject { reason, .. } => {
                warn!(session_id, tool, %reason, "Tool call rejected");
            }
            _ => debug!(session_id, tool, "Tool call allowed"),
        }
        verdict
    }

    /// Canonical form of the arguments a tool will run with
    ///
    /// Upper-cases the symbol, renames `orderType` to `order_type`,
    /// lower-cases order and option types and fills in the default order
    /// type for order tools. Other fields pass through.
    pub fn normalize_arguments(&self, tool: &str, arguments: &Value) -> Value {
        let mut normalized = arguments.clone();
        let Some(fields) = normalized.as_object_mut() else {
            return normalized;
        };

        if let Some(Value::String(symbol)) = fields.get_mut("symbol") {
            *symbol = symbol.trim().to_uppercase();
        }
        if let Some(order_type) = fields.remove(ORDER_TYPE_ALIAS) {
            fields.entry("order_type").or_insert(order_type);
        }
        for key in ["order_type", "option_type"] {
            if let Some(Value::String(value)) = fields.get_mut(key) {
                *value = value.trim().to_lowercase();
            }
        }
        if self.config.is_order_tool(tool) && !fields.contains_key("order_type") {
            fields.insert("order_type".to_string(), Value::from(DEFAULT_ORDER_TYPE));
        }
        normalized
    }

    fn check_order(&self, session_id: &str, tool: &str, arguments: &Value) -> GuardrailVerdict {
        let cap = self.config.max_orders_per_session;
        if self.ledger.order_count(session_id) >= cap {
            return GuardrailVerdict::reject(RejectReason::SessionLimitExceeded);
        }

        if let Err(reason) = self.validate_order_fields(tool, arguments) {
            return GuardrailVerdict::reject(reason);
        }

        match self.ledger.try_reserve(session_id, cap) {
            Reservation::Reserved { order_count } => {
                info!(session_id, tool, order_count, "Order reserved");
                GuardrailVerdict::Allow
            }
            Reservation::LimitReached { .. } => {
                GuardrailVerdict::reject(RejectReason::SessionLimitExceeded)
            }
        }
    }

    fn validate_order_fields(&self, tool: &str, arguments: &Value) -> Result<(), RejectReason> {
        validate_symbol(arguments.get("symbol"))?;
        self.validate_quantity(arguments.get("quantity"))?;
        validate_order_type(order_type_field(arguments))?;
        if self.config.is_options_tool(tool) {
            validate_option_type(arguments.get("option_type"))?;
        }
        Ok(())
    }

    fn check_optional_fields(&self, arguments: &Value) -> GuardrailVerdict {
        let checks = [
            arguments.get("symbol").map(|v| validate_symbol(Some(v))),
            arguments.get("quantity").map(|v| self.validate_quantity(Some(v))),
            order_type_field(arguments).map(|v| validate_order_type(Some(v))),
        ];

        match checks.into_iter().flatten().find_map(Result::err) {
            Some(reason) => GuardrailVerdict::reject(reason),
            None => GuardrailVerdict::Allow,
        }
    }

    fn validate_quantity(&self, value: Option<&Value>) -> Result<(), RejectReason> {
        match value.and_then(Value::as_i64) {
            Some(q) if (self.config.min_quantity..=self.config.max_quantity).contains(&q) => Ok(()),
            _ => Err(RejectReason::InvalidQuantity),
        }
    }
}

fn validate_symbol(value: Option<&Value>) -> Result<(), RejectReason> {
    let symbol = value
        .and_then(Value::as_str)
        .map(str::trim)
        .ok_or(RejectReason::InvalidSymbol)?;

    if (1..=5).contains(&symbol.len()) && symbol.chars().all(|c| c.is_ascii_alphanumeric()) {
        Ok(())
    } else {
        Err(RejectReason::InvalidSymbol)
    }
}

fn validate_order_type(value: Option<&Value>) -> Result<(), RejectReason> {
    match value {
        None => Ok(()),
        Some(Value::String(s)) if is_one_of(s, VALID_ORDER_TYPES) => Ok(()),
        Some(_) => Err(RejectReason::InvalidOrderType),
    }
}

fn validate_option_type(value: Option<&Value>) -> Result<(), RejectReason> {
    match value {
        Some(Value::String(s)) if is_one_of(s, VALID_OPTION_TYPES) => Ok(()),
        _ => Err(RejectReason::InvalidOptionType),
    }
}

fn is_one_of(value: &str, allowed: &[&str]) -> bool {
    let value = value.trim();
    allowed.iter().any(|a| a.eq_ignore_ascii_case(value))
}
