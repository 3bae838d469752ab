//! Tool-call records and the invoker contract agents call tools through

use crate::verdict::{GuardrailVerdict, RejectReason};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// What an agent gets back from a tool invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ToolOutcome {
    /// The tool ran and returned a result
    Success { output: Value },
    /// The tool guardrail refused the call; the tool never ran
    Rejected { reason: RejectReason },
    /// The tool ran (or could not be found) and failed
    Failed { error: String },
}

impl ToolOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Render the outcome the way it is handed back to a model
    pub fn to_message(&self) -> String {
        match self {
            Self::Success { output } => output.to_string(),
            Self::Rejected { reason } => format!("Error: tool call rejected ({reason})"),
            Self::Failed { error } => format!("Error: {error}"),
        }
    }
}

/// One tool invocation inside a turn
///
/// A call whose verdict is a rejection always carries
/// `ToolOutcome::Rejected`; nothing was executed for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub tool: String,
    pub arguments: Value,
    pub verdict: GuardrailVerdict,
    pub outcome: ToolOutcome,
    pub timestamp: DateTime<Utc>,
}

impl ToolCall {
    pub fn new(
        tool: impl Into<String>,
        arguments: Value,
        verdict: GuardrailVerdict,
        outcome: ToolOutcome,
    ) -> Self {
        Self {
            tool: tool.into(),
            arguments,
            verdict,
            outcome,
            timestamp: Utc::now(),
        }
    }

    /// Whether the tool actually ran
    pub fn executed(&self) -> bool {
        !self.verdict.is_reject()
    }
}

/// Gate through which an agent invokes its tools
///
/// Implementations validate each call before executing it and record
/// every invocation, so the calls an agent made can be read back after
/// the agent returns.
#[async_trait]
pub trait ToolInvoker: Send + Sync {
    /// Invoke a tool by name with JSON arguments
    async fn invoke(&self, tool: &str, arguments: Value) -> ToolOutcome;

    /// Names of the tools the calling agent may use
    fn available_tools(&self) -> Vec<String>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_outcome_messages() {
        let ok = ToolOutcome::Success {
            output: json!({"status": "placed"}),
        };
        assert!(ok.is_success());
        assert_eq!(ok.to_message(), r#"{"status":"placed"}"#);

        let rejected = ToolOutcome::Rejected {
            reason: RejectReason::InvalidQuantity,
        };
        assert_eq!(
            rejected.to_message(),
            "Error: tool call rejected (invalid_quantity)"
        );

        let failed = ToolOutcome::Failed {
            error: "broker unavailable".to_string(),
        };
        assert_eq!(failed.to_message(), "Error: broker unavailable");
    }

    #[test]
    fn test_rejected_call_not_executed() {
        let call = ToolCall::new(
            "buy_stock",
            json!({"symbol": "AAPL", "quantity": 0}),
            GuardrailVerdict::reject(RejectReason::InvalidQuantity),
            ToolOutcome::Rejected {
                reason: RejectReason::InvalidQuantity,
            },
        );
        assert!(!call.executed());

        let call = ToolCall::new(
            "get_quote",
            json!({"symbol": "AAPL"}),
            GuardrailVerdict::Allow,
            ToolOutcome::Success { output: json!(189.5) },
        );
        assert!(call.executed());
    }
}
