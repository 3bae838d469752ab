//! Guardrail verdicts
//!
//! Every guardrail layer (input, tool, output) answers with the same
//! tri-state verdict. `Sanitize` and `Reject` carry the identifiers of the
//! rules that fired so the verdict can be logged without the content itself.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Reason code attached to a rejection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// Attempt to override system behavior
    Injection,
    /// Request or content outside the trading domain
    OffTopic,
    /// Executable code leaking into a reply
    HarmfulCode,
    /// Nothing left to process
    EmptyInput,
    /// Input exceeds the configured length
    InputTooLong,
    /// Agent produced no text
    EmptyOutput,
    /// Symbol is not 1-5 alphanumeric characters
    InvalidSymbol,
    /// Quantity missing, non-integer or out of range
    InvalidQuantity,
    /// Order type other than market/limit
    InvalidOrderType,
    /// Option type other than call/put
    InvalidOptionType,
    /// Session already placed the maximum number of orders
    SessionLimitExceeded,
    /// Tool is not declared for the active agent
    ToolNotAllowed,
}

impl RejectReason {
    /// Stable reason code used in logs and events
    pub fn code(self) -> &'static str {
        match self {
            Self::Injection => "injection",
            Self::OffTopic => "off_topic",
            Self::HarmfulCode => "harmful_code",
            Self::EmptyInput => "empty_input",
            Self::InputTooLong => "input_too_long",
            Self::EmptyOutput => "empty_output",
            Self::InvalidSymbol => "invalid_symbol",
            Self::InvalidQuantity => "invalid_quantity",
            Self::InvalidOrderType => "invalid_order_type",
            Self::InvalidOptionType => "invalid_option_type",
            Self::SessionLimitExceeded => "session_limit_exceeded",
            Self::ToolNotAllowed => "tool_not_allowed",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Outcome of a guardrail check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum GuardrailVerdict {
    /// Content passes unchanged
    Allow,
    /// Content was rewritten; `rules` lists the rules that matched
    Sanitize { rules: Vec<String> },
    /// Content must not proceed
    Reject {
        reason: RejectReason,
        rules: Vec<String>,
    },
}

impl GuardrailVerdict {
    /// Rejection without a pattern rule behind it (argument validation, limits)
    pub fn reject(reason: RejectReason) -> Self {
        Self::Reject {
            reason,
            rules: Vec::new(),
        }
    }

    pub fn is_allow(&self) -> bool {
        matches!(self, Self::Allow)
    }

    pub fn is_sanitize(&self) -> bool {
        matches!(self, Self::Sanitize { .. })
    }

    pub fn is_reject(&self) -> bool {
        matches!(self, Self::Reject { .. })
    }

    /// The rejection reason, if any
    pub fn reason(&self) -> Option<RejectReason> {
        match self {
            Self::Reject { reason, .. } => Some(*reason),
            _ => None,
        }
    }

    /// Identifiers of the rules that produced this verdict
    pub fn rules(&self) -> &[String] {
        match self {
            Self::Allow => &[],
            Self::Sanitize { rules } | Self::Reject { rules, .. } => rules,
        }
    }

    /// Short label for logging: `allow`, `sanitize` or `reject`
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Allow => "allow",
            Self::Sanitize { .. } => "sanitize",
            Self::Reject { .. } => "reject",
        }
    }
}
